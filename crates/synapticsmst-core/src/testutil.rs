//! Single-hub mailbox mock shared by unit tests

use crate::aux::AuxChannel;
use crate::error::ChannelError;
use crate::protocol::regs::*;
use std::collections::HashMap;

/// One hub whose mailbox completes every command immediately
///
/// Every posted command is logged as `(opcode, offset, len)`. Downstream
/// relaying is not emulated, relayed commands are only logged.
#[derive(Default)]
pub struct MailboxHub {
    pub regs: HashMap<u32, u8>,
    pub commands: Vec<(u8, u32, u32)>,
    /// Never clear the busy bit
    pub stuck: bool,
    /// Opcode that completes with a non-zero status
    pub fail_opcode: Option<u8>,
}

impl MailboxHub {
    fn reg_u32(&self, addr: u32) -> u32 {
        let mut bytes = [0u8; 4];
        for (i, b) in bytes.iter_mut().enumerate() {
            *b = *self.regs.get(&(addr + i as u32)).unwrap_or(&0);
        }
        u32::from_le_bytes(bytes)
    }

    /// Logged opcodes only
    pub fn opcodes(&self) -> Vec<u8> {
        self.commands.iter().map(|c| c.0).collect()
    }
}

impl AuxChannel for MailboxHub {
    fn read_dpcd(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), ChannelError> {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = *self.regs.get(&(addr + i as u32)).unwrap_or(&0);
        }
        Ok(())
    }

    fn write_dpcd(&mut self, addr: u32, data: &[u8]) -> Result<(), ChannelError> {
        for (i, b) in data.iter().enumerate() {
            self.regs.insert(addr + i as u32, *b);
        }
        if addr == REG_RC_CMD && !self.stuck {
            let opcode = data[0] & !RC_CMD_BUSY;
            let offset = self.reg_u32(REG_RC_OFFSET);
            let len = self.reg_u32(REG_RC_LEN);
            self.commands.push((opcode, offset, len));
            let status = if self.fail_opcode == Some(opcode) { 0x01 } else { 0 };
            self.regs.insert(REG_RC_RESULT, status);
            self.regs.insert(REG_RC_CMD, 0);
        }
        Ok(())
    }
}
