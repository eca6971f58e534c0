//! Layered register access along a relative address

use super::regs::*;
use crate::aux::AuxChannel;
use crate::error::{Error, Result};
use crate::rad::Rad;
use log::trace;

/// Register access to one device in a cascade
///
/// Layer 0 is the Direct device on the open channel. Registers of a device at
/// layer `n > 0` are reached by asking its parent at layer `n - 1` to relay the
/// access through the egress port the RAD records for layer `n`. The parent's
/// mailbox is itself reached the same way, down to layer 0.
///
/// Relaying only works while remote control is enabled on every hub above the
/// target; see [`RemoteControlSession`](crate::session::RemoteControlSession).
pub struct Connection<'a> {
    channel: &'a mut dyn AuxChannel,
    layer: u8,
    rad: Rad,
}

impl<'a> Connection<'a> {
    /// Address the device at `layer`/`rad` behind `channel`
    pub fn new(channel: &'a mut dyn AuxChannel, layer: u8, rad: Rad) -> Self {
        Self {
            channel,
            layer,
            rad,
        }
    }

    /// Cascade layer of the addressed device
    pub fn layer(&self) -> u8 {
        self.layer
    }

    /// Relative address of the addressed device
    pub fn rad(&self) -> Rad {
        self.rad
    }

    /// Read DPCD registers of the addressed device
    pub fn read(&mut self, addr: u32, buf: &mut [u8]) -> Result<()> {
        self.read_at(self.layer, addr, buf)
    }

    /// Write DPCD registers of the addressed device
    pub fn write(&mut self, addr: u32, data: &[u8]) -> Result<()> {
        self.write_at(self.layer, addr, data)
    }

    /// Run a mailbox command that sends `data` to the addressed device
    pub fn rc_set_command(&mut self, cmd: RcCommand, offset: u32, data: &[u8]) -> Result<()> {
        self.rc_set_at(self.layer, cmd, offset, data)
    }

    /// Run a mailbox command that returns `buf.len()` bytes from the addressed device
    pub fn rc_get_command(&mut self, cmd: RcCommand, offset: u32, buf: &mut [u8]) -> Result<()> {
        self.rc_get_at(self.layer, cmd, offset, buf)
    }

    /// Run a mailbox command over `[offset, offset + len)` whose reply fits in the data window
    pub fn rc_query(&mut self, cmd: RcCommand, offset: u32, len: u32, out: &mut [u8]) -> Result<()> {
        debug_assert!(out.len() <= RC_DATA_SIZE);
        self.rc_post(self.layer, cmd, offset, len)?;
        self.read_at(self.layer, REG_RC_DATA, out)
    }

    /// Same channel, addressing another device on it
    pub(crate) fn retarget(&mut self, layer: u8, rad: Rad) -> Connection<'_> {
        Connection {
            channel: &mut *self.channel,
            layer,
            rad,
        }
    }

    /// Run a mailbox command on the hub at `level` of this device's path
    pub(crate) fn rc_command_at(&mut self, level: u8, cmd: RcCommand, data: &[u8]) -> Result<()> {
        self.rc_set_at(level, cmd, 0, data)
    }

    fn read_at(&mut self, level: u8, addr: u32, buf: &mut [u8]) -> Result<()> {
        if level == 0 {
            self.channel.read_dpcd(addr, buf)?;
            return Ok(());
        }
        let port = self.rad.port_at(level);
        self.rc_get_at(level - 1, RcCommand::ReadFromTxDpcd(port), addr, buf)
    }

    fn write_at(&mut self, level: u8, addr: u32, data: &[u8]) -> Result<()> {
        if level == 0 {
            self.channel.write_dpcd(addr, data)?;
            return Ok(());
        }
        let port = self.rad.port_at(level);
        self.rc_set_at(level - 1, RcCommand::WriteToTxDpcd(port), addr, data)
    }

    fn rc_set_at(&mut self, level: u8, cmd: RcCommand, offset: u32, data: &[u8]) -> Result<()> {
        if data.is_empty() {
            return self.rc_post(level, cmd, offset, 0);
        }
        let mut pos = offset;
        for chunk in data.chunks(RC_DATA_SIZE) {
            self.write_at(level, REG_RC_DATA, chunk)?;
            self.rc_post(level, cmd, pos, chunk.len() as u32)?;
            pos += chunk.len() as u32;
        }
        Ok(())
    }

    fn rc_get_at(&mut self, level: u8, cmd: RcCommand, offset: u32, buf: &mut [u8]) -> Result<()> {
        let mut pos = offset;
        for chunk in buf.chunks_mut(RC_DATA_SIZE) {
            self.rc_post(level, cmd, pos, chunk.len() as u32)?;
            self.read_at(level, REG_RC_DATA, chunk)?;
            pos += chunk.len() as u32;
        }
        Ok(())
    }

    /// Post one command to the mailbox of the hub at `level` and wait for it
    fn rc_post(&mut self, level: u8, cmd: RcCommand, offset: u32, len: u32) -> Result<()> {
        let opcode = cmd.opcode();
        trace!(
            "rc cmd 0x{:02X} layer {} offset 0x{:08X} len {}",
            opcode,
            level,
            offset,
            len
        );

        self.write_at(level, REG_RC_OFFSET, &offset.to_le_bytes())?;
        self.write_at(level, REG_RC_LEN, &len.to_le_bytes())?;
        self.write_at(level, REG_RC_CMD, &[opcode | RC_CMD_BUSY])?;

        let mut state = [RC_CMD_BUSY];
        for _ in 0..RC_MAX_POLLS {
            self.read_at(level, REG_RC_CMD, &mut state)?;
            if state[0] & RC_CMD_BUSY == 0 {
                break;
            }
        }
        if state[0] & RC_CMD_BUSY != 0 {
            return Err(Error::RemoteControlTimeout {
                command: opcode,
                layer: level,
            });
        }

        let mut status = [0u8];
        self.read_at(level, REG_RC_RESULT, &mut status)?;
        if status[0] != 0 {
            return Err(Error::RemoteCommand {
                command: opcode,
                layer: level,
                status: status[0],
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MailboxHub;

    #[test]
    fn test_set_command_is_chunked() {
        let mut hub = MailboxHub::default();
        let data = [0xA5u8; RC_DATA_SIZE + 4];
        let mut conn = Connection::new(&mut hub, 0, Rad::ROOT);
        conn.rc_set_command(RcCommand::WriteToEeprom, 0x100, &data)
            .unwrap();

        assert_eq!(
            hub.commands,
            vec![
                (0x20, 0x100, RC_DATA_SIZE as u32),
                (0x20, 0x100 + RC_DATA_SIZE as u32, 4)
            ]
        );
    }

    #[test]
    fn test_stuck_command_times_out() {
        let mut hub = MailboxHub {
            stuck: true,
            ..Default::default()
        };
        let mut conn = Connection::new(&mut hub, 0, Rad::ROOT);
        let err = conn
            .rc_set_command(RcCommand::EnableRc, 0, RC_ENABLE_MAGIC)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::RemoteControlTimeout {
                command: 0x01,
                layer: 0
            }
        ));
    }

    #[test]
    fn test_failed_status_is_reported() {
        let mut hub = MailboxHub {
            fail_opcode: Some(0x02),
            ..Default::default()
        };
        let mut conn = Connection::new(&mut hub, 0, Rad::ROOT);
        let err = conn.rc_set_command(RcCommand::DisableRc, 0, &[]).unwrap_err();
        assert!(matches!(
            err,
            Error::RemoteCommand {
                command: 0x02,
                status: 0x01,
                ..
            }
        ));
    }

    #[test]
    fn test_remote_read_is_relayed_through_parent() {
        let mut hub = MailboxHub::default();
        let rad = Rad::encode(&[1]).unwrap();
        let mut conn = Connection::new(&mut hub, 1, rad);
        let mut buf = [0u8; 3];
        conn.read(REG_BRANCH_OUI, &mut buf).unwrap();

        // One relayed read on the parent, through port 1
        assert_eq!(hub.commands, vec![(0x32, REG_BRANCH_OUI, 3)]);
    }
}
