//! Emulated hub

use log::trace;
use std::collections::HashMap;
use synapticsmst_core::error::ChannelError;
use synapticsmst_core::image::checksum;
use synapticsmst_core::protocol::regs::*;
use synapticsmst_core::protocol::{RcCapabilities, RcCommand};

/// Status left in `REG_RC_RESULT` by a failed command
const RC_STATUS_FAILED: u8 = 0x01;

/// Per-hub counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Successful remote-control enables
    pub enables: usize,
    /// Remote-control disables
    pub disables: usize,
    /// Sector erases
    pub erases: usize,
    /// EEPROM write commands
    pub writes: usize,
}

/// Faults a hub can be told to produce
#[derive(Debug, Clone, Default)]
pub struct HubFaults {
    /// Fail the transfer when asked to relay a downstream read of this register
    pub relay_read_error: Option<u32>,
    /// Fail the transfer when asked to write the EEPROM at this offset
    pub eeprom_write_error: Option<u32>,
    /// Report a checksum that is off by one
    pub corrupt_checksum: bool,
}

/// Configuration of an emulated hub
#[derive(Debug, Clone)]
pub struct HubConfig {
    pub board_id: u16,
    pub chip_id: [u8; 2],
    pub firmware_version: [u8; 3],
    pub oui: [u8; 3],
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            board_id: 0x0110, // Dell X6
            chip_id: [0x53, 0x31],
            firmware_version: [3, 2, 12],
            oui: SYNAPTICS_OUI,
        }
    }
}

/// One emulated MST hub and the hubs cascaded behind it
///
/// The hub answers DPCD reads and writes and runs the remote-control mailbox:
/// a write of `REG_RC_CMD` with the busy bit set executes the command
/// immediately. Downstream TX DPCD commands are forwarded to the child on the
/// given port; an empty port fails the command.
#[derive(Debug, Clone)]
pub struct SimHub {
    dpcd: HashMap<u32, u8>,
    eeprom: Vec<u8>,
    rc_enabled: bool,
    children: [Option<Box<SimHub>>; 2],
    stats: HubStats,
    faults: HubFaults,
}

impl Default for SimHub {
    fn default() -> Self {
        Self::new(HubConfig::default())
    }
}

impl SimHub {
    /// Create a hub with blank flash apart from its board ID
    pub fn new(config: HubConfig) -> Self {
        let mut hub = Self {
            dpcd: HashMap::new(),
            eeprom: vec![0xFF; EEPROM_SIZE],
            rc_enabled: false,
            children: [None, None],
            stats: HubStats::default(),
            faults: HubFaults::default(),
        };
        hub.poke(REG_RC_CAP, &[RcCapabilities::REMOTE_CONTROL.bits()]);
        hub.poke(REG_BRANCH_OUI, &config.oui);
        hub.poke(REG_CHIP_ID, &config.chip_id);
        hub.poke(REG_FIRMWARE_VERSION, &config.firmware_version);
        let addr = EEPROM_BOARD_ID_ADDR as usize;
        hub.eeprom[addr..addr + 2].copy_from_slice(&config.board_id.to_be_bytes());
        hub
    }

    /// Hub with the default identity and the given board ID
    pub fn with_board(board_id: u16) -> Self {
        Self::new(HubConfig {
            board_id,
            ..Default::default()
        })
    }

    /// Attach `child` behind egress `port`
    pub fn with_child(mut self, port: u8, child: SimHub) -> Self {
        self.children[port as usize] = Some(Box::new(child));
        self
    }

    /// Inject faults
    pub fn with_faults(mut self, faults: HubFaults) -> Self {
        self.faults = faults;
        self
    }

    /// Child behind `port`, if any
    pub fn child(&self, port: u8) -> Option<&SimHub> {
        self.children.get(port as usize)?.as_deref()
    }

    /// Child behind `port`, created with `f` if missing
    pub fn child_or_insert_with(&mut self, port: u8, f: impl FnOnce() -> SimHub) -> &mut SimHub {
        self.children[port as usize].get_or_insert_with(|| Box::new(f()))
    }

    /// Descendant at `path` (ports, root first)
    pub fn descendant(&self, path: &[u8]) -> Option<&SimHub> {
        path.iter().try_fold(self, |hub, &port| hub.child(port))
    }

    pub fn descendant_mut(&mut self, path: &[u8]) -> Option<&mut SimHub> {
        let mut hub = self;
        for &port in path {
            hub = hub.children.get_mut(port as usize)?.as_deref_mut()?;
        }
        Some(hub)
    }

    pub fn stats(&self) -> HubStats {
        self.stats
    }

    pub fn eeprom(&self) -> &[u8] {
        &self.eeprom
    }

    pub fn is_rc_enabled(&self) -> bool {
        self.rc_enabled
    }

    /// Whether this hub or any hub below it is still in remote-control mode
    pub fn any_rc_enabled(&self) -> bool {
        self.rc_enabled
            || self
                .children
                .iter()
                .flatten()
                .any(|child| child.any_rc_enabled())
    }

    fn poke(&mut self, addr: u32, data: &[u8]) {
        for (i, &b) in data.iter().enumerate() {
            self.dpcd.insert(addr + i as u32, b);
        }
    }

    fn peek(&self, addr: u32, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = self.dpcd.get(&(addr + i as u32)).copied().unwrap_or(0);
        }
    }

    fn peek_u32(&self, addr: u32) -> u32 {
        let mut raw = [0u8; 4];
        self.peek(addr, &mut raw);
        u32::from_le_bytes(raw)
    }

    /// DPCD read as seen from upstream
    pub fn read_dpcd(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), ChannelError> {
        self.peek(addr, buf);
        Ok(())
    }

    /// DPCD write as seen from upstream
    pub fn write_dpcd(&mut self, addr: u32, data: &[u8]) -> Result<(), ChannelError> {
        self.poke(addr, data);
        if addr == REG_RC_CMD && data.first().is_some_and(|&b| b & RC_CMD_BUSY != 0) {
            let status = self.run_command(data[0])?;
            self.poke(REG_RC_RESULT, &[status]);
            self.poke(REG_RC_CMD, &[data[0] & !RC_CMD_BUSY]);
        }
        Ok(())
    }

    /// Execute the posted command, returning its status byte
    fn run_command(&mut self, opcode: u8) -> Result<u8, ChannelError> {
        let offset = self.peek_u32(REG_RC_OFFSET);
        let len = self.peek_u32(REG_RC_LEN) as usize;
        let Some(cmd) = RcCommand::from_opcode(opcode) else {
            return Ok(RC_STATUS_FAILED);
        };
        trace!("sim: {:?} offset 0x{:X} len {}", cmd, offset, len);

        if cmd != RcCommand::EnableRc && !self.rc_enabled {
            return Ok(RC_STATUS_FAILED);
        }
        if len > RC_DATA_SIZE && !matches!(cmd, RcCommand::CalEepromChecksum | RcCommand::FlashErase) {
            return Ok(RC_STATUS_FAILED);
        }

        let ok = match cmd {
            RcCommand::EnableRc => {
                let mut magic = [0u8; 5];
                self.peek(REG_RC_DATA, &mut magic);
                if len == magic.len() && &magic == RC_ENABLE_MAGIC {
                    self.rc_enabled = true;
                    self.stats.enables += 1;
                    true
                } else {
                    false
                }
            }
            RcCommand::DisableRc => {
                self.rc_enabled = false;
                self.stats.disables += 1;
                true
            }
            RcCommand::ReadFromEeprom => match self.eeprom_range(offset, len) {
                Some(range) => {
                    let data = self.eeprom[range].to_vec();
                    self.poke(REG_RC_DATA, &data);
                    true
                }
                None => false,
            },
            RcCommand::WriteToEeprom => {
                if self.faults.eeprom_write_error == Some(offset) {
                    return Err(transfer_error(REG_RC_CMD, "eeprom write fault"));
                }
                match self.eeprom_range(offset, len) {
                    Some(range) => {
                        let mut data = vec![0u8; len];
                        self.peek(REG_RC_DATA, &mut data);
                        // Programming can only clear bits
                        for (cell, b) in self.eeprom[range].iter_mut().zip(data) {
                            *cell &= b;
                        }
                        self.stats.writes += 1;
                        true
                    }
                    None => false,
                }
            }
            RcCommand::FlashErase => {
                let start = offset as usize & !(EEPROM_SECTOR_SIZE - 1);
                match self.eeprom_range(start as u32, EEPROM_SECTOR_SIZE) {
                    Some(range) => {
                        self.eeprom[range].fill(0xFF);
                        self.stats.erases += 1;
                        true
                    }
                    None => false,
                }
            }
            RcCommand::CalEepromChecksum => match self.eeprom_range(offset, len) {
                Some(range) => {
                    let mut sum = checksum(&self.eeprom[range]);
                    if self.faults.corrupt_checksum {
                        sum = sum.wrapping_add(1);
                    }
                    self.poke(REG_RC_DATA, &sum.to_le_bytes());
                    true
                }
                None => false,
            },
            RcCommand::ReadFromTxDpcd(port) => {
                if self.faults.relay_read_error == Some(offset) {
                    return Err(transfer_error(REG_RC_CMD, "relay read fault"));
                }
                let mut data = vec![0u8; len];
                let relayed = self.relay(port, |child| child.read_dpcd(offset, &mut data));
                if relayed {
                    self.poke(REG_RC_DATA, &data);
                }
                relayed
            }
            RcCommand::WriteToTxDpcd(port) => {
                let mut data = vec![0u8; len];
                self.peek(REG_RC_DATA, &mut data);
                self.relay(port, |child| child.write_dpcd(offset, &data))
            }
        };

        Ok(if ok { 0 } else { RC_STATUS_FAILED })
    }

    /// Run `f` on the child behind `port`; false if the port is empty or `f` fails
    fn relay<F>(&mut self, port: u8, f: F) -> bool
    where
        F: FnOnce(&mut SimHub) -> Result<(), ChannelError>,
    {
        match self.children.get_mut(port as usize) {
            Some(Some(child)) => f(child).is_ok(),
            _ => false,
        }
    }

    fn eeprom_range(&self, offset: u32, len: usize) -> Option<std::ops::Range<usize>> {
        let start = offset as usize;
        let end = start.checked_add(len)?;
        (end <= self.eeprom.len()).then_some(start..end)
    }
}

fn transfer_error(addr: u32, what: &str) -> ChannelError {
    ChannelError::Write {
        addr,
        len: 1,
        source: std::io::Error::other(what.to_string()),
    }
}
