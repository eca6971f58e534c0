//! DPCD register map and remote-control opcodes

use bitflags::bitflags;

// Standard DPCD identification
pub const REG_BRANCH_OUI: u32 = 0x00500;
pub const REG_CHIP_ID: u32 = 0x00507;
pub const REG_FIRMWARE_VERSION: u32 = 0x0050A;

// Remote-control mailbox
pub const REG_RC_CAP: u32 = 0x004B0;
pub const REG_RC_CMD: u32 = 0x004B2;
pub const REG_RC_RESULT: u32 = 0x004B3;
pub const REG_RC_LEN: u32 = 0x004B8;
pub const REG_RC_OFFSET: u32 = 0x004BC;
pub const REG_RC_DATA: u32 = 0x004C0;

/// Size of the mailbox data window
pub const RC_DATA_SIZE: usize = 32;

/// Busy bit in `REG_RC_CMD`
pub const RC_CMD_BUSY: u8 = 0x80;

/// Number of completion polls before a command is declared stuck
pub const RC_MAX_POLLS: u32 = 1000;

/// Unlock magic accepted by `RcCommand::EnableRc`
pub const RC_ENABLE_MAGIC: &[u8; 5] = b"PRIUS";

/// Synaptics IEEE OUI as read from `REG_BRANCH_OUI`
pub const SYNAPTICS_OUI: [u8; 3] = [0x90, 0xCC, 0x24];

// EEPROM layout
pub const EEPROM_BOARD_ID_ADDR: u32 = 0x0000_010E;
pub const EEPROM_SIZE: usize = 0x0001_0000;
pub const EEPROM_SECTOR_SIZE: usize = 0x1000;
pub const EEPROM_WRITE_BLOCK: usize = RC_DATA_SIZE;

bitflags! {
    /// Bits of `REG_RC_CAP`
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct RcCapabilities: u8 {
        /// Hub implements the remote-control mailbox
        const REMOTE_CONTROL = 0x04;
    }
}

/// Remote-control mailbox opcodes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcCommand {
    EnableRc,
    DisableRc,
    CalEepromChecksum,
    FlashErase,
    WriteToEeprom,
    ReadFromEeprom,
    /// Write DPCD of the device behind the given egress port
    WriteToTxDpcd(u8),
    /// Read DPCD of the device behind the given egress port
    ReadFromTxDpcd(u8),
}

impl RcCommand {
    /// Opcode as written to `REG_RC_CMD` (without the busy bit)
    pub const fn opcode(self) -> u8 {
        match self {
            Self::EnableRc => 0x01,
            Self::DisableRc => 0x02,
            Self::CalEepromChecksum => 0x11,
            Self::FlashErase => 0x14,
            Self::WriteToEeprom => 0x20,
            Self::WriteToTxDpcd(port) => 0x21 + port,
            Self::ReadFromEeprom => 0x30,
            Self::ReadFromTxDpcd(port) => 0x31 + port,
        }
    }

    /// Decode an opcode written to `REG_RC_CMD`
    pub fn from_opcode(opcode: u8) -> Option<Self> {
        Some(match opcode & !RC_CMD_BUSY {
            0x01 => Self::EnableRc,
            0x02 => Self::DisableRc,
            0x11 => Self::CalEepromChecksum,
            0x14 => Self::FlashErase,
            0x20 => Self::WriteToEeprom,
            op @ 0x21..=0x24 => Self::WriteToTxDpcd(op - 0x21),
            0x30 => Self::ReadFromEeprom,
            op @ 0x31..=0x34 => Self::ReadFromTxDpcd(op - 0x31),
            _ => return None,
        })
    }
}
