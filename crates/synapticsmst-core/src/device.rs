//! MST branch device entity
//!
//! Direct and Remote devices share one record and one register protocol; the
//! kind only changes how registers are addressed (see [`Connection`]).

use crate::aux::{AuxBus, AuxNode};
use crate::discovery::open_channel;
use crate::error::{Error, Result};
use crate::image::FirmwareImage;
use crate::progress::FlashProgress;
use crate::protocol::regs::*;
use crate::protocol::{Connection, RcCapabilities, RcCommand};
use crate::rad::{Rad, CASCADE_PORTS};
use crate::session::RemoteControlSession;
use core::fmt;
use log::{debug, info};

/// How a device is reached
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeviceKind {
    /// Type invalid or not known
    Unknown,
    /// Attached at a physical AUX endpoint
    Direct,
    /// Reached through a parent's remote-control bus
    Remote,
}

impl DeviceKind {
    /// Upper-case name as printed by the tool
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Direct => "DIRECT",
            Self::Remote => "REMOTE",
        }
    }

    /// Parse a kind name; anything unrecognised is `Unknown`
    pub fn from_name(name: &str) -> Self {
        match name.to_ascii_uppercase().as_str() {
            "DIRECT" => Self::Direct,
            "REMOTE" => Self::Remote,
            _ => Self::Unknown,
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Boards the updater knows how to program
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BoardId {
    Evb,
    X6,
    X7,
    Wd15Tb15Wire,
    Ctkm5Wireless,
    /// Any identifier not in the table
    Unknown(u16),
}

impl BoardId {
    /// Identifier reserved for "no board ID programmed"
    pub const UNKNOWN_RAW: u16 = 0xFFFF;

    /// Look up a raw board identifier
    pub fn from_raw(raw: u16) -> Self {
        match raw {
            0x0000 => Self::Evb,
            0x0110 => Self::X6,
            0x0111 => Self::X7,
            0x0112 => Self::Wd15Tb15Wire,
            0x0113 => Self::Ctkm5Wireless,
            other => Self::Unknown(other),
        }
    }

    /// Raw board identifier
    pub fn raw(self) -> u16 {
        match self {
            Self::Evb => 0x0000,
            Self::X6 => 0x0110,
            Self::X7 => 0x0111,
            Self::Wd15Tb15Wire => 0x0112,
            Self::Ctkm5Wireless => 0x0113,
            Self::Unknown(raw) => raw,
        }
    }

    /// Whether the board is in the table
    pub fn is_known(self) -> bool {
        !matches!(self, Self::Unknown(_))
    }

    /// Human-readable board name, `None` for unknown boards
    pub fn name(self) -> Option<&'static str> {
        match self {
            Self::Evb => Some("SYNA evb board"),
            Self::X6 => Some("Dell X6 Platform"),
            Self::X7 => Some("Dell X7 Platform"),
            Self::Wd15Tb15Wire => Some("Dell WD15/TB15 wired Dock"),
            Self::Ctkm5Wireless => Some("Dell WLD15 Wireless Dock"),
            Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for BoardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => f.write_str(name),
            None => write!(f, "Unknown board 0x{:04X}", self.raw()),
        }
    }
}

/// One MST branch device in a discovered topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    kind: DeviceKind,
    aux_node: AuxNode,
    layer: u8,
    rad: Rad,
    board_id: Option<BoardId>,
    chip_id: Option<String>,
    firmware_version: Option<String>,
}

impl Device {
    /// A device attached directly at `aux_node`
    pub fn direct(aux_node: AuxNode) -> Self {
        Self::new(DeviceKind::Direct, aux_node, 0, Rad::ROOT)
    }

    /// A cascaded device below a Direct device on `aux_node`
    pub fn remote(aux_node: AuxNode, layer: u8, rad: Rad) -> Self {
        Self::new(DeviceKind::Remote, aux_node, layer, rad)
    }

    fn new(kind: DeviceKind, aux_node: AuxNode, layer: u8, rad: Rad) -> Self {
        Self {
            kind,
            aux_node,
            layer,
            rad,
            board_id: None,
            chip_id: None,
            firmware_version: None,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn aux_node(&self) -> AuxNode {
        self.aux_node
    }

    pub fn layer(&self) -> u8 {
        self.layer
    }

    pub fn rad(&self) -> Rad {
        self.rad
    }

    /// Board identity, `None` until [`enumerate`](Self::enumerate) has read it
    pub fn board_id(&self) -> Option<BoardId> {
        self.board_id
    }

    pub fn chip_id(&self) -> Option<&str> {
        self.chip_id.as_deref()
    }

    pub fn firmware_version(&self) -> Option<&str> {
        self.firmware_version.as_deref()
    }

    /// Port path from the Direct root, root first
    pub fn path(&self) -> Vec<u8> {
        self.rad.decode(self.layer)
    }

    /// Drop the cached firmware version; the flash contents no longer match it
    pub(crate) fn invalidate_version(&mut self) {
        self.firmware_version = None;
    }

    /// Read board ID, chip ID and firmware version from the device
    ///
    /// Opens the device's AUX channel and a remote-control session along its
    /// path for the duration of the reads. An unrecognised board ID fills the
    /// identity fields and then fails with [`Error::UnknownDevice`]; the device
    /// is present but must not be programmed.
    pub fn enumerate(&mut self, bus: &dyn AuxBus) -> Result<()> {
        self.board_id = None;
        self.chip_id = None;
        self.firmware_version = None;

        let mut channel = open_channel(bus, self.aux_node)?;
        let mut session = RemoteControlSession::for_device(channel.as_mut(), self)?;
        let identity = read_identity(session.connection());
        let closed = session.close();
        let (board_id, chip_id, version) = identity?;
        closed?;

        debug!(
            "Device {} layer {} rad {}: board 0x{:04X}, chip {}, version {}",
            self.aux_node,
            self.layer,
            self.rad,
            board_id.raw(),
            chip_id,
            version
        );

        self.board_id = Some(board_id);
        self.chip_id = Some(chip_id);
        self.firmware_version = Some(version);

        if board_id.is_known() {
            Ok(())
        } else {
            Err(Error::UnknownDevice {
                board_id: board_id.raw(),
            })
        }
    }

    /// Probe for a Synaptics hub behind egress `port` of this device
    ///
    /// `session` must be the session opened for this device.
    pub fn scan_cascade_port(&self, session: &mut RemoteControlSession<'_>, port: u8) -> Result<bool> {
        if !CASCADE_PORTS.contains(&port) {
            return Err(Error::InvalidPort(port));
        }
        if !session.covers(self) {
            return Err(Error::SessionMismatch);
        }

        let rad = self.rad.child(self.layer, port)?;
        let mut conn = session.child_connection(rad);

        let mut cap = [0u8];
        match conn.read(REG_RC_CAP, &mut cap) {
            Ok(()) => {}
            // Nothing behind the port: this hub cannot relay the read.
            // A failure further up the path is a transport fault.
            Err(Error::RemoteCommand { command, layer, .. })
                if layer == self.layer && command == RcCommand::ReadFromTxDpcd(port).opcode() =>
            {
                return Ok(false)
            }
            Err(e) => return Err(e),
        }
        if !RcCapabilities::from_bits_truncate(cap[0]).contains(RcCapabilities::REMOTE_CONTROL) {
            return Ok(false);
        }

        let mut oui = [0u8; 3];
        conn.read(REG_BRANCH_OUI, &mut oui)?;
        Ok(oui == SYNAPTICS_OUI)
    }

    /// Checksum of `length` flash bytes starting at `offset`, computed by the device
    pub fn read_flash_checksum(
        &self,
        session: &mut RemoteControlSession<'_>,
        offset: u32,
        length: u32,
    ) -> Result<u32> {
        if !session.covers(self) {
            return Err(Error::SessionMismatch);
        }
        let mut sum = [0u8; 4];
        session
            .connection()
            .rc_query(RcCommand::CalEepromChecksum, offset, length, &mut sum)?;
        Ok(u32::from_le_bytes(sum))
    }

    /// Erase the sectors covering `image` and program it from offset 0
    ///
    /// Verification is left to the caller (see
    /// [`update`](crate::update::update)). Any failure leaves the flash in an
    /// undefined state.
    pub fn write_firmware(
        &self,
        session: &mut RemoteControlSession<'_>,
        image: &FirmwareImage,
        progress: &mut dyn FlashProgress,
    ) -> Result<()> {
        if !session.covers(self) {
            return Err(Error::SessionMismatch);
        }
        validate_image(image)?;

        let conn = session.connection();

        let sectors = image.len().div_ceil(EEPROM_SECTOR_SIZE);
        progress.erasing(sectors);
        for sector in 0..sectors {
            let offset = (sector * EEPROM_SECTOR_SIZE) as u32;
            conn.rc_set_command(RcCommand::FlashErase, offset, &[])?;
            progress.erase_progress(sector + 1);
        }

        progress.writing(image.len());
        let mut written = 0usize;
        for block in image.as_bytes().chunks(EEPROM_WRITE_BLOCK) {
            conn.rc_set_command(RcCommand::WriteToEeprom, written as u32, block)?;
            written += block.len();
            progress.write_progress(written);
        }

        info!(
            "Wrote {} bytes to device on aux node {} (layer {})",
            written, self.aux_node, self.layer
        );
        Ok(())
    }
}

/// Check that `image` can be programmed at all
pub(crate) fn validate_image(image: &FirmwareImage) -> Result<()> {
    if image.is_empty() {
        return Err(Error::EmptyImage);
    }
    if image.len() > EEPROM_SIZE {
        return Err(Error::ImageTooLarge {
            size: image.len(),
            max: EEPROM_SIZE,
        });
    }
    Ok(())
}

/// Read (board ID, chip ID, firmware version) through an open session
fn read_identity(conn: &mut Connection<'_>) -> Result<(BoardId, String, String)> {
    let mut version = [0u8; 3];
    conn.read(REG_FIRMWARE_VERSION, &mut version)?;

    let mut chip = [0u8; 2];
    conn.read(REG_CHIP_ID, &mut chip)?;

    let mut board = [0u8; 2];
    conn.rc_get_command(RcCommand::ReadFromEeprom, EEPROM_BOARD_ID_ADDR, &mut board)?;

    Ok((
        BoardId::from_raw(u16::from_be_bytes(board)),
        format_chip_id(chip),
        format_version(version),
    ))
}

/// Chip ID as printed on the part, e.g. `VMM5331`
pub fn format_chip_id(raw: [u8; 2]) -> String {
    format!("VMM{:02x}{:02x}", raw[0], raw[1])
}

/// Firmware version as `major.minor.build`, e.g. `3.02.012`
pub fn format_version(raw: [u8; 3]) -> String {
    format!("{}.{:02}.{:03}", raw[0], raw[1], raw[2])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::MailboxHub;

    fn node(i: u8) -> AuxNode {
        AuxNode::new(i).unwrap()
    }

    #[test]
    fn test_board_id_table() {
        assert_eq!(BoardId::from_raw(0x0110), BoardId::X6);
        assert_eq!(BoardId::from_raw(0x0113).name(), Some("Dell WLD15 Wireless Dock"));
        assert_eq!(BoardId::from_raw(0x0000), BoardId::Evb);

        let unknown = BoardId::from_raw(0x1234);
        assert!(!unknown.is_known());
        assert_eq!(unknown.name(), None);
        assert_eq!(unknown.raw(), 0x1234);
        assert!(!BoardId::from_raw(BoardId::UNKNOWN_RAW).is_known());
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(DeviceKind::from_name("direct"), DeviceKind::Direct);
        assert_eq!(DeviceKind::from_name("REMOTE"), DeviceKind::Remote);
        assert_eq!(DeviceKind::from_name("hub"), DeviceKind::Unknown);
        assert_eq!(DeviceKind::Remote.to_string(), "REMOTE");
    }

    #[test]
    fn test_formatting() {
        assert_eq!(format_chip_id([0x53, 0x31]), "VMM5331");
        assert_eq!(format_version([3, 2, 12]), "3.02.012");
    }

    #[test]
    fn test_new_device_is_not_enumerated() {
        let dev = Device::remote(node(1), 2, Rad::encode(&[1, 0]).unwrap());
        assert_eq!(dev.kind(), DeviceKind::Remote);
        assert_eq!(dev.board_id(), None);
        assert_eq!(dev.firmware_version(), None);
        assert_eq!(dev.path(), vec![1, 0]);
    }

    #[test]
    fn test_scan_rejects_foreign_session() {
        let mut hub = MailboxHub::default();
        let parent = Device::direct(node(0));
        let other = Device::remote(node(0), 1, Rad::ROOT);

        let mut session = RemoteControlSession::for_device(&mut hub, &parent).unwrap();
        assert!(matches!(
            other.scan_cascade_port(&mut session, 0),
            Err(Error::SessionMismatch)
        ));
        assert!(matches!(
            parent.scan_cascade_port(&mut session, 2),
            Err(Error::InvalidPort(2))
        ));
    }

    #[test]
    fn test_write_firmware_sequence() {
        let mut hub = MailboxHub::default();
        let dev = Device::direct(node(0));
        let image = FirmwareImage::new(vec![0x5A; EEPROM_SECTOR_SIZE + 1]);

        let mut session = RemoteControlSession::for_device(&mut hub, &dev).unwrap();
        dev.write_firmware(&mut session, &image, &mut crate::progress::NoProgress)
            .unwrap();
        session.close().unwrap();

        let ops = hub.opcodes();
        let erases = ops.iter().filter(|&&op| op == 0x14).count();
        let writes = ops.iter().filter(|&&op| op == 0x20).count();
        assert_eq!(erases, 2);
        assert_eq!(writes, image.len().div_ceil(EEPROM_WRITE_BLOCK));
        assert_eq!(ops.first(), Some(&0x01));
        assert_eq!(ops.last(), Some(&0x02));
    }

    #[test]
    fn test_write_firmware_rejects_bad_images() {
        let mut hub = MailboxHub::default();
        let dev = Device::direct(node(0));
        let mut session = RemoteControlSession::for_device(&mut hub, &dev).unwrap();

        let empty = FirmwareImage::new(Vec::new());
        assert!(matches!(
            dev.write_firmware(&mut session, &empty, &mut crate::progress::NoProgress),
            Err(Error::EmptyImage)
        ));

        let huge = FirmwareImage::new(vec![0; EEPROM_SIZE + 1]);
        assert!(matches!(
            dev.write_firmware(&mut session, &huge, &mut crate::progress::NoProgress),
            Err(Error::ImageTooLarge { .. })
        ));
    }
}
