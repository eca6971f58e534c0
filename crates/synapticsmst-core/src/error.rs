//! Error types for synapticsmst-core

use crate::aux::AuxNode;
use thiserror::Error;

/// Why opening an AUX channel failed
///
/// Backends must keep "not present" apart from "busy" and "permission denied":
/// discovery skips absent nodes but aborts on the other two.
#[derive(Debug, Error)]
pub enum OpenError {
    /// No device node exists for this index
    #[error("not present")]
    NotPresent,
    /// The node is already held open by this process or locked by another
    #[error("busy")]
    Busy,
    /// The node exists but cannot be opened with the current privileges
    #[error("permission denied")]
    PermissionDenied,
    /// Any other failure while opening the node
    #[error("{0}")]
    Io(#[source] std::io::Error),
}

impl OpenError {
    /// Map an I/O error from `open(2)` to the matching open outcome
    pub fn from_io(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotPresent,
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied,
            std::io::ErrorKind::WouldBlock => Self::Busy,
            _ => Self::Io(err),
        }
    }
}

/// Low-level failure reading or writing DPCD registers on an open channel
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Register read failed
    #[error("DPCD read of {len} bytes at 0x{addr:05X} failed: {source}")]
    Read {
        addr: u32,
        len: usize,
        #[source]
        source: std::io::Error,
    },
    /// Register write failed
    #[error("DPCD write of {len} bytes at 0x{addr:05X} failed: {source}")]
    Write {
        addr: u32,
        len: usize,
        #[source]
        source: std::io::Error,
    },
    /// The channel transferred fewer bytes than requested
    #[error("short DPCD transfer at 0x{addr:05X}: {done} of {len} bytes")]
    Short { addr: u32, len: usize, done: usize },
}

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// An AUX endpoint could not be opened for permission or contention reasons
    #[error("Failed to open aux node {node} ({reason}), please try sudo to get permission")]
    ChannelAccessDenied {
        node: AuxNode,
        #[source]
        reason: OpenError,
    },

    /// No Direct device answered on any AUX endpoint
    #[error("No Synaptics MST Device Found")]
    NoDeviceFound,

    /// The device answered but reported a board ID that is not in the table
    #[error("unknown device (board ID 0x{board_id:04X})")]
    UnknownDevice { board_id: u16 },

    /// A 1-based device number outside the discovered topology
    #[error("no device number {number} ({count} device(s) found)")]
    InvalidDeviceNumber { number: usize, count: usize },

    /// The device has not been enumerated yet
    #[error("device has not been enumerated")]
    NotEnumerated,

    /// Register transfer failed on the AUX channel
    #[error("channel transport error: {0}")]
    Transport(#[from] ChannelError),

    /// A remote-control command completed with a non-zero status
    #[error("remote command 0x{command:02X} failed on layer {layer} with status 0x{status:02X}")]
    RemoteCommand { command: u8, layer: u8, status: u8 },

    /// A remote-control command never completed
    #[error("remote command 0x{command:02X} timed out on layer {layer}")]
    RemoteControlTimeout { command: u8, layer: u8 },

    /// Post-write checksum did not match the image
    #[error("firmware verification failed: expected checksum 0x{expected:08X}, device reported 0x{actual:08X}")]
    VerificationFailed { expected: u32, actual: u32 },

    /// A cascade deeper than the relative address can encode
    #[error("cascade layer {layer} exceeds the maximum of {max}", max = crate::rad::MAX_LAYERS)]
    CascadeTooDeep { layer: u8 },

    /// Egress port outside the scannable range
    #[error("invalid egress port {0}")]
    InvalidPort(u8),

    /// Register access attempted through a session opened for another device
    #[error("remote control session does not cover this device")]
    SessionMismatch,

    /// The firmware image is empty
    #[error("firmware image is empty")]
    EmptyImage,

    /// The firmware image does not fit in the device flash
    #[error("firmware image of {size} bytes exceeds flash size of {max} bytes")]
    ImageTooLarge { size: usize, max: usize },

    /// The operation was cancelled before it started
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// True for errors that mean the transfer itself failed
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::RemoteCommand { .. } | Self::RemoteControlTimeout { .. }
        )
    }
}

/// Errors returned by the firmware updater share the core taxonomy
pub type UpdateError = Error;

/// Result type alias using the core Error type
pub type Result<T> = std::result::Result<T, Error>;
