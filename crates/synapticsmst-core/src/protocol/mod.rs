//! Remote-control register protocol
//!
//! Synaptics hubs expose a small command mailbox in DPCD vendor space. A
//! command is posted by filling the offset, length and data registers and then
//! writing the opcode with the busy bit set; the hub clears the busy bit and
//! leaves a status byte in the result register when it is done.
//!
//! [`Connection`] runs this mailbox on a device at any cascade depth by
//! relaying each register access through the hubs above it.

mod connection;
pub mod regs;

pub use connection::Connection;
pub use regs::{RcCapabilities, RcCommand};
