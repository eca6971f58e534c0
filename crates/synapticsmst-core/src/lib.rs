//! synapticsmst-core - Synaptics MST hub discovery and firmware update
//!
//! Synaptics Multi-Stream Transport hubs can be chained behind each other.
//! Only the first hub of a chain sits on a physical DisplayPort AUX endpoint;
//! the others are reached by relaying register accesses through the hubs'
//! vendor remote-control mailbox. This crate implements:
//!
//! - discovery of the whole hub tree from the AUX endpoints ([`discover`]),
//! - relative addressing of cascaded hubs ([`Rad`]),
//! - the remote-control session bracket ([`RemoteControlSession`]),
//! - device identification ([`Device::enumerate`]),
//! - firmware programming with checksum verification ([`update`]).
//!
//! Physical I/O is supplied by a backend implementing [`AuxBus`].
//!
//! # Example
//!
//! ```ignore
//! use synapticsmst_core::{discover, update, Cancellable, FirmwareImage, NoProgress};
//!
//! let cancel = Cancellable::new();
//! let mut topology = discover(&bus, &cancel)?;
//! let device = topology.select(1)?;
//! device.enumerate(&bus)?;
//! let image = FirmwareImage::new(std::fs::read("firmware.bin")?);
//! update(&bus, device, &image, &mut NoProgress, &cancel)?;
//! ```

#![warn(rust_2018_idioms)]

pub mod aux;
pub mod cancel;
pub mod device;
pub mod discovery;
pub mod error;
pub mod image;
pub mod progress;
pub mod protocol;
pub mod rad;
pub mod session;
#[cfg(test)]
mod testutil;
pub mod update;

pub use aux::{aux_node_name, AuxBus, AuxChannel, AuxNode, MAX_AUX_NODES};
pub use cancel::Cancellable;
pub use device::{BoardId, Device, DeviceKind};
pub use discovery::{discover, Topology};
pub use error::{ChannelError, Error, OpenError, Result, UpdateError};
pub use image::FirmwareImage;
pub use progress::{FlashProgress, NoProgress};
pub use rad::Rad;
pub use session::RemoteControlSession;
pub use update::update;
