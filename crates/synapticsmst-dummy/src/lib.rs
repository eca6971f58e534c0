//! synapticsmst-dummy - Emulated Synaptics MST hub tree
//!
//! This crate provides an [`AuxBus`](synapticsmst_core::AuxBus) backed by
//! in-memory hubs that run the same remote-control mailbox as real hardware,
//! including downstream relaying for cascaded hubs. It's useful for testing
//! and development without a dock on the desk.
//!
//! # Usage with the CLI
//!
//! ```bash
//! # Two Direct hubs, the second one with a hub cascaded on port 1
//! synapticsmst-tool --backend dummy:topology=0+1+1.1 enumerate
//! ```

pub mod bus;
pub mod error;
pub mod hub;
pub mod topology;

pub use bus::{DummyBus, NodeState};
pub use error::{DummyError, Result};
pub use hub::{HubConfig, HubFaults, HubStats, SimHub};
pub use topology::parse_topology;

use log::warn;

/// Default topology: one Direct hub on node 0
const DEFAULT_TOPOLOGY: &str = "0";

/// Parse backend options and build the emulated bus
///
/// # Supported options
/// - `topology=<spec>` - hub layout, see [`topology`] (default: `0`)
/// - `board=<id>` - board ID reported by every hub, hex or decimal
pub fn parse_options(options: &[(&str, &str)]) -> Result<DummyBus> {
    let mut topology = DEFAULT_TOPOLOGY;
    let mut config = HubConfig::default();

    for (key, value) in options {
        match *key {
            "topology" => topology = value,
            "board" => {
                config.board_id = parse_u16(value).ok_or_else(|| DummyError::InvalidParameter {
                    name: "board",
                    message: format!("'{}' is not a valid board ID", value),
                })?;
            }
            _ => {
                warn!("Unknown dummy option: {}={}", key, value);
            }
        }
    }

    parse_topology(topology, &config)
}

fn parse_u16(s: &str) -> Option<u16> {
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}
