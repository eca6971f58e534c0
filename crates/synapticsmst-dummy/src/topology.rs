//! Topology strings for the dummy backend
//!
//! A topology is a `+`-separated list of hubs. Each hub is written as its AUX
//! node followed by the egress ports leading to it, separated by dots:
//!
//! - `0` - a Direct hub on node 0
//! - `1.1` - a hub behind port 1 of the Direct hub on node 1
//! - `0+1+1.1+1.1.0` - two Direct hubs, the second with a two-deep cascade
//!
//! Missing intermediate hubs are created. A node can instead be marked `!N`
//! (permission denied) or `*N` (locked by another process).

use crate::bus::{DummyBus, NodeState};
use crate::error::{DummyError, Result};
use crate::hub::{HubConfig, SimHub};
use synapticsmst_core::aux::MAX_AUX_NODES;
use synapticsmst_core::rad::{CASCADE_PORTS, MAX_LAYERS};

/// Build an emulated bus from a topology string
pub fn parse_topology(spec: &str, config: &HubConfig) -> Result<DummyBus> {
    let mut nodes: [NodeState; MAX_AUX_NODES as usize] = Default::default();

    for entry in spec.split('+').map(str::trim).filter(|e| !e.is_empty()) {
        let invalid = |message: &str| DummyError::InvalidTopology {
            entry: entry.to_string(),
            message: message.to_string(),
        };

        if let Some(rest) = entry.strip_prefix('!') {
            nodes[parse_node(rest).ok_or_else(|| invalid("bad node"))?] = NodeState::Denied;
            continue;
        }
        if let Some(rest) = entry.strip_prefix('*') {
            nodes[parse_node(rest).ok_or_else(|| invalid("bad node"))?] = NodeState::Locked;
            continue;
        }

        let mut parts = entry.split('.');
        let node = parts
            .next()
            .and_then(parse_node)
            .ok_or_else(|| invalid("bad node"))?;
        let path = parts
            .map(|p| p.parse::<u8>().ok().filter(|p| CASCADE_PORTS.contains(p)))
            .collect::<Option<Vec<u8>>>()
            .ok_or_else(|| invalid("ports must be 0 or 1"))?;
        if path.len() > MAX_LAYERS as usize {
            return Err(invalid("cascade too deep"));
        }

        if !matches!(nodes[node], NodeState::Hub(_)) {
            nodes[node] = NodeState::Hub(SimHub::new(config.clone()));
        }
        if let NodeState::Hub(root) = &mut nodes[node] {
            let mut hub = root;
            for &port in &path {
                hub = hub.child_or_insert_with(port, || SimHub::new(config.clone()));
            }
        }
    }

    let mut bus = DummyBus::new();
    for (index, state) in nodes.into_iter().enumerate() {
        bus = bus.with_node(index as u8, state);
    }
    Ok(bus)
}

fn parse_node(s: &str) -> Option<usize> {
    s.parse::<u8>()
        .ok()
        .filter(|&n| n < MAX_AUX_NODES)
        .map(usize::from)
}
