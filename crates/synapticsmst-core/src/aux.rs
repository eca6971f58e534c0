//! AUX channel abstraction
//!
//! A DisplayPort AUX endpoint is the only physical entry point into an MST hub
//! tree. The core never touches device nodes itself; a backend implements
//! [`AuxBus`] to open endpoints by index and [`AuxChannel`] to move DPCD
//! register bytes over an open endpoint.

use crate::error::{ChannelError, OpenError};
use core::fmt;

/// Number of physical AUX endpoints that are scanned
pub const MAX_AUX_NODES: u8 = 3;

/// Symbolic names of the AUX endpoints, indexed by node number
const AUX_NODE_NAMES: [&str; MAX_AUX_NODES as usize] =
    ["/dev/drm_dp_aux0", "/dev/drm_dp_aux1", "/dev/drm_dp_aux2"];

/// Index of a physical AUX endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AuxNode(u8);

impl AuxNode {
    /// Create a node index, returning `None` outside `0..MAX_AUX_NODES`
    pub const fn new(index: u8) -> Option<Self> {
        if index < MAX_AUX_NODES {
            Some(Self(index))
        } else {
            None
        }
    }

    /// All scannable nodes in ascending order
    pub fn all() -> impl Iterator<Item = AuxNode> {
        (0..MAX_AUX_NODES).map(AuxNode)
    }

    /// Raw index
    pub const fn index(self) -> u8 {
        self.0
    }

    /// Symbolic device name of this node
    pub fn name(self) -> &'static str {
        aux_node_name(self.0)
    }
}

impl fmt::Display for AuxNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Map a node index to its symbolic name; out-of-range indices map to `"unknown"`
pub fn aux_node_name(index: u8) -> &'static str {
    AUX_NODE_NAMES
        .get(index as usize)
        .copied()
        .unwrap_or("unknown")
}

/// An open AUX channel
///
/// Closing the channel is dropping it. Implementations release the node in
/// `Drop` so a later `open` of the same index succeeds.
pub trait AuxChannel {
    /// Read `buf.len()` bytes of DPCD starting at `addr`
    fn read_dpcd(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), ChannelError>;

    /// Write `data` to DPCD starting at `addr`
    fn write_dpcd(&mut self, addr: u32, data: &[u8]) -> Result<(), ChannelError>;
}

/// A set of AUX endpoints that can be opened by index
///
/// At most one channel per node may be open at a time. A second `open` of a
/// held node must fail with [`OpenError::Busy`].
pub trait AuxBus {
    /// Open the endpoint at `node`
    fn open(&self, node: AuxNode) -> Result<Box<dyn AuxChannel + '_>, OpenError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_names() {
        assert_eq!(aux_node_name(0), "/dev/drm_dp_aux0");
        assert_eq!(aux_node_name(2), "/dev/drm_dp_aux2");
        assert_eq!(aux_node_name(3), "unknown");
        assert_eq!(aux_node_name(255), "unknown");
    }

    #[test]
    fn test_node_range() {
        assert!(AuxNode::new(2).is_some());
        assert!(AuxNode::new(MAX_AUX_NODES).is_none());
        let all: Vec<u8> = AuxNode::all().map(AuxNode::index).collect();
        assert_eq!(all, vec![0, 1, 2]);
    }
}
