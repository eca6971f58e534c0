//! Emulated AUX endpoints

use crate::hub::{HubStats, SimHub};
use log::debug;
use std::cell::{Cell, RefCell};
use synapticsmst_core::aux::{AuxBus, AuxChannel, AuxNode, MAX_AUX_NODES};
use synapticsmst_core::error::{ChannelError, OpenError};

/// What sits on one emulated AUX endpoint
#[derive(Debug, Clone, Default)]
pub enum NodeState {
    /// No device node
    #[default]
    Absent,
    /// Device node exists but cannot be opened
    Denied,
    /// Device node is held by someone else
    Locked,
    /// A Direct hub
    Hub(SimHub),
}

/// A set of emulated AUX endpoints
///
/// Opening a node that is already open through this bus fails with
/// [`OpenError::Busy`], like the real device nodes do.
#[derive(Debug, Default)]
pub struct DummyBus {
    nodes: [RefCell<NodeState>; MAX_AUX_NODES as usize],
    held: [Cell<bool>; MAX_AUX_NODES as usize],
    opens: [Cell<usize>; MAX_AUX_NODES as usize],
}

impl DummyBus {
    /// A bus with nothing attached
    pub fn new() -> Self {
        Self::default()
    }

    /// Set what sits on `node`
    pub fn with_node(self, node: u8, state: NodeState) -> Self {
        *self.nodes[node as usize].borrow_mut() = state;
        self
    }

    /// Attach a Direct hub at `node`
    pub fn with_hub(self, node: u8, hub: SimHub) -> Self {
        self.with_node(node, NodeState::Hub(hub))
    }

    /// Run `f` on the hub at `path` below `node`
    ///
    /// Returns `None` if there is no hub there.
    pub fn inspect<R>(&self, node: u8, path: &[u8], f: impl FnOnce(&SimHub) -> R) -> Option<R> {
        match &*self.nodes.get(node as usize)?.borrow() {
            NodeState::Hub(root) => root.descendant(path).map(f),
            _ => None,
        }
    }

    /// Mutable access to the hub at `path` below `node`
    pub fn modify<R>(&self, node: u8, path: &[u8], f: impl FnOnce(&mut SimHub) -> R) -> Option<R> {
        match &mut *self.nodes.get(node as usize)?.borrow_mut() {
            NodeState::Hub(root) => root.descendant_mut(path).map(f),
            _ => None,
        }
    }

    /// Counters of the hub at `path` below `node`
    pub fn stats(&self, node: u8, path: &[u8]) -> Option<HubStats> {
        self.inspect(node, path, SimHub::stats)
    }

    /// Successful opens of `node` so far
    pub fn open_count(&self, node: u8) -> usize {
        self.opens[node as usize].get()
    }

    /// Whether any channel is currently open
    pub fn any_open(&self) -> bool {
        self.held.iter().any(Cell::get)
    }

    /// Whether any hub anywhere is left in remote-control mode
    pub fn any_rc_enabled(&self) -> bool {
        self.nodes.iter().any(|node| match &*node.borrow() {
            NodeState::Hub(hub) => hub.any_rc_enabled(),
            _ => false,
        })
    }
}

impl AuxBus for DummyBus {
    fn open(&self, node: AuxNode) -> Result<Box<dyn AuxChannel + '_>, OpenError> {
        let index = node.index() as usize;
        match &*self.nodes[index].borrow() {
            NodeState::Absent => return Err(OpenError::NotPresent),
            NodeState::Denied => return Err(OpenError::PermissionDenied),
            NodeState::Locked => return Err(OpenError::Busy),
            NodeState::Hub(_) => {}
        }
        if self.held[index].replace(true) {
            return Err(OpenError::Busy);
        }
        self.opens[index].set(self.opens[index].get() + 1);
        debug!("dummy: opened {}", node.name());
        Ok(Box::new(DummyChannel { bus: self, index }))
    }
}

/// An open emulated endpoint; releases the node on drop
struct DummyChannel<'b> {
    bus: &'b DummyBus,
    index: usize,
}

impl DummyChannel<'_> {
    fn with_hub<R>(&self, f: impl FnOnce(&mut SimHub) -> R) -> R {
        match &mut *self.bus.nodes[self.index].borrow_mut() {
            NodeState::Hub(hub) => f(hub),
            // Only hub nodes can be opened
            _ => unreachable!("open channel on a node without a hub"),
        }
    }
}

impl AuxChannel for DummyChannel<'_> {
    fn read_dpcd(&mut self, addr: u32, buf: &mut [u8]) -> Result<(), ChannelError> {
        self.with_hub(|hub| hub.read_dpcd(addr, buf))
    }

    fn write_dpcd(&mut self, addr: u32, data: &[u8]) -> Result<(), ChannelError> {
        self.with_hub(|hub| hub.write_dpcd(addr, data))
    }
}

impl Drop for DummyChannel<'_> {
    fn drop(&mut self) {
        self.bus.held[self.index].set(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(i: u8) -> AuxNode {
        AuxNode::new(i).unwrap()
    }

    #[test]
    fn test_open_outcomes() {
        let bus = DummyBus::new()
            .with_hub(0, SimHub::default())
            .with_node(1, NodeState::Denied)
            .with_node(2, NodeState::Locked);

        assert!(bus.open(node(0)).is_ok());
        assert!(matches!(bus.open(node(1)), Err(OpenError::PermissionDenied)));
        assert!(matches!(bus.open(node(2)), Err(OpenError::Busy)));
        assert!(matches!(DummyBus::new().open(node(0)), Err(OpenError::NotPresent)));
    }

    #[test]
    fn test_second_open_is_busy() {
        let bus = DummyBus::new().with_hub(1, SimHub::default());
        let first = bus.open(node(1)).unwrap();
        assert!(matches!(bus.open(node(1)), Err(OpenError::Busy)));
        drop(first);
        assert!(bus.open(node(1)).is_ok());
        assert_eq!(bus.open_count(1), 2);
        assert!(!bus.any_open());
    }
}
