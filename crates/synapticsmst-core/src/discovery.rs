//! Topology discovery
//!
//! Discovery turns the fixed set of AUX endpoints into a flat, ordered list of
//! devices:
//!
//! 1. every endpoint that opens becomes a Direct device, in node order;
//! 2. the list is then walked as a work queue. Each entry is re-opened, a
//!    remote-control session is opened along its path and both cascade ports
//!    are probed; hubs found are appended as Remote devices and are visited in
//!    turn later in the same walk.
//!
//! The resulting order is breadth-first and is what the tool's 1-based device
//! numbers refer to. Identity registers are not read here, see
//! [`Device::enumerate`].

use crate::aux::{AuxBus, AuxChannel, AuxNode};
use crate::cancel::Cancellable;
use crate::device::Device;
use crate::error::{Error, OpenError, Result};
use crate::rad::{CASCADE_PORTS, MAX_LAYERS};
use crate::session::RemoteControlSession;
use log::{debug, info, warn};

/// Ordered result of a discovery run
#[derive(Debug, Clone, Default)]
pub struct Topology {
    devices: Vec<Device>,
}

impl Topology {
    pub fn devices(&self) -> &[Device] {
        &self.devices
    }

    pub fn into_devices(self) -> Vec<Device> {
        self.devices
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Device> {
        self.devices.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Device> {
        self.devices.iter_mut()
    }

    /// Device by its 1-based number, as printed by `enumerate`
    pub fn select(&mut self, number: usize) -> Result<&mut Device> {
        let count = self.devices.len();
        number
            .checked_sub(1)
            .and_then(|i| self.devices.get_mut(i))
            .ok_or(Error::InvalidDeviceNumber { number, count })
    }
}

/// Open `node`, mapping every failure to [`Error::ChannelAccessDenied`]
///
/// Used wherever an endpoint that was present before must be opened again.
pub fn open_channel(bus: &dyn AuxBus, node: AuxNode) -> Result<Box<dyn AuxChannel + '_>> {
    bus.open(node)
        .map_err(|reason| Error::ChannelAccessDenied { node, reason })
}

/// Discover all Direct devices and the hubs cascaded behind them
pub fn discover(bus: &dyn AuxBus, cancel: &Cancellable) -> Result<Topology> {
    cancel.check()?;

    let mut devices = scan_aux_nodes(bus)?;

    let mut cursor = 0;
    while cursor < devices.len() {
        let children = scan_cascade(bus, &devices[cursor])?;
        devices.extend(children);
        cursor += 1;
    }

    info!("Discovered {} MST device(s)", devices.len());
    Ok(Topology { devices })
}

/// Find Direct devices on every AUX endpoint
fn scan_aux_nodes(bus: &dyn AuxBus) -> Result<Vec<Device>> {
    let mut devices = Vec::new();

    for node in AuxNode::all() {
        match bus.open(node) {
            Ok(channel) => {
                drop(channel);
                debug!("Direct device on {}", node.name());
                devices.push(Device::direct(node));
            }
            Err(OpenError::NotPresent) => {
                debug!("No device on {}", node.name());
            }
            Err(reason) => {
                return Err(Error::ChannelAccessDenied { node, reason });
            }
        }
    }

    if devices.is_empty() {
        return Err(Error::NoDeviceFound);
    }
    Ok(devices)
}

/// Probe both cascade ports of `device` inside one remote-control session
fn scan_cascade(bus: &dyn AuxBus, device: &Device) -> Result<Vec<Device>> {
    if device.layer() >= MAX_LAYERS {
        warn!(
            "Not scanning below layer {} on aux node {}: relative address is full",
            device.layer(),
            device.aux_node()
        );
        return Ok(Vec::new());
    }

    let mut channel = open_channel(bus, device.aux_node())?;
    let mut session = RemoteControlSession::for_device(channel.as_mut(), device)?;
    let found = probe_ports(device, &mut session);
    let closed = session.close();
    let found = found?;
    closed?;
    Ok(found)
}

fn probe_ports(device: &Device, session: &mut RemoteControlSession<'_>) -> Result<Vec<Device>> {
    let mut children = Vec::new();
    for port in CASCADE_PORTS {
        if !device.scan_cascade_port(session, port)? {
            continue;
        }
        let layer = device.layer() + 1;
        let rad = device.rad().child(device.layer(), port)?;
        info!(
            "Cascaded device on aux node {} port {} (layer {}, rad {})",
            device.aux_node(),
            port,
            layer,
            rad
        );
        children.push(Device::remote(device.aux_node(), layer, rad));
    }
    Ok(children)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::OpenError;
    use crate::rad::Rad;
    use crate::testutil::MailboxHub;
    use std::cell::Cell;

    /// One mailbox hub on node 0, counting opens
    #[derive(Default)]
    struct CountingBus {
        opens: Cell<usize>,
    }

    impl AuxBus for CountingBus {
        fn open(&self, node: AuxNode) -> core::result::Result<Box<dyn AuxChannel + '_>, OpenError> {
            if node.index() != 0 {
                return Err(OpenError::NotPresent);
            }
            self.opens.set(self.opens.get() + 1);
            Ok(Box::new(MailboxHub::default()))
        }
    }

    fn node0() -> AuxNode {
        AuxNode::new(0).unwrap()
    }

    #[test]
    fn test_no_scan_below_deepest_layer() {
        let bus = CountingBus::default();
        let rad = Rad::encode(&[1; MAX_LAYERS as usize]).unwrap();
        let device = Device::remote(node0(), MAX_LAYERS, rad);

        assert_eq!(scan_cascade(&bus, &device).unwrap(), Vec::new());
        assert_eq!(bus.opens.get(), 0);
    }

    #[test]
    fn test_port_without_remote_control_is_empty() {
        let bus = CountingBus::default();
        let topology = discover(&bus, &Cancellable::new()).unwrap();

        assert_eq!(topology.len(), 1);
        assert_eq!(topology.devices()[0], Device::direct(node0()));
        // Endpoint scan, then one session for the cascade probe
        assert_eq!(bus.opens.get(), 2);
    }

    #[test]
    fn test_select_is_one_based() {
        let bus = CountingBus::default();
        let mut topology = discover(&bus, &Cancellable::new()).unwrap();

        assert!(topology.select(1).is_ok());
        assert!(matches!(
            topology.select(0),
            Err(Error::InvalidDeviceNumber { number: 0, count: 1 })
        ));
        assert!(matches!(
            topology.select(2),
            Err(Error::InvalidDeviceNumber { number: 2, count: 1 })
        ));
    }
}
