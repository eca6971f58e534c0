//! Enumerate command implementation

use log::warn;
use synapticsmst_core::{discover, AuxBus, Cancellable, Device, Error};

/// Identity lines printed for one enumerated device
pub fn describe_device(device: &Device) -> String {
    let Some(board) = device.board_id().and_then(|b| b.name()) else {
        return "Unknown Device".to_string();
    };
    format!(
        "Device: {} with Synaptics {}\nConnect Type: {} in DP Aux Node {}\nFirmware version: {}",
        board,
        device.chip_id().unwrap_or("unknown chip"),
        device.kind(),
        device.aux_node().index(),
        device.firmware_version().unwrap_or("unknown"),
    )
}

/// Run the enumerate command
///
/// With `force`, a device whose identity cannot be read is reported and
/// skipped instead of ending the command.
pub fn run_enumerate(
    bus: &dyn AuxBus,
    cancel: &Cancellable,
    force: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut topology = discover(bus, cancel)?;

    println!();
    println!("MST Devices:");
    for (i, device) in topology.iter_mut().enumerate() {
        cancel.check()?;
        println!("[Device {}]", i + 1);
        match device.enumerate(bus) {
            Ok(()) | Err(Error::UnknownDevice { .. }) => println!("{}", describe_device(device)),
            Err(e) if force => {
                warn!("Failed to enumerate device {}: {}", i + 1, e);
                println!("Not available");
            }
            Err(e) => return Err(e.into()),
        }
        println!();
    }

    Ok(())
}

#[cfg(all(test, feature = "dummy"))]
mod tests {
    use super::*;
    use synapticsmst_dummy::parse_options;

    #[test]
    fn test_describe_enumerated_devices() {
        let bus = parse_options(&[("topology", "1+1.0")]).unwrap();
        let mut topology = discover(&bus, &Cancellable::new()).unwrap();

        let direct = topology.select(1).unwrap();
        assert_eq!(describe_device(direct), "Unknown Device");
        direct.enumerate(&bus).unwrap();
        assert_eq!(
            describe_device(direct),
            "Device: Dell X6 Platform with Synaptics VMM5331\n\
             Connect Type: DIRECT in DP Aux Node 1\n\
             Firmware version: 3.02.012"
        );

        let remote = topology.select(2).unwrap();
        remote.enumerate(&bus).unwrap();
        assert!(describe_device(remote).contains("Connect Type: REMOTE in DP Aux Node 1"));
    }

    #[test]
    fn test_unknown_board_is_listed() {
        let bus = parse_options(&[("topology", "0"), ("board", "0x1234")]).unwrap();
        run_enumerate(&bus, &Cancellable::new(), false).unwrap();
    }

    #[test]
    fn test_enumerate_without_devices_fails() {
        let bus = synapticsmst_dummy::DummyBus::new();
        assert!(run_enumerate(&bus, &Cancellable::new(), true).is_err());
    }
}
