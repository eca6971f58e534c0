//! Firmware update
//!
//! An update programs the whole image and then asks the device for the
//! checksum of the programmed range. A transport failure is reported as is; a
//! completed write whose checksum differs is reported as
//! [`Error::VerificationFailed`]. Neither is retried here, and in both cases the
//! flash may hold a partial image, so the only safe recovery is running the
//! whole update again.
//!
//! The new firmware only runs after the device is reset, which is left to the
//! caller.

use crate::aux::AuxBus;
use crate::cancel::Cancellable;
use crate::device::Device;
use crate::discovery::open_channel;
use crate::error::{Error, UpdateError};
use crate::image::FirmwareImage;
use crate::progress::FlashProgress;
use crate::session::RemoteControlSession;
use log::{error, info};

/// Program `image` into `device` and verify it
///
/// `device` must have been enumerated with a recognised board ID; otherwise
/// nothing is written. Once programming has started the cached firmware
/// version is cleared, whatever the outcome: it no longer describes the flash.
pub fn update(
    bus: &dyn AuxBus,
    device: &mut Device,
    image: &FirmwareImage,
    progress: &mut dyn FlashProgress,
    cancel: &Cancellable,
) -> Result<(), UpdateError> {
    match device.board_id() {
        None => return Err(Error::NotEnumerated),
        Some(board) if !board.is_known() => {
            return Err(Error::UnknownDevice {
                board_id: board.raw(),
            })
        }
        Some(_) => {}
    }
    crate::device::validate_image(image)?;
    cancel.check()?;

    info!(
        "Updating {} device on aux node {} (layer {}, rad {}) with {} bytes",
        device.kind(),
        device.aux_node(),
        device.layer(),
        device.rad(),
        image.len()
    );

    let mut channel = open_channel(bus, device.aux_node())?;
    let mut session = RemoteControlSession::for_device(channel.as_mut(), device)?;
    let result = program_and_verify(device, &mut session, image, progress);
    let closed = session.close();
    device.invalidate_version();

    if let Err(e) = &result {
        error!("Firmware update failed: {}", e);
    }
    result?;
    closed?;

    info!("Firmware update complete, reset the device to apply it");
    Ok(())
}

fn program_and_verify(
    device: &Device,
    session: &mut RemoteControlSession<'_>,
    image: &FirmwareImage,
    progress: &mut dyn FlashProgress,
) -> Result<(), UpdateError> {
    device.write_firmware(session, image, progress)?;

    progress.verifying();
    let expected = image.checksum();
    let actual = device.read_flash_checksum(session, 0, image.len() as u32)?;
    if actual != expected {
        return Err(Error::VerificationFailed { expected, actual });
    }

    progress.complete();
    Ok(())
}
