//! synapticsmst-drm-aux - Linux drm_dp_aux support
//!
//! This crate provides an [`AuxBus`](synapticsmst_core::AuxBus) over the
//! DisplayPort AUX character devices the kernel creates at `/dev/drm_dp_auxN`.
//!
//! # Usage with the CLI
//!
//! ```bash
//! # Default: scan /dev/drm_dp_aux0..2
//! synapticsmst-tool enumerate
//!
//! # Only use the node with device number 226:1
//! synapticsmst-tool --backend drm_dp_aux:device=226:1 enumerate
//! ```
//!
//! # System Requirements
//!
//! - Linux kernel with `CONFIG_DRM_DP_AUX_CHARDEV`
//! - Read/write access to `/dev/drm_dp_auxN`, usually root

pub mod device;
pub mod error;

pub use device::{parse_options, DeviceNumber, DrmAuxBus, DrmAuxConfig, DEFAULT_DIR};
pub use error::{DrmAuxError, Result};

/// Build a drm_dp_aux bus from backend options
///
/// This is a convenience function for use in the CLI backend dispatch.
pub fn open_drm_aux(
    options: &[(&str, &str)],
) -> std::result::Result<Box<dyn synapticsmst_core::AuxBus>, Box<dyn std::error::Error>> {
    let config = parse_options(options)?;
    Ok(Box::new(DrmAuxBus::new(config)?))
}
