//! CLI command implementations
//!
//! Every command runs against a `dyn AuxBus`, so the same code drives real
//! drm_dp_aux nodes and the emulated hub tree.

mod enumerate;
mod flash;
mod list;

pub use enumerate::run_enumerate;
pub use flash::run_flash;
pub use list::{list_backends, list_nodes};
