//! synapticsmst-tool - Synaptics MST hub firmware tool
//!
//! Finds Synaptics MultiStream Transport hubs behind the system's DisplayPort
//! AUX channels, including hubs cascaded behind other hubs, and updates
//! their firmware.
//!
//! # Architecture
//!
//! The protocol lives in `synapticsmst-core` and talks to an `AuxBus`.
//! Backends provide the bus:
//! - **drm_dp_aux** - the kernel's `/dev/drm_dp_auxN` character devices
//! - **dummy** - an emulated hub tree, for testing without hardware

mod backends;
mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Commands};
use nix::sys::signal::{sigaction, SaFlags, SigAction, SigHandler, SigSet, Signal};
use std::sync::OnceLock;
use synapticsmst_core::Cancellable;

/// Cancellation flag raised by SIGINT
static CANCEL: OnceLock<Cancellable> = OnceLock::new();

extern "C" fn handle_sigint(_: nix::libc::c_int) {
    if let Some(cancel) = CANCEL.get() {
        cancel.cancel();
    }
}

/// Route the first SIGINT to the cancellation flag; a second one kills us
fn install_sigint_handler() -> Result<Cancellable, Box<dyn std::error::Error>> {
    let cancel = CANCEL.get_or_init(Cancellable::new).clone();
    let action = SigAction::new(
        SigHandler::Handler(handle_sigint),
        SaFlags::SA_RESETHAND,
        SigSet::empty(),
    );
    // SAFETY: the handler only performs an atomic store
    unsafe { sigaction(Signal::SIGINT, &action) }?;
    Ok(cancel)
}

fn main() {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Set log level based on verbosity
    match cli.verbose {
        0 => {} // default (info)
        1 => log::set_max_level(log::LevelFilter::Debug),
        _ => log::set_max_level(log::LevelFilter::Trace),
    }

    if let Err(e) = run(cli) {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::ListNodes => {
            commands::list_nodes();
            Ok(())
        }
        Commands::ListBackends => {
            commands::list_backends();
            Ok(())
        }
        Commands::Enumerate => {
            let cancel = install_sigint_handler()?;
            let bus = backends::open_backend(&cli.backend, cli.device.as_deref())?;
            commands::run_enumerate(bus.as_ref(), &cancel, cli.force)
        }
        Commands::Flash { file, index } => {
            let cancel = install_sigint_handler()?;
            let bus = backends::open_backend(&cli.backend, cli.device.as_deref())?;
            commands::run_flash(bus.as_ref(), &file, index, &cancel)
        }
    }
}
