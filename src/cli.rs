//! CLI argument parsing

use crate::backends;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Generate dynamic help text for the backend argument
fn backend_help() -> String {
    format!(
        "AUX backend, name[:key=value,...] [available: {}]",
        backends::backend_names_short()
    )
}

#[derive(Parser)]
#[command(name = "synapticsmst-tool")]
#[command(author, version, about = "Synaptics MST hub firmware tool", long_about = None)]
pub struct Cli {
    /// Verbosity level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[arg(short, long, global = true, default_value = backends::DEFAULT_BACKEND, help = backend_help())]
    pub backend: String,

    /// Keep going when a device cannot be enumerated
    #[arg(long, global = true)]
    pub force: bool,

    /// Only use the AUX device node with this device number
    #[arg(short, long, global = true, value_name = "MAJOR:MINOR")]
    pub device: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover all MST hubs and print their identity
    Enumerate,

    /// Write a firmware image to one hub
    Flash {
        /// Firmware image file
        file: PathBuf,

        /// Device number as printed by `enumerate` (1-based)
        index: usize,
    },

    /// List the AUX device nodes that are scanned
    ListNodes,

    /// List available backends
    ListBackends,
}
