//! List commands implementation

use crate::backends;
use synapticsmst_core::{AuxNode, MAX_AUX_NODES};

/// List the AUX device nodes discovery scans
pub fn list_nodes() {
    println!("AUX nodes ({}):", MAX_AUX_NODES);
    println!();
    for node in AuxNode::all() {
        println!("  {:>2}  {}", node.index(), node.name());
    }
}

/// List all backends compiled in
pub fn list_backends() {
    println!("Supported backends:");
    println!();
    for b in backends::available_backends() {
        if b.aliases.is_empty() {
            println!("  {:12} - {}", b.name, b.description);
        } else {
            println!(
                "  {:12} - {} (aliases: {})",
                b.name,
                b.description,
                b.aliases.join(", ")
            );
        }
    }
}
