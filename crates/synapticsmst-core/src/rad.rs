//! Relative address (RAD) encoding
//!
//! A RAD packs the egress port taken at each cascade hop into a 16-bit value.
//! The hop that reaches layer `n` stores its port in bits `2*(n-1)..2*n`, so a
//! device's whole path can be recovered from `(rad, layer)` alone.

use crate::error::{Error, Result};
use core::fmt;

/// Bits used per cascade hop
pub const BITS_PER_LAYER: u32 = 2;

/// Deepest layer a 16-bit RAD can address
pub const MAX_LAYERS: u8 = (u16::BITS / BITS_PER_LAYER) as u8;

/// Egress ports probed on every hub
pub const CASCADE_PORTS: [u8; 2] = [0, 1];

const PORT_MASK: u16 = (1 << BITS_PER_LAYER) - 1;

/// Relative address of a device below its Direct root
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Rad(u16);

impl Rad {
    /// The empty address of a Direct device
    pub const ROOT: Rad = Rad(0);

    /// Wrap a raw RAD value
    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    /// Raw 16-bit value
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Address of the child reached from a device at `layer` through `port`
    ///
    /// Fails if the child would sit deeper than [`MAX_LAYERS`] or the port does
    /// not fit in one hop.
    pub fn child(self, layer: u8, port: u8) -> Result<Rad> {
        if u16::from(port) > PORT_MASK {
            return Err(Error::InvalidPort(port));
        }
        let child_layer = layer.saturating_add(1);
        if child_layer > MAX_LAYERS {
            return Err(Error::CascadeTooDeep { layer: child_layer });
        }
        let shift = BITS_PER_LAYER * u32::from(child_layer - 1);
        Ok(Rad(self.0 | (u16::from(port) << shift)))
    }

    /// Port taken by the hop that reaches `layer` (1-based)
    pub fn port_at(self, layer: u8) -> u8 {
        debug_assert!(layer >= 1 && layer <= MAX_LAYERS);
        let shift = BITS_PER_LAYER * u32::from(layer - 1);
        ((self.0 >> shift) & PORT_MASK) as u8
    }

    /// Encode a port path, root first
    pub fn encode(path: &[u8]) -> Result<Rad> {
        path.iter()
            .enumerate()
            .try_fold(Rad::ROOT, |rad, (layer, &port)| rad.child(layer as u8, port))
    }

    /// Decode the port path of a device at `layer`, root first
    pub fn decode(self, layer: u8) -> Vec<u8> {
        (1..=layer.min(MAX_LAYERS)).map(|l| self.port_at(l)).collect()
    }
}

impl fmt::Display for Rad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}", self.0)
    }
}
