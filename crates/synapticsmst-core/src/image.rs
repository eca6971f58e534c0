//! Firmware image container

use std::sync::Arc;

/// An immutable firmware payload
///
/// The contents are opaque to the updater; only the length and byte checksum
/// are used.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FirmwareImage {
    data: Arc<[u8]>,
}

impl FirmwareImage {
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Checksum the device is expected to report after programming
    pub fn checksum(&self) -> u32 {
        checksum(&self.data)
    }
}

impl From<Vec<u8>> for FirmwareImage {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

/// Wrapping 32-bit sum of all bytes, as computed by the hub's checksum command
pub fn checksum(data: &[u8]) -> u32 {
    data.iter()
        .fold(0u32, |sum, &b| sum.wrapping_add(u32::from(b)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_checksum() {
        assert_eq!(checksum(&[]), 0);
        assert_eq!(checksum(&[1, 2, 3]), 6);
        assert_eq!(checksum(&[0xFF; 4]), 0x3FC);
    }

    #[test]
    fn test_image_accessors() {
        let image = FirmwareImage::from(vec![0x10, 0x20]);
        assert_eq!(image.len(), 2);
        assert!(!image.is_empty());
        assert_eq!(image.checksum(), 0x30);
        assert_eq!(image.as_bytes(), &[0x10, 0x20]);
    }
}
