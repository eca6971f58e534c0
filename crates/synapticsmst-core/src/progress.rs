//! Firmware write progress reporting

/// Progress callbacks for [`update`](crate::update::update)
pub trait FlashProgress {
    /// Called before erasing `sectors` flash sectors
    fn erasing(&mut self, sectors: usize);

    /// Called after each sector is erased
    fn erase_progress(&mut self, sectors_erased: usize);

    /// Called before programming `total_bytes`
    fn writing(&mut self, total_bytes: usize);

    /// Called after each programmed block
    fn write_progress(&mut self, bytes_written: usize);

    /// Called before the checksum is read back
    fn verifying(&mut self);

    /// Called once the checksum matched
    fn complete(&mut self);
}

/// A no-op progress reporter
pub struct NoProgress;

impl FlashProgress for NoProgress {
    fn erasing(&mut self, _sectors: usize) {}
    fn erase_progress(&mut self, _sectors_erased: usize) {}
    fn writing(&mut self, _total_bytes: usize) {}
    fn write_progress(&mut self, _bytes_written: usize) {}
    fn verifying(&mut self) {}
    fn complete(&mut self) {}
}
