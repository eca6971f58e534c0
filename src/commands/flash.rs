//! Flash command implementation

use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::info;
use std::path::Path;
use std::time::Duration;
use synapticsmst_core::{discover, update, AuxBus, Cancellable, FirmwareImage, FlashProgress};

/// Progress reporter using indicatif progress bars
struct IndicatifProgress {
    multi: MultiProgress,
    current_bar: Option<ProgressBar>,
}

impl IndicatifProgress {
    fn new() -> Self {
        Self {
            multi: MultiProgress::new(),
            current_bar: None,
        }
    }

    fn create_bar(&mut self, total: u64, template: &str) {
        let pb = self.multi.add(ProgressBar::new(total));
        pb.set_style(
            ProgressStyle::default_bar()
                .template(template)
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("#>-"),
        );
        self.current_bar = Some(pb);
    }

    fn create_spinner(&mut self, message: &'static str) {
        let pb = self.multi.add(ProgressBar::new_spinner());
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(message);
        pb.enable_steady_tick(Duration::from_millis(100));
        self.current_bar = Some(pb);
    }

    fn finish(&mut self, message: &'static str) {
        if let Some(pb) = self.current_bar.take() {
            pb.finish_with_message(message);
        }
    }

    fn set_position(&self, pos: usize) {
        if let Some(pb) = &self.current_bar {
            pb.set_position(pos as u64);
        }
    }
}

impl FlashProgress for IndicatifProgress {
    fn erasing(&mut self, sectors: usize) {
        self.create_bar(
            sectors as u64,
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} sectors ({eta}) Erasing",
        );
    }

    fn erase_progress(&mut self, sectors_erased: usize) {
        self.set_position(sectors_erased);
    }

    fn writing(&mut self, total_bytes: usize) {
        self.finish("Erase complete");
        self.create_bar(
            total_bytes as u64,
            "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, {eta}) Writing",
        );
    }

    fn write_progress(&mut self, bytes_written: usize) {
        self.set_position(bytes_written);
    }

    fn verifying(&mut self) {
        self.finish("Write complete");
        self.create_spinner("Verifying checksum...");
    }

    fn complete(&mut self) {
        self.finish("Verification passed");
    }
}

impl Drop for IndicatifProgress {
    fn drop(&mut self) {
        if let Some(pb) = self.current_bar.take() {
            pb.abandon();
        }
    }
}

/// Run the flash command
///
/// `index` is the 1-based device number printed by `enumerate`.
pub fn run_flash(
    bus: &dyn AuxBus,
    file: &Path,
    index: usize,
    cancel: &Cancellable,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut topology = discover(bus, cancel)?;
    let device = topology.select(index)?;

    cancel.check()?;
    device.enumerate(bus)?;

    let data = std::fs::read(file).map_err(|e| {
        format!(
            "Failed to flash firmware: can't load file {}: {}",
            file.display(),
            e
        )
    })?;
    let image = FirmwareImage::new(data);
    info!("Read {} bytes from {}", image.len(), file.display());

    let mut progress = IndicatifProgress::new();
    update(bus, device, &image, &mut progress, cancel)?;

    println!("Update successful. Please reset the device to apply the new firmware");
    Ok(())
}
