//! drm_dp_aux character device access
//!
//! The kernel exposes the AUX channel of every DisplayPort connector as
//! `/dev/drm_dp_auxN`. The file offset is the DPCD address, so register
//! access is plain positioned reads and writes.

use crate::error::{DrmAuxError, Result};
use log::{debug, info, warn};
use nix::errno::Errno;
use nix::fcntl::{Flock, FlockArg};
use nix::sys::stat::{major, minor};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io;
use std::os::unix::fs::{FileExt, MetadataExt};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use synapticsmst_core::aux::{AuxBus, AuxChannel, AuxNode};
use synapticsmst_core::error::{ChannelError, OpenError};

/// Default device directory
pub const DEFAULT_DIR: &str = "/dev";

/// Character device major:minor pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceNumber {
    pub major: u64,
    pub minor: u64,
}

impl DeviceNumber {
    fn of(path: &Path) -> io::Result<Self> {
        let rdev = std::fs::metadata(path)?.rdev() as nix::libc::dev_t;
        Ok(Self {
            major: major(rdev),
            minor: minor(rdev),
        })
    }
}

impl FromStr for DeviceNumber {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (major, minor) = s
            .split_once(':')
            .ok_or_else(|| format!("'{}' is not in major:minor form", s))?;
        Ok(Self {
            major: major
                .parse()
                .map_err(|_| format!("'{}' is not a valid major number", major))?,
            minor: minor
                .parse()
                .map_err(|_| format!("'{}' is not a valid minor number", minor))?,
        })
    }
}

impl fmt::Display for DeviceNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.major, self.minor)
    }
}

/// Configuration for the drm_dp_aux backend
#[derive(Debug, Clone)]
pub struct DrmAuxConfig {
    /// Directory holding the `drm_dp_auxN` nodes
    pub dir: PathBuf,
    /// Only use the node with this device number
    pub device: Option<DeviceNumber>,
}

impl Default for DrmAuxConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(DEFAULT_DIR),
            device: None,
        }
    }
}

impl DrmAuxConfig {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Default::default()
        }
    }

    /// Restrict the bus to one device node
    pub fn with_device(mut self, device: DeviceNumber) -> Self {
        self.device = Some(device);
        self
    }
}

/// AUX bus over the kernel's drm_dp_aux device nodes
///
/// Each open takes an exclusive, non-blocking `flock` on the node. A node
/// held by another process (or by another open channel of this one) reports
/// [`OpenError::Busy`].
#[derive(Debug, Clone)]
pub struct DrmAuxBus {
    config: DrmAuxConfig,
}

impl DrmAuxBus {
    pub fn new(config: DrmAuxConfig) -> Result<Self> {
        if !config.dir.is_dir() {
            return Err(DrmAuxError::NoDirectory(config.dir.display().to_string()));
        }
        info!("drm_dp_aux: using device nodes in {}", config.dir.display());
        Ok(Self { config })
    }

    /// Path of the device node for `node`
    pub fn node_path(&self, node: AuxNode) -> PathBuf {
        self.config.dir.join(format!("drm_dp_aux{}", node.index()))
    }

    /// Whether `path` passes the device number filter
    fn selected(&self, path: &Path) -> std::result::Result<bool, OpenError> {
        let Some(wanted) = self.config.device else {
            return Ok(true);
        };
        let found = DeviceNumber::of(path).map_err(OpenError::from_io)?;
        if found != wanted {
            debug!(
                "drm_dp_aux: skipping {} ({} is not {})",
                path.display(),
                found,
                wanted
            );
        }
        Ok(found == wanted)
    }
}

impl AuxBus for DrmAuxBus {
    fn open(&self, node: AuxNode) -> std::result::Result<Box<dyn AuxChannel + '_>, OpenError> {
        let path = self.node_path(node);
        if !self.selected(&path)? {
            return Err(OpenError::NotPresent);
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(&path)
            .map_err(OpenError::from_io)?;

        let file = match Flock::lock(file, FlockArg::LockExclusiveNonblock) {
            Ok(locked) => locked,
            Err((_, errno)) if errno == Errno::EWOULDBLOCK => {
                warn!("drm_dp_aux: {} is in use", path.display());
                return Err(OpenError::Busy);
            }
            Err((_, errno)) => return Err(OpenError::Io(io::Error::from(errno))),
        };

        debug!("drm_dp_aux: opened {}", path.display());
        Ok(Box::new(DrmAuxChannel { file }))
    }
}

/// An open, locked drm_dp_aux node; unlocked and closed on drop
struct DrmAuxChannel {
    file: Flock<File>,
}

impl AuxChannel for DrmAuxChannel {
    fn read_dpcd(&mut self, addr: u32, buf: &mut [u8]) -> std::result::Result<(), ChannelError> {
        let len = buf.len();
        let mut done = 0;
        while done < len {
            match self.file.read_at(&mut buf[done..], (addr as usize + done) as u64) {
                Ok(0) => return Err(ChannelError::Short { addr, len, done }),
                Ok(n) => done += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => return Err(ChannelError::Read { addr, len, source }),
            }
        }
        Ok(())
    }

    fn write_dpcd(&mut self, addr: u32, data: &[u8]) -> std::result::Result<(), ChannelError> {
        let len = data.len();
        let mut done = 0;
        while done < len {
            match self.file.write_at(&data[done..], (addr as usize + done) as u64) {
                Ok(0) => return Err(ChannelError::Short { addr, len, done }),
                Ok(n) => done += n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(source) => return Err(ChannelError::Write { addr, len, source }),
            }
        }
        Ok(())
    }
}

/// Parse backend options from key-value pairs
///
/// # Supported options
/// - `dir=<path>` - directory holding the device nodes (default: `/dev`)
/// - `device=<major:minor>` - only use the node with this device number
pub fn parse_options(options: &[(&str, &str)]) -> Result<DrmAuxConfig> {
    let mut config = DrmAuxConfig::default();

    for (key, value) in options {
        match *key {
            "dir" => config.dir = PathBuf::from(value),
            "device" => {
                config.device = Some(value.parse().map_err(|message| {
                    DrmAuxError::InvalidParameter {
                        name: "device",
                        message,
                    }
                })?);
            }
            _ => {
                warn!("Unknown drm_dp_aux option: {}={}", key, value);
            }
        }
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn node(i: u8) -> AuxNode {
        AuxNode::new(i).unwrap()
    }

    /// A directory with a fake node 1 backed by a 2 KiB regular file
    fn fake_nodes() -> (TempDir, DrmAuxBus) {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("drm_dp_aux1"), vec![0u8; 0x800]).unwrap();
        let bus = DrmAuxBus::new(DrmAuxConfig::new(dir.path())).unwrap();
        (dir, bus)
    }

    #[test]
    fn test_parse_options() {
        let config = parse_options(&[("dir", "/tmp/aux"), ("device", "226:3")]).unwrap();
        assert_eq!(config.dir, PathBuf::from("/tmp/aux"));
        assert_eq!(
            config.device,
            Some(DeviceNumber {
                major: 226,
                minor: 3
            })
        );

        assert!(parse_options(&[("device", "226")]).is_err());
        assert!(parse_options(&[("device", "a:b")]).is_err());
        assert_eq!(parse_options(&[]).unwrap().dir, PathBuf::from(DEFAULT_DIR));
    }

    #[test]
    fn test_missing_directory() {
        assert!(matches!(
            DrmAuxBus::new(DrmAuxConfig::new("/nonexistent/drm")),
            Err(DrmAuxError::NoDirectory(_))
        ));
    }

    #[test]
    fn test_missing_node_is_not_present() {
        let (_dir, bus) = fake_nodes();
        assert!(matches!(bus.open(node(0)), Err(OpenError::NotPresent)));
    }

    #[test]
    fn test_register_access_uses_file_offset() {
        let (dir, bus) = fake_nodes();
        {
            let mut channel = bus.open(node(1)).unwrap();
            channel.write_dpcd(0x4B0, &[0xAA, 0xBB]).unwrap();
            let mut buf = [0u8; 3];
            channel.read_dpcd(0x4AF, &mut buf).unwrap();
            assert_eq!(buf, [0x00, 0xAA, 0xBB]);
        }
        let raw = std::fs::read(dir.path().join("drm_dp_aux1")).unwrap();
        assert_eq!(&raw[0x4B0..0x4B2], &[0xAA, 0xBB]);
    }

    #[test]
    fn test_read_past_end_is_short() {
        let (_dir, bus) = fake_nodes();
        let mut channel = bus.open(node(1)).unwrap();
        let mut buf = [0u8; 4];
        assert!(matches!(
            channel.read_dpcd(0x7FE, &mut buf),
            Err(ChannelError::Short { done: 2, len: 4, .. })
        ));
    }

    #[test]
    fn test_second_open_is_busy() {
        let (_dir, bus) = fake_nodes();
        let first = bus.open(node(1)).unwrap();
        assert!(matches!(bus.open(node(1)), Err(OpenError::Busy)));
        drop(first);
        assert!(bus.open(node(1)).is_ok());
    }

    #[test]
    fn test_device_filter_hides_other_nodes() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("drm_dp_aux0"), [0u8; 16]).unwrap();
        // Regular files have device number 0:0
        let config = DrmAuxConfig::new(dir.path()).with_device(DeviceNumber {
            major: 226,
            minor: 1,
        });
        let bus = DrmAuxBus::new(config).unwrap();
        assert!(matches!(bus.open(node(0)), Err(OpenError::NotPresent)));

        let config = DrmAuxConfig::new(dir.path()).with_device(DeviceNumber { major: 0, minor: 0 });
        let bus = DrmAuxBus::new(config).unwrap();
        assert!(bus.open(node(0)).is_ok());
    }
}
