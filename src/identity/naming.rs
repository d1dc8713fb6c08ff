//! File naming contract for device configuration files and manifests.
//!
//! Both the batch generator and the process supervisor resolve paths through
//! [`DeviceLayout`], so a fleet written by one is always found by the other.

use std::path::{Path, PathBuf};

/// Zero-padding width of the device id segment in config file names.
///
/// `device-01-001.json` for region 1, device 1.
pub const DEFAULT_DEVICE_ID_WIDTH: usize = 3;

/// Region ids are always rendered as two digits.
pub const REGION_ID_WIDTH: usize = 2;

/// Highest region number that fits the two-digit region segment.
pub const MAX_REGION: u32 = 99;

/// Where device files live and how their names are padded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceLayout {
    /// Folder holding the device config files and the region manifest
    pub folder: PathBuf,
    /// Width of the zero-padded device id segment
    pub device_id_width: usize,
}

impl DeviceLayout {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
            device_id_width: DEFAULT_DEVICE_ID_WIDTH,
        }
    }

    pub fn with_device_id_width(mut self, width: usize) -> Self {
        self.device_id_width = width;
        self
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Largest device index representable with the configured width
    pub fn max_device_index(&self) -> u32 {
        let width = u32::try_from(self.device_id_width).unwrap_or(u32::MAX);
        10u32
            .checked_pow(width)
            .map_or(u32::MAX, |capacity| capacity - 1)
    }

    /// Two-digit region id, e.g. `07`
    pub fn region_id(&self, region: u32) -> String {
        format!("{:0width$}", region, width = REGION_ID_WIDTH)
    }

    /// Zero-padded device id, e.g. `042`
    pub fn device_id(&self, index: u32) -> String {
        format!("{:0width$}", index, width = self.device_id_width)
    }

    /// `<folder>/device-<RR>-<DDD>.json`
    pub fn config_path(&self, region: u32, index: u32) -> PathBuf {
        self.folder.join(format!(
            "device-{}-{}.json",
            self.region_id(region),
            self.device_id(index)
        ))
    }

    /// `<folder>/devices-<RR>.json`
    pub fn manifest_path(&self, region: u32) -> PathBuf {
        self.folder.join(format!("devices-{}.json", self.region_id(region)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layout_paths() {
        let layout = DeviceLayout::new("devices");
        assert_eq!(
            layout.config_path(1, 7),
            PathBuf::from("devices/device-01-007.json")
        );
        assert_eq!(layout.manifest_path(3), PathBuf::from("devices/devices-03.json"));
    }

    #[test]
    fn test_custom_device_id_width() {
        let layout = DeviceLayout::new("out").with_device_id_width(4);
        assert_eq!(layout.config_path(12, 15), PathBuf::from("out/device-12-0015.json"));
        assert_eq!(layout.max_device_index(), 9999);
    }

    #[test]
    fn test_max_device_index_default_width() {
        assert_eq!(DeviceLayout::new(".").max_device_index(), 999);
    }
}
