//! Port and identity allocation logic.
//!
//! A device identity is fully derived from `(region, index, base_port)`:
//! the port is `base_port + index`, so ports are unique and strictly
//! increasing within a region for a fixed base port.

use std::path::PathBuf;

use super::naming::{DeviceLayout, MAX_REGION};

/// Lowest port a simulated device may listen on
pub const MIN_PORT: u32 = 1024;
/// Highest valid port
pub const MAX_PORT: u32 = 65535;

/// Errors raised while deriving a device identity
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AllocationError {
    #[error("Invalid argument {name}={value}: {reason}")]
    InvalidArgument {
        name: &'static str,
        value: u64,
        reason: String,
    },

    #[error("Port {port} for device {index} is outside the valid range [1024, 65535]")]
    OutOfRange { index: u32, port: u64 },
}

/// Network identity and file location of one simulated device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceIdentity {
    pub region: u32,
    pub index: u32,
    /// Two-digit region id
    pub region_id: String,
    /// Zero-padded device id
    pub device_id: String,
    pub port: u16,
    pub config_path: PathBuf,
}

/// Reject regions that do not fit the two-digit region segment
pub fn check_region(region: u32) -> Result<(), AllocationError> {
    if region > MAX_REGION {
        return Err(AllocationError::InvalidArgument {
            name: "region",
            value: u64::from(region),
            reason: format!("region ids are two digits (0-{})", MAX_REGION),
        });
    }
    Ok(())
}

/// Reject index zero and indices wider than the layout's device id segment
pub fn check_index(layout: &DeviceLayout, index: u32) -> Result<(), AllocationError> {
    if index == 0 {
        return Err(AllocationError::InvalidArgument {
            name: "index",
            value: 0,
            reason: "device indices start at 1".to_string(),
        });
    }
    if index > layout.max_device_index() {
        return Err(AllocationError::InvalidArgument {
            name: "index",
            value: u64::from(index),
            reason: format!(
                "does not fit a {}-digit device id",
                layout.device_id_width
            ),
        });
    }
    Ok(())
}

/// Derive the identity of device `index` in `region`.
///
/// # Errors
/// * `InvalidArgument` if the region does not fit the two-digit segment, the
///   index is zero, or the index does not fit the layout's device id width
/// * `OutOfRange` if `base_port + index` is not a usable port
pub fn allocate(
    layout: &DeviceLayout,
    region: u32,
    index: u32,
    base_port: u32,
) -> Result<DeviceIdentity, AllocationError> {
    check_region(region)?;
    check_index(layout, index)?;

    let port = u64::from(base_port) + u64::from(index);
    let port = match u16::try_from(port) {
        Ok(p) if u32::from(p) >= MIN_PORT => p,
        _ => return Err(AllocationError::OutOfRange { index, port }),
    };

    Ok(DeviceIdentity {
        region,
        index,
        region_id: layout.region_id(region),
        device_id: layout.device_id(index),
        port,
        config_path: layout.config_path(region, index),
    })
}
