//! Device identity allocation module.
//!
//! This module maps the fleet numbering scheme (region, device index, base
//! port) onto stable network identities and onto the file-naming contract
//! shared by the generator and the supervisor.

pub mod allocator;
pub mod naming;

// Re-export commonly used types
pub use allocator::{
    allocate, check_index, check_region, AllocationError, DeviceIdentity, MAX_PORT, MIN_PORT,
};
pub use naming::{DeviceLayout, DEFAULT_DEVICE_ID_WIDTH, MAX_REGION};
