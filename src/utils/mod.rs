//! Shared utilities: override value validation and CLI argument mapping.

pub mod options;
pub mod validation;

pub use options::OverrideArgs;
pub use validation::{parse_battery_charge, parse_delay_profiles, parse_number, parse_port};
