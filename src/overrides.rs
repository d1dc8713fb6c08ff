//! Template/override composition.
//!
//! A [`ConfigOverrides`] set is a sparse map from field to raw string. Each
//! present value is validated, then merged field by field onto a copy of
//! the base document. Absent fields keep the base value, so composing with
//! an empty set is the identity.

use std::collections::BTreeMap;
use std::fmt;

use log::debug;

use crate::config::DeviceConfig;
use crate::utils::validation::{
    parse_battery_charge, parse_bounded, parse_delay_profiles, parse_non_empty, parse_number,
    parse_port,
};

/// Fields that may be overridden from the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OverrideField {
    Host,
    Port,
    Latitude,
    Longitude,
    Uuid,
    TempMin,
    TempMax,
    Drop,
    BatteryIdle,
    BatteryTx,
    BatteryCharge,
    DelayProfiles,
}

impl OverrideField {
    /// Every overridable field, in document order
    pub const ALL: [OverrideField; 12] = [
        OverrideField::Host,
        OverrideField::Port,
        OverrideField::Latitude,
        OverrideField::Longitude,
        OverrideField::Uuid,
        OverrideField::TempMin,
        OverrideField::TempMax,
        OverrideField::Drop,
        OverrideField::BatteryIdle,
        OverrideField::BatteryTx,
        OverrideField::BatteryCharge,
        OverrideField::DelayProfiles,
    ];

    /// Name of the document field this override targets
    pub fn as_str(&self) -> &'static str {
        match self {
            OverrideField::Host => "server_host",
            OverrideField::Port => "server_port",
            OverrideField::Latitude => "latitude",
            OverrideField::Longitude => "longitude",
            OverrideField::Uuid => "uuid",
            OverrideField::TempMin => "temperature_min",
            OverrideField::TempMax => "temperature_max",
            OverrideField::Drop => "drop_percentage",
            OverrideField::BatteryIdle => "battery_idle_discharge",
            OverrideField::BatteryTx => "battery_transmit_discharge",
            OverrideField::BatteryCharge => "battery_charge",
            OverrideField::DelayProfiles => "delay_profiles",
        }
    }
}

impl fmt::Display for OverrideField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Field-level validation errors raised during composition
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ComposeError {
    #[error("Invalid number for {field}: '{value}'")]
    InvalidNumber { field: OverrideField, value: String },

    #[error("Invalid port '{0}': must be an integer between 1024 and 65535")]
    InvalidPort(String),

    #[error("Invalid battery charge '{0}': must be a number between 0 and 100")]
    InvalidBatteryCharge(String),

    #[error("Invalid delay profiles JSON: {0}")]
    InvalidProfileJson(String),

    #[error("Server host cannot be empty")]
    EmptyHost,

    #[error("UUID cannot be empty")]
    EmptyUuid,

    #[error("Value '{value}' for {field} is out of range {bounds}")]
    OutOfRange {
        field: OverrideField,
        value: String,
        bounds: String,
    },

    #[error("Temperature range is inverted: min {min} > max {max}")]
    InvertedTemperatureRange { min: f64, max: f64 },
}

/// Sparse set of raw field overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    values: BTreeMap<OverrideField, String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set (or replace) the raw value for `field`
    pub fn set(&mut self, field: OverrideField, raw: impl Into<String>) -> &mut Self {
        self.values.insert(field, raw.into());
        self
    }

    /// Builder-style variant of [`ConfigOverrides::set`]
    pub fn with(mut self, field: OverrideField, raw: impl Into<String>) -> Self {
        self.set(field, raw);
        self
    }

    /// Drop an override, returning its raw value if it was present
    pub fn remove(&mut self, field: OverrideField) -> Option<String> {
        self.values.remove(&field)
    }

    pub fn get(&self, field: OverrideField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    pub fn contains(&self, field: OverrideField) -> bool {
        self.values.contains_key(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (OverrideField, &str)> {
        self.values.iter().map(|(field, raw)| (*field, raw.as_str()))
    }
}

impl FromIterator<(OverrideField, String)> for ConfigOverrides {
    fn from_iter<I: IntoIterator<Item = (OverrideField, String)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

/// Compose a device document from `base` (or the built-in defaults) and a
/// sparse override set.
///
/// `base` is never modified. All present overrides are validated; the first
/// invalid value aborts composition.
pub fn compose(
    base: Option<&DeviceConfig>,
    overrides: &ConfigOverrides,
) -> Result<DeviceConfig, ComposeError> {
    let mut config = match base {
        Some(template) => template.clone(),
        None => DeviceConfig::default(),
    };

    for (field, raw) in overrides.iter() {
        debug!("Applying override {}={}", field, raw);
        apply_field(&mut config, field, raw)?;
    }

    // Only an overridden bound can invert the range; a template is taken as-is.
    if overrides.contains(OverrideField::TempMin) || overrides.contains(OverrideField::TempMax) {
        let (min, max) = config.temperature_range;
        if min > max {
            return Err(ComposeError::InvertedTemperatureRange { min, max });
        }
    }

    Ok(config)
}

fn apply_field(
    config: &mut DeviceConfig,
    field: OverrideField,
    raw: &str,
) -> Result<(), ComposeError> {
    match field {
        OverrideField::Host => config.server_host = parse_non_empty(field, raw)?,
        OverrideField::Port => config.server_port = parse_port(raw)?,
        OverrideField::Latitude => config.coordinate.latitude = parse_number(field, raw)?,
        OverrideField::Longitude => config.coordinate.longitude = parse_number(field, raw)?,
        OverrideField::Uuid => config.uuid = parse_non_empty(field, raw)?,
        OverrideField::TempMin => config.temperature_range.0 = parse_number(field, raw)?,
        OverrideField::TempMax => config.temperature_range.1 = parse_number(field, raw)?,
        OverrideField::Drop => config.drop_percentage = parse_bounded(field, raw, 0.0, 100.0)?,
        OverrideField::BatteryIdle => {
            config.battery_idle_discharge = parse_bounded(field, raw, 0.0, f64::INFINITY)?;
        }
        OverrideField::BatteryTx => {
            config.battery_transmit_discharge = parse_bounded(field, raw, 0.0, f64::INFINITY)?;
        }
        OverrideField::BatteryCharge => config.battery_charge = parse_battery_charge(raw)?,
        OverrideField::DelayProfiles => config.delay_profiles = parse_delay_profiles(raw)?,
    }
    Ok(())
}
