//! Device configuration document.
//!
//! One JSON document per simulated device. The field layout is the one the
//! simulator reads at startup; [`DeviceConfig::with_uuid`] holds the built-in
//! defaults shared by every generator.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::identity::{MAX_PORT, MIN_PORT};

/// Fixed resource path every simulated device serves its readings on
pub const RESOURCE_PATH: [&str; 2] = ["device", "data"];

/// Resolved configuration document for a single simulated device.
///
/// Field order matches the JSON layout the simulator reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceConfig {
    /// Address the simulator binds to
    pub server_host: String,
    /// Port the simulator binds to, within [1024, 65535]
    pub server_port: u16,
    /// CoAP resource path segments
    pub resource_path: Vec<String>,
    /// Geographic position shown on the live map
    pub coordinate: Coordinate,
    /// Simulated temperature bounds, `(min, max)`
    pub temperature_range: (f64, f64),
    /// Percentage of requests the device silently drops
    pub drop_percentage: f64,
    /// Weighted response delay profiles
    pub delay_profiles: Vec<DelayProfile>,
    /// Unique device identifier
    pub uuid: String,
    /// Battery drained per idle tick
    pub battery_idle_discharge: f64,
    /// Battery drained per answered request
    pub battery_transmit_discharge: f64,
    /// Initial battery charge, within [0, 100]
    pub battery_charge: f64,
}

/// Latitude/longitude pair
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

/// One weighted delay band: with `probability` percent chance a response is
/// delayed between `min` and `max` seconds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DelayProfile {
    pub probability: f64,
    pub min: f64,
    pub max: f64,
}

impl DeviceConfig {
    /// Built-in defaults with the given uuid.
    ///
    /// This is the only place default values live; both the from-scratch and
    /// the template paths start from here.
    pub fn with_uuid(uuid: impl Into<String>) -> Self {
        Self {
            server_host: "127.0.0.1".to_string(),
            server_port: 5001,
            resource_path: RESOURCE_PATH.iter().map(|s| s.to_string()).collect(),
            coordinate: Coordinate {
                latitude: 40.7,
                longitude: -74.0,
            },
            temperature_range: (20.0, 30.0),
            drop_percentage: 5.0,
            delay_profiles: vec![DelayProfile {
                probability: 100.0,
                min: 0.1,
                max: 0.5,
            }],
            uuid: uuid.into(),
            battery_idle_discharge: 0.1,
            battery_transmit_discharge: 1.0,
            battery_charge: 90.0,
        }
    }

    /// Load a device document from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, DocumentError> {
        let file = File::open(path).map_err(|source| DocumentError::Io {
            path: path.display().to_string(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| DocumentError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    /// Pretty-printed JSON, as written to device files
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Numeric fields outside the bounds the simulator accepts: port,
    /// drop percentage, battery charge and discharge rates
    pub fn range_violations(&self) -> Vec<String> {
        let mut problems = Vec::new();

        if u32::from(self.server_port) < MIN_PORT || u32::from(self.server_port) > MAX_PORT {
            problems.push(format!(
                "server_port {} is outside [{}, {}]",
                self.server_port, MIN_PORT, MAX_PORT
            ));
        }
        if !(0.0..=100.0).contains(&self.drop_percentage) {
            problems.push(format!(
                "drop_percentage {} is outside [0, 100]",
                self.drop_percentage
            ));
        }
        if !(0.0..=100.0).contains(&self.battery_charge) {
            problems.push(format!(
                "battery_charge {} is outside [0, 100]",
                self.battery_charge
            ));
        }
        if self.battery_idle_discharge < 0.0 {
            problems.push("battery_idle_discharge is negative".to_string());
        }
        if self.battery_transmit_discharge < 0.0 {
            problems.push("battery_transmit_discharge is negative".to_string());
        }

        problems
    }

    /// Endpoint URI the gateway polls for this device
    pub fn endpoint_uri(&self) -> String {
        format!(
            "coap://{}:{}/{}",
            self.server_host,
            self.server_port,
            RESOURCE_PATH.join("/")
        )
    }
}

/// Defaults with a freshly generated uuid
impl Default for DeviceConfig {
    fn default() -> Self {
        Self::with_uuid(uuid::Uuid::new_v4().to_string())
    }
}

/// Errors reading a device document from disk
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}
