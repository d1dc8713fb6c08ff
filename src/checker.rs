//! Pre-flight checks for generated device config files.
//!
//! The simulator refuses to start when its delay profile probabilities do not
//! add up to 100, and it trusts every other value blindly. This module runs
//! the same checks up front, so a bad fleet is caught before the supervisor
//! launches it.

use std::path::{Path, PathBuf};

use crate::config::DeviceConfig;

/// Tolerance when comparing the probability total against 100
const PROBABILITY_EPSILON: f64 = 1e-6;

/// Result of checking one config file
#[derive(Debug, Clone, PartialEq)]
pub struct CheckReport {
    pub path: PathBuf,
    pub problems: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.problems.is_empty()
    }
}

/// Check a device config file on disk
pub fn check_config_file(path: &Path) -> CheckReport {
    let problems = match DeviceConfig::from_file(path) {
        Ok(config) => check_config(&config),
        Err(e) => vec![e.to_string()],
    };
    CheckReport {
        path: path.to_path_buf(),
        problems,
    }
}

/// Check an in-memory device document
pub fn check_config(config: &DeviceConfig) -> Vec<String> {
    let mut problems = Vec::new();

    if config.server_host.trim().is_empty() {
        problems.push("server_host is empty".to_string());
    }
    if config.uuid.trim().is_empty() {
        problems.push("uuid is empty".to_string());
    }

    let (min, max) = config.temperature_range;
    if min > max {
        problems.push(format!("temperature_range is inverted: [{}, {}]", min, max));
    }
    problems.extend(config.range_violations());

    if config.delay_profiles.is_empty() {
        problems.push("delay_profiles is empty".to_string());
    } else {
        let total: f64 = config.delay_profiles.iter().map(|p| p.probability).sum();
        if (total - 100.0).abs() > PROBABILITY_EPSILON {
            problems.push(format!(
                "delay profile probabilities must total 100, found {}",
                total
            ));
        }
    }
    for (i, profile) in config.delay_profiles.iter().enumerate() {
        if profile.min > profile.max {
            problems.push(format!(
                "delay profile {} has min {} > max {}",
                i, profile.min, profile.max
            ));
        }
    }

    problems
}
