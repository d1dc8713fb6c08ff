//! Region generation orchestration.
//!
//! This module drives a full region run:
//!
//! 1. **Planning** - allocate an identity and compose a document for every
//!    device index `1..=count`
//! 2. **Writing** - create the folder and write one JSON file per device
//! 3. **Manifest** - collect the endpoint URIs in index order and write
//!    `devices-<RR>.json`
//!
//! Planning completes before anything touches the disk, so under
//! [`FailurePolicy::AbortOnFirstError`] a failing device leaves no partial
//! region behind.

use std::fs;
use std::path::PathBuf;

use log::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::identity::{
    allocate, check_index, check_region, AllocationError, DeviceIdentity, DeviceLayout,
};
use crate::manifest::{write_manifest, Manifest, ManifestError};
use crate::overrides::{compose, ComposeError, ConfigOverrides, OverrideField};

/// What to do when a single device cannot be allocated or composed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Stop the run at the first failing device; nothing is written
    #[default]
    AbortOnFirstError,
    /// Log a warning, skip the device and keep going
    SkipAndContinue,
}

/// Parameters of one region generation run
#[derive(Debug, Clone)]
pub struct RegionRequest {
    pub layout: DeviceLayout,
    pub region: u32,
    pub base_port: u32,
    pub device_count: u32,
    pub policy: FailurePolicy,
}

/// Why a single device could not be generated
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DeviceError {
    #[error(transparent)]
    Allocation(#[from] AllocationError),
    #[error(transparent)]
    Compose(#[from] ComposeError),
}

/// Errors that end a region run
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    #[error("Region request cannot be addressed: {0}")]
    Request(#[source] AllocationError),

    #[error("Device {index} could not be generated: {source}")]
    Device {
        index: u32,
        #[source]
        source: DeviceError,
    },

    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize device {index}: {source}")]
    Serialize {
        index: u32,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

/// A device whose config file was written
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedDevice {
    pub identity: DeviceIdentity,
    pub config: DeviceConfig,
    pub uri: String,
}

/// A device left out under [`FailurePolicy::SkipAndContinue`]
#[derive(Debug, Clone, PartialEq)]
pub struct SkippedDevice {
    pub index: u32,
    pub reason: DeviceError,
}

/// Outcome of a region run
#[derive(Debug, Clone)]
pub struct RegionReport {
    pub generated: Vec<GeneratedDevice>,
    pub skipped: Vec<SkippedDevice>,
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
}

/// Allocate and compose the document for one device.
///
/// The allocated port always wins over any port in the template, and each
/// device gets a fresh uuid unless one was explicitly overridden.
pub fn plan_device(
    layout: &DeviceLayout,
    region: u32,
    index: u32,
    base_port: u32,
    template: Option<&DeviceConfig>,
    overrides: &ConfigOverrides,
) -> Result<(DeviceIdentity, DeviceConfig), DeviceError> {
    let identity = allocate(layout, region, index, base_port)?;
    let mut config = compose(template, overrides)?;
    config.server_port = identity.port;
    if !overrides.contains(OverrideField::Uuid) {
        config.uuid = uuid::Uuid::new_v4().to_string();
    }
    Ok((identity, config))
}

/// Generate every device of a region plus its manifest
pub fn generate_region(
    request: &RegionRequest,
    overrides: &ConfigOverrides,
    template: Option<&DeviceConfig>,
) -> Result<RegionReport, GenerationError> {
    info!(
        "Generating region {} with {} devices from base port {} into {:?}",
        request.region,
        request.device_count,
        request.base_port,
        request.layout.folder()
    );

    // The region and the last index bound every device of the run
    check_region(request.region).map_err(GenerationError::Request)?;
    if request.device_count > 0 {
        check_index(&request.layout, request.device_count).map_err(GenerationError::Request)?;
    }

    let mut overrides = overrides.clone();
    if let Some(port) = overrides.remove(OverrideField::Port) {
        warn!(
            "Ignoring port override '{}': region ports are allocated from the base port",
            port
        );
    }
    if overrides.contains(OverrideField::Uuid) && request.device_count > 1 {
        warn!(
            "UUID override applies to every device in the region; device uuids will not be unique"
        );
    }

    // Phase 1: plan every device
    let mut planned = Vec::new();
    let mut skipped = Vec::new();
    for index in 1..=request.device_count {
        match plan_device(
            &request.layout,
            request.region,
            index,
            request.base_port,
            template,
            &overrides,
        ) {
            Ok(device) => planned.push(device),
            Err(reason) => match request.policy {
                FailurePolicy::AbortOnFirstError => {
                    return Err(GenerationError::Device {
                        index,
                        source: reason,
                    });
                }
                FailurePolicy::SkipAndContinue => {
                    warn!("Skipping device {}: {}", index, reason);
                    skipped.push(SkippedDevice { index, reason });
                }
            },
        }
    }

    // Phase 2: write device files
    let folder = request.layout.folder();
    fs::create_dir_all(folder).map_err(|source| GenerationError::Io {
        path: folder.to_path_buf(),
        source,
    })?;

    let mut generated = Vec::with_capacity(planned.len());
    for (identity, config) in planned {
        let body = config
            .to_json_pretty()
            .map_err(|source| GenerationError::Serialize {
                index: identity.index,
                source,
            })?;
        fs::write(&identity.config_path, body).map_err(|source| GenerationError::Io {
            path: identity.config_path.clone(),
            source,
        })?;

        let uri = config.endpoint_uri();
        debug!("Wrote {:?} ({})", identity.config_path, uri);
        generated.push(GeneratedDevice {
            identity,
            config,
            uri,
        });
    }

    // Phase 3: manifest
    let manifest = Manifest::build(generated.iter().map(|device| device.uri.clone()));
    let manifest_path = write_manifest(&request.layout, request.region, &manifest)?;

    info!(
        "Region {} complete: {} devices written, {} skipped",
        request.region,
        generated.len(),
        skipped.len()
    );

    Ok(RegionReport {
        generated,
        skipped,
        manifest,
        manifest_path,
    })
}
