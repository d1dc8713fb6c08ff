//! Region manifest: the ordered list of device endpoint URIs consumed by the
//! gateway.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};

use log::info;
use serde::{Deserialize, Serialize};

use crate::identity::DeviceLayout;

/// `{"devices": [uri, ...]}` in device-index order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub devices: Vec<String>,
}

impl Manifest {
    /// Build a manifest, preserving the order of `uris`
    pub fn build<I, S>(uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            devices: uris.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Read a manifest back, the way the gateway loads it
    pub fn from_file(path: &Path) -> Result<Self, ManifestError> {
        let file = File::open(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_reader(BufReader::new(file)).map_err(|source| ManifestError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Errors reading or writing a manifest file
#[derive(Debug, thiserror::Error)]
pub enum ManifestError {
    #[error("Manifest I/O error at {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Write the manifest for `region` to `<folder>/devices-<RR>.json`,
/// replacing any previous one. Returns the written path.
pub fn write_manifest(
    layout: &DeviceLayout,
    region: u32,
    manifest: &Manifest,
) -> Result<PathBuf, ManifestError> {
    let path = layout.manifest_path(region);
    let body = manifest.to_json_pretty().map_err(|source| ManifestError::Parse {
        path: path.clone(),
        source,
    })?;
    fs::write(&path, body).map_err(|source| ManifestError::Io {
        path: path.clone(),
        source,
    })?;
    info!("Wrote manifest with {} devices to {:?}", manifest.len(), path);
    Ok(path)
}
