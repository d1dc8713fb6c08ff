//! # FleetSim - Configuration generator and supervisor for simulated IoT fleets
//!
//! This library provides the core functionality for provisioning a fleet of
//! simulated CoAP devices for testing: deriving each device's identity,
//! writing its configuration document, publishing the region manifest the
//! gateway polls, and running the simulators as one supervised pool.
//!
//! ## Overview
//!
//! Every device is addressed by a region and a 1-based index within that
//! region. From `(region, index, base_port)` the crate derives:
//!
//! - **Port**: `base_port + index`, unique and increasing within a region
//! - **Config file**: `<folder>/device-<RR>-<DDD>.json`
//! - **Endpoint**: `coap://<host>:<port>/device/data`
//!
//! ## Architecture
//!
//! The library is organized into several modules:
//!
//! - `identity`: identity allocation and the file naming contract
//! - `config`: the device configuration document and its defaults
//! - `overrides`: sparse, validated field overrides and composition
//! - `config_loader`: YAML fleet settings and template loading
//! - `orchestrator`: region batch generation with explicit failure policy
//! - `manifest`: the ordered endpoint manifest consumed by the gateway
//! - `checker`: pre-flight checks of generated config files
//! - `process`: simulator process supervision
//! - `utils`: override validation and shared CLI flags
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fleetsim::identity::DeviceLayout;
//! use fleetsim::orchestrator::{generate_region, FailurePolicy, RegionRequest};
//! use fleetsim::overrides::{ConfigOverrides, OverrideField};
//!
//! let request = RegionRequest {
//!     layout: DeviceLayout::new("devices"),
//!     region: 1,
//!     base_port: 5000,
//!     device_count: 10,
//!     policy: FailurePolicy::AbortOnFirstError,
//! };
//! let overrides = ConfigOverrides::new().with(OverrideField::Host, "0.0.0.0");
//!
//! let report = generate_region(&request, &overrides, None)?;
//!
//! // devices/ now contains device-01-001.json ... device-01-010.json
//! // and devices-01.json listing coap://0.0.0.0:5001/device/data ...
//! println!("{} devices in {:?}", report.manifest.len(), report.manifest_path);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Running a Fleet
//!
//! ```bash
//! # Generate region 1 with 20 devices
//! fleetsim region --folder devices --region 1 --base-port 5000 --count 20
//!
//! # Launch devices 1..=20 and stop them all with Ctrl-C
//! fleet-supervisor --folder devices --region 1 --start 1 --end 20
//! ```
//!
//! ## Error Handling
//!
//! Each module defines its own `thiserror` error type. The binaries wrap them
//! with `color_eyre` for reporting.

pub mod checker;
pub mod config;
pub mod config_loader;
pub mod identity;
pub mod manifest;
pub mod orchestrator;
pub mod overrides;
pub mod process;
pub mod utils;
