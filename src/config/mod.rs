// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration management for the wellhead telemetry processes
//!
//! This module provides functionality for loading, validating, and applying
//! configuration settings. The configuration is backed by a YAML file and
//! validated against a JSON schema for robustness.
//!
//! ## Configuration Structure
//!
//! One file serves the three processes, each reading its own section:
//! - `wellhead`: the simulated device and its Modbus TCP server
//! - `relay`: the poll-relay loop, its uplink and downlink
//! - `ground_station`: the classifier, session log and plot
//!
//! ## Usage
//!
//! ```no_run
//! use wellhead_telemetry::config::Config;
//! use std::path::Path;
//!
//! // Load config from file, creates a default if not found
//! let mut config = Config::from_file(Path::new("config.yaml")).unwrap();
//!
//! // Apply command line overrides if needed
//! config.apply_relay_args(
//!     Some("192.168.1.20".to_string()), // Wellhead address
//!     None,                             // Wellhead port
//!     Some(500),                        // Poll interval (ms)
//!     None,                             // Read timeout (ms)
//!     None,                             // Downlink address
//!     None,                             // Downlink port
//! )
//! .unwrap();
//!
//! println!("Polling every {} ms", config.relay.poll_interval_ms);
//! ```

pub mod ground_station;
pub mod relay;
pub mod utils;
pub mod wellhead;

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, error};
use serde::{Deserialize, Serialize};

pub use ground_station::{GroundStationConfig, PositionFeed};
pub use relay::RelayConfig;
pub use utils::{is_valid_ip_address, output_config_schema};
pub use wellhead::WellheadConfig;

/// Embedded JSON schema of the configuration file.
pub const CONFIG_SCHEMA: &str = include_str!("../../resources/config.schema.json");

/// Root configuration structure.
///
/// Every section falls back to its defaults when absent, so a file only needs
/// to mention the settings it changes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Simulated wellhead settings.
    #[serde(default)]
    pub wellhead: WellheadConfig,

    /// Poll-relay settings.
    #[serde(default)]
    pub relay: RelayConfig,

    /// Ground station settings.
    #[serde(default)]
    pub ground_station: GroundStationConfig,
}

impl Config {
    /// Helper method to create a sample config file when validation fails
    fn create_sample_config<P: AsRef<Path>>(path: P) -> Result<()> {
        let path = path.as_ref();
        let sample_path = path.with_extension("sample.yaml");
        debug!("Original path: {:?}, Sample path: {:?}", path, sample_path);

        if let Some(parent) = sample_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                debug!("Creating parent directory: {:?}", parent);
                fs::create_dir_all(parent).with_context(|| {
                    format!(
                        "Failed to create parent directory for sample config at {:?}",
                        parent
                    )
                })?;
            }
        }

        Self::default()
            .save_to_file(&sample_path)
            .with_context(|| format!("Failed to save sample config to {:?}", sample_path))?;

        error!(
            "Sample configuration file created at {:?}\nPlease edit and rename it",
            sample_path
        );
        Ok(())
    }

    /// Load the configuration at `path`.
    ///
    /// A missing file is created with the defaults. A file that fails schema
    /// validation, deserialization or the additional rules is rejected and a
    /// `*.sample.yaml` file with the defaults is written next to it.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            debug!(
                "Configuration file not found at {:?}, creating default",
                path
            );
            let default_config = Self::default();
            default_config.save_to_file(path)?;
            return Ok(default_config);
        }

        debug!("Loading configuration from {:?}", path);
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file at {:?}", path))?;

        // First step: convert YAML to a generic Value
        let yaml_value: serde_yml::Value = serde_yml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML configuration from {:?}", path))?;

        // Convert to JSON Value for validation
        let json_value = serde_json::to_value(&yaml_value).with_context(|| {
            format!("Failed to convert YAML to JSON for validation: {:?}", path)
        })?;

        let schema: serde_json::Value =
            serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

        let validator = jsonschema::draft202012::options()
            .should_validate_formats(true)
            .build(&schema)?;

        debug!("Validating {} configuration against schema", path.display());
        if let Err(error) = validator.validate(&json_value) {
            error!("Configuration validation error before deserialization");
            Self::create_sample_config(path)?;
            anyhow::bail!("Configuration validation failed: {}", error);
        }

        debug!("Schema validation passed, deserializing into Config structure");
        let config: Config = match serde_yml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                error!("Configuration deserialization error: {}", err);
                if let Err(e) = Self::create_sample_config(path) {
                    error!("Failed to create sample config: {}", e);
                }
                return Err(anyhow::anyhow!(
                    "Failed to deserialize configuration from {}: {}",
                    path.display(),
                    err
                ));
            }
        };

        if let Err(err) = utils::validate_specific_rules(&config) {
            error!("Configuration specific validation error: {}", err);
            Self::create_sample_config(path)?;
            return Err(err);
        }

        Ok(config)
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let yaml =
            serde_yml::to_string(self).context("Failed to serialize configuration to YAML")?;

        let mut file = File::create(path.as_ref())
            .with_context(|| format!("Failed to create config file at {:?}", path.as_ref()))?;

        file.write_all(yaml.as_bytes())
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Command line overrides of the `wellhead` section.
    ///
    /// The overridden configuration goes through the same rules as a loaded
    /// file; an error leaves the offending value in place.
    pub fn apply_wellhead_args(
        &mut self,
        address: Option<String>,
        port: Option<u16>,
        update_interval_ms: Option<u64>,
        seed: Option<u64>,
    ) -> Result<()> {
        if let Some(address) = address {
            debug!("Overriding wellhead address from command line: {}", address);
            self.wellhead.address = address;
        }
        if let Some(port) = port {
            debug!("Overriding wellhead port from command line: {}", port);
            self.wellhead.port = port;
        }
        if let Some(interval) = update_interval_ms {
            debug!("Overriding update interval from command line: {}", interval);
            self.wellhead.update_interval_ms = interval;
        }
        if let Some(seed) = seed {
            debug!("Overriding signal seed from command line: {}", seed);
            self.wellhead.signal.set_seed(seed);
        }
        utils::validate_specific_rules(self).context("Invalid command line override")
    }

    /// Command line overrides of the `relay` section.
    pub fn apply_relay_args(
        &mut self,
        wellhead_address: Option<String>,
        wellhead_port: Option<u16>,
        poll_interval_ms: Option<u64>,
        read_timeout_ms: Option<u64>,
        downlink_address: Option<String>,
        downlink_port: Option<u16>,
    ) -> Result<()> {
        if let Some(address) = wellhead_address {
            debug!("Overriding wellhead address from command line: {}", address);
            self.relay.wellhead_address = address;
        }
        if let Some(port) = wellhead_port {
            debug!("Overriding wellhead port from command line: {}", port);
            self.relay.wellhead_port = port;
        }
        if let Some(interval) = poll_interval_ms {
            debug!("Overriding poll interval from command line: {}", interval);
            self.relay.poll_interval_ms = interval;
        }
        if let Some(timeout) = read_timeout_ms {
            debug!("Overriding read timeout from command line: {}", timeout);
            self.relay.read_timeout_ms = timeout;
        }
        if let Some(address) = downlink_address {
            debug!("Overriding downlink address from command line: {}", address);
            self.relay.downlink_address = address;
        }
        if let Some(port) = downlink_port {
            debug!("Overriding downlink port from command line: {}", port);
            self.relay.downlink_port = port;
        }
        utils::validate_specific_rules(self).context("Invalid command line override")
    }

    /// Command line overrides of the `ground_station` section.
    #[allow(clippy::too_many_arguments)]
    pub fn apply_ground_station_args(
        &mut self,
        feed: Option<PositionFeed>,
        listen_address: Option<String>,
        listen_port: Option<u16>,
        log_directory: Option<PathBuf>,
        debug_log: bool,
        plot_path: Option<PathBuf>,
        window_s: Option<f64>,
    ) -> Result<()> {
        if let Some(feed) = feed {
            debug!("Overriding position feed from command line: {:?}", feed);
            self.ground_station.feed = feed;
        }
        if let Some(address) = listen_address {
            debug!("Overriding listen address from command line: {}", address);
            self.ground_station.listen_address = address;
        }
        if let Some(port) = listen_port {
            debug!("Overriding listen port from command line: {}", port);
            self.ground_station.listen_port = port;
        }
        if let Some(dir) = log_directory {
            debug!("Overriding log directory from command line: {:?}", dir);
            self.ground_station.log_directory = dir;
        }
        // The flag can only switch debug logging on
        if debug_log {
            self.ground_station.debug = true;
        }
        if let Some(path) = plot_path {
            debug!("Overriding plot path from command line: {:?}", path);
            self.ground_station.plot_path = path;
        }
        if let Some(window) = window_s {
            debug!("Overriding history window from command line: {}", window);
            self.ground_station.window_s = window;
        }
        utils::validate_specific_rules(self).context("Invalid command line override")
    }
}
