// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Simulated wellhead device configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::signal::SignalConfig;

/// Settings of the simulated wellhead and its Modbus TCP server.
///
/// # Example
///
/// ```
/// use wellhead_telemetry::config::WellheadConfig;
///
/// let wellhead = WellheadConfig {
///     port: 1502,
///     ..Default::default()
/// };
/// assert_eq!(wellhead.unit_id, 1);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WellheadConfig {
    /// Address the Modbus server binds to.
    pub address: String,

    /// TCP port of the Modbus server.
    pub port: u16,

    /// Modbus unit identifier answered by the device.
    pub unit_id: u8,

    /// Period of the register block refresh, in milliseconds.
    pub update_interval_ms: u64,

    /// Wave model driving the simulated position.
    pub signal: SignalConfig,
}

impl Default for WellheadConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1".to_string(),
            port: 5020,
            unit_id: 1,
            update_interval_ms: 100,
            signal: SignalConfig::default(),
        }
    }
}

impl WellheadConfig {
    pub fn update_interval(&self) -> Duration {
        Duration::from_millis(self.update_interval_ms)
    }
}
