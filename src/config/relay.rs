// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Poll-relay configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::modbus::register_map::BLOCK_BASE_ADDRESS;
use crate::relay::RelaySettings;

/// Settings of the relay: where to poll, how often, and where to forward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Address of the wellhead Modbus server.
    pub wellhead_address: String,

    /// TCP port of the wellhead Modbus server.
    pub wellhead_port: u16,

    /// Modbus unit identifier of the wellhead.
    pub unit_id: u8,

    /// First input register of the position block.
    pub base_register: u16,

    /// Time between two poll cycle starts, in milliseconds.
    pub poll_interval_ms: u64,

    /// Bound on one register read, in milliseconds.
    ///
    /// Must stay below `poll_interval_ms`.
    pub read_timeout_ms: u64,

    /// Address of the ground station downlink.
    pub downlink_address: String,

    /// TCP port of the ground station downlink.
    pub downlink_port: u16,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            wellhead_address: "127.0.0.1".to_string(),
            wellhead_port: 5020,
            unit_id: 1,
            base_register: BLOCK_BASE_ADDRESS,
            poll_interval_ms: 1000,
            read_timeout_ms: 520,
            downlink_address: "127.0.0.1".to_string(),
            downlink_port: 5021,
        }
    }
}

impl RelayConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub fn settings(&self) -> RelaySettings {
        RelaySettings {
            base_register: self.base_register,
            period: Duration::from_millis(self.poll_interval_ms),
        }
    }
}
