// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Configuration utilities
//!
//! This module provides utility functions for working with configuration
//! settings, including validation and schema management.

use anyhow::{Context, Result};
use log::{debug, warn};

use super::{Config, CONFIG_SCHEMA};
use crate::modbus::register_map::{BLOCK_REGISTER_COUNT, SCALED_Y_REGISTER};
use crate::safety::ToleranceShape;

/// Output the embedded JSON schema to the console.
///
/// This function is called when the `--show-config-schema` flag is provided
/// on the command line. It outputs the full JSON schema for the configuration
/// to stdout, formatted for readability.
///
/// # Example
///
/// ```bash
/// ./ground_station --show-config-schema > config_schema.json
/// ```
pub fn output_config_schema() -> Result<()> {
    let schema: serde_json::Value =
        serde_json::from_str(CONFIG_SCHEMA).context("Failed to parse JSON schema")?;

    let formatted_schema =
        serde_json::to_string_pretty(&schema).context("Failed to format JSON schema")?;

    println!("{}", formatted_schema);

    Ok(())
}

/// Check if a string is a valid IP address
///
/// Validates that a string represents a valid IPv4 or IPv6 address,
/// or is one of the special values like "localhost" or "0.0.0.0".
pub fn is_valid_ip_address(addr: &str) -> bool {
    if addr.parse::<std::net::IpAddr>().is_ok() {
        return true;
    }

    // Special cases
    matches!(addr, "localhost" | "::" | "::0" | "0.0.0.0")
}

/// Validates the configuration against additional rules that aren't covered by the JSON schema.
///
/// # Validation Rules
///
/// - **Periods**: every interval must be strictly positive
/// - **Read timeout**: must end before the next poll cycle starts
/// - **Register block**: the position block must fit the 16-bit address space
///   and stay clear of the legacy holding registers
/// - **History**: the window must be positive and the slack non-negative
/// - **Tolerance**: an explicit polygon needs at least 3 vertices, a random
///   one a positive radius
/// - **Addresses**: non-IP addresses only produce a warning; they may be host
///   names resolved at connection time
pub fn validate_specific_rules(config: &Config) -> Result<()> {
    debug!("Performing additional validation checks");

    let wellhead = &config.wellhead;
    if wellhead.update_interval_ms == 0 {
        anyhow::bail!("wellhead.update_interval_ms must be greater than 0");
    }

    let relay = &config.relay;
    if relay.poll_interval_ms == 0 {
        anyhow::bail!("relay.poll_interval_ms must be greater than 0");
    }
    if relay.read_timeout_ms == 0 || relay.read_timeout_ms >= relay.poll_interval_ms {
        anyhow::bail!(
            "relay.read_timeout_ms ({}) must be positive and shorter than relay.poll_interval_ms ({})",
            relay.read_timeout_ms,
            relay.poll_interval_ms
        );
    }
    if relay.base_register.checked_add(BLOCK_REGISTER_COUNT).is_none() {
        anyhow::bail!(
            "relay.base_register {} leaves no room for a {}-register block",
            relay.base_register,
            BLOCK_REGISTER_COUNT
        );
    }
    if relay.base_register <= SCALED_Y_REGISTER {
        anyhow::bail!(
            "relay.base_register {} overlaps the legacy holding registers",
            relay.base_register
        );
    }

    let station = &config.ground_station;
    if station.tick_interval_ms == 0 {
        anyhow::bail!("ground_station.tick_interval_ms must be greater than 0");
    }
    if station.sample_every_s == 0 {
        anyhow::bail!("ground_station.sample_every_s must be greater than 0");
    }
    if !(station.window_s > 0.0) {
        anyhow::bail!("ground_station.window_s must be greater than 0");
    }
    if !(station.slack_s >= 0.0) {
        anyhow::bail!("ground_station.slack_s must not be negative");
    }
    if !(station.max_angle > 0.0) {
        anyhow::bail!("ground_station.max_angle must be greater than 0");
    }

    match &station.tolerance {
        ToleranceShape::Polygon { vertices } if vertices.len() < 3 => {
            anyhow::bail!(
                "ground_station.tolerance polygon needs at least 3 vertices, got {}",
                vertices.len()
            );
        }
        ToleranceShape::Random {
            average_radius,
            vertex_count,
            ..
        } if !(*average_radius > 0.0) || *vertex_count < 3 => {
            anyhow::bail!(
                "ground_station.tolerance random polygon needs a positive radius and at least 3 vertices"
            );
        }
        _ => {}
    }

    for (name, address) in [
        ("wellhead.address", &wellhead.address),
        ("relay.wellhead_address", &relay.wellhead_address),
        ("relay.downlink_address", &relay.downlink_address),
        ("ground_station.listen_address", &station.listen_address),
    ] {
        if !is_valid_ip_address(address) {
            warn!("Potentially invalid address format for {}: {}", name, address);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::Position;

    #[test]
    fn ip_addresses() {
        assert!(is_valid_ip_address("127.0.0.1"));
        assert!(is_valid_ip_address("::1"));
        assert!(is_valid_ip_address("localhost"));
        assert!(!is_valid_ip_address("wellhead.local"));
    }

    #[test]
    fn timeout_must_fit_in_the_poll_period() {
        let mut config = Config::default();
        config.relay.read_timeout_ms = 1000;
        let err = validate_specific_rules(&config).unwrap_err();
        assert!(err.to_string().contains("read_timeout_ms"));
    }

    #[test]
    fn zero_periods_are_rejected() {
        let mut config = Config::default();
        config.ground_station.sample_every_s = 0;
        assert!(validate_specific_rules(&config).is_err());

        let mut config = Config::default();
        config.wellhead.update_interval_ms = 0;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn register_block_must_fit() {
        let mut config = Config::default();
        config.relay.base_register = u16::MAX - 4;
        assert!(validate_specific_rules(&config).is_err());

        config.relay.base_register = 1;
        assert!(validate_specific_rules(&config).is_err());
    }

    #[test]
    fn tolerance_shapes_are_checked() {
        let mut config = Config::default();
        config.ground_station.tolerance = ToleranceShape::Polygon {
            vertices: vec![Position::ORIGIN, Position::new(1.0, 0.0)],
        };
        assert!(validate_specific_rules(&config).is_err());

        config.ground_station.tolerance = ToleranceShape::Circle;
        assert!(validate_specific_rules(&config).is_ok());
    }
}
