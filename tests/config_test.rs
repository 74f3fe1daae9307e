// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

use anyhow::Result;
use tempfile::tempdir;

use wellhead_telemetry::config::{Config, PositionFeed, RelayConfig};
use wellhead_telemetry::safety::ToleranceShape;
use wellhead_telemetry::signal::{Position, SignalConfig};

#[test]
fn test_config_load_and_save() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");

    // Create a custom config
    let mut config = Config::default();
    config.relay = RelayConfig {
        wellhead_address: "192.168.1.20".to_string(),
        poll_interval_ms: 500,
        read_timeout_ms: 250,
        ..Default::default()
    };
    config.wellhead.signal = SignalConfig::Harmonic {
        terms: 3,
        seed: Some(11),
    };
    config.ground_station.tolerance = ToleranceShape::Circle;

    config.save_to_file(&config_path)?;
    let loaded_config = Config::from_file(&config_path)?;
    assert_eq!(loaded_config, config);

    // Loading a missing file writes the defaults
    let non_existent_path = temp_dir.path().join("non_existent.yaml");
    let default_config = Config::from_file(&non_existent_path)?;
    assert!(non_existent_path.exists());
    assert_eq!(default_config, Config::default());
    assert_eq!(Config::from_file(&non_existent_path)?, Config::default());

    Ok(())
}

#[test]
fn test_partial_file_keeps_defaults() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        r#"
ground_station:
  feed: local
  debug: true
  tolerance:
    shape: polygon
    vertices:
      - { x: -1.0, y: -1.0 }
      - { x: 1.0, y: -1.0 }
      - { x: 0.0, y: 1.5 }
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    assert_eq!(config.ground_station.feed, PositionFeed::Local);
    assert!(config.ground_station.debug);
    assert_eq!(config.ground_station.window_s, 30.0);
    assert_eq!(config.relay, RelayConfig::default());

    let polygon = config.ground_station.tolerance.build()?.unwrap();
    assert_eq!(polygon.ring().len(), 4);
    assert!(polygon.contains(Position::ORIGIN));

    Ok(())
}

#[test]
fn test_random_tolerance_is_reproducible() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    std::fs::write(
        &config_path,
        r#"
ground_station:
  tolerance:
    shape: random
    center: { x: 0.0, y: 0.0 }
    average_radius: 5.0
    irregularity: 0.3
    spikeyness: 0.2
    vertex_count: 8
    seed: 5
"#,
    )?;

    let config = Config::from_file(&config_path)?;
    let first = config.ground_station.tolerance.build()?.unwrap();
    let second = config.ground_station.tolerance.build()?.unwrap();
    assert_eq!(first.ring(), second.ring());

    Ok(())
}

#[test]
fn test_apply_args() -> Result<()> {
    let mut config = Config::default();

    config.apply_wellhead_args(Some("0.0.0.0".to_string()), Some(1502), None, Some(4))?;
    assert_eq!(config.wellhead.address, "0.0.0.0");
    assert_eq!(config.wellhead.port, 1502);
    assert_eq!(config.wellhead.update_interval_ms, 100);
    assert_eq!(
        config.wellhead.signal,
        SignalConfig::SingleTone {
            amplitude: 2.0,
            frequency: 1.0,
            seed: Some(4),
        }
    );

    config.apply_relay_args(None, None, None, Some(300), Some("10.0.0.2".to_string()), None)?;
    assert_eq!(config.relay.read_timeout_ms, 300);
    assert_eq!(config.relay.downlink_address, "10.0.0.2");
    assert_eq!(config.relay.downlink_port, 5021);
    Ok(())
}

#[test]
fn test_invalid_override_is_rejected() -> Result<()> {
    let temp_dir = tempdir()?;
    let config_path = temp_dir.path().join("config.yaml");
    let mut config = Config::from_file(&config_path)?;

    let err = config
        .apply_relay_args(None, None, Some(0), None, None, None)
        .unwrap_err();
    assert!(
        format!("{:#}", err).contains("poll_interval_ms must be greater than 0"),
        "unexpected error: {err:#}"
    );

    let mut config = Config::from_file(&config_path)?;
    assert!(config
        .apply_ground_station_args(None, None, None, None, false, None, Some(-10.0))
        .is_err());
    Ok(())
}
