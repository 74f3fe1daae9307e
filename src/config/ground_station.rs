// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Ground station configuration

use std::path::PathBuf;
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::ground_station::StationSettings;
use crate::safety::ToleranceShape;
use crate::signal::SignalConfig;

/// Where the ground station takes its positions from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum PositionFeed {
    /// Frames forwarded by the relay on the downlink.
    #[default]
    Relay,
    /// A generator running inside the ground station.
    Local,
}

/// Settings of the ground station loop, its log and its plot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GroundStationConfig {
    pub feed: PositionFeed,

    /// Address the downlink listener binds to.
    pub listen_address: String,

    /// TCP port of the downlink listener.
    pub listen_port: u16,

    /// Generator used with the `local` feed.
    pub signal: SignalConfig,

    /// Loop cadence, in milliseconds.
    pub tick_interval_ms: u64,

    /// Sample when the elapsed whole second is a multiple of this.
    pub sample_every_s: u64,

    /// Visible history on the timelines, in seconds.
    pub window_s: f64,

    /// History kept beyond the visible window, in seconds.
    pub slack_s: f64,

    /// Outermost circle of the position panel, in degrees.
    pub max_angle: f64,

    /// Nominal region used by the safety classifier.
    pub tolerance: ToleranceShape,

    /// Directory receiving the session CSV logs.
    pub log_directory: PathBuf,

    /// Use the fixed `log_debug.csv` name instead of a time stamped one.
    pub debug: bool,

    /// SVG file rewritten after every sample.
    pub plot_path: PathBuf,

    pub plot_width: u32,

    pub plot_height: u32,
}

impl Default for GroundStationConfig {
    fn default() -> Self {
        Self {
            feed: PositionFeed::default(),
            listen_address: "127.0.0.1".to_string(),
            listen_port: 5021,
            signal: SignalConfig::Harmonic {
                terms: 2,
                seed: None,
            },
            tick_interval_ms: 100,
            sample_every_s: 5,
            window_s: 30.0,
            slack_s: 5.0,
            max_angle: 3.0,
            tolerance: ToleranceShape::default(),
            log_directory: PathBuf::from("."),
            debug: false,
            plot_path: PathBuf::from("wellhead_plot.svg"),
            plot_width: 1200,
            plot_height: 600,
        }
    }
}

impl GroundStationConfig {
    pub fn settings(&self) -> StationSettings {
        StationSettings {
            sample_every_s: self.sample_every_s,
            window_s: self.window_s,
            slack_s: self.slack_s,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
        }
    }
}
