// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Wellhead telemetry library
//!
//! Three cooperating processes watch the angular position of a wellhead:
//!
//! - the **wellhead** device simulates the sensor and serves its position in
//!   Modbus input registers ([`daemon`], [`modbus`], [`signal`]),
//! - the **relay** polls those registers at a fixed cadence and forwards each
//!   position as a fixed-width text frame ([`relay`]),
//! - the **ground station** calibrates, classifies, logs and plots the
//!   positions it receives ([`ground_station`], [`safety`], [`history`],
//!   [`visualization`]).
//!
//! All three read their settings from the same YAML file ([`config`]).

pub mod config;
pub mod daemon;
pub mod error;
pub mod ground_station;
pub mod history;
pub mod modbus;
pub mod relay;
pub mod safety;
pub mod signal;
pub mod visualization;

pub use error::TelemetryError;
