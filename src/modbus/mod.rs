// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus communication module
//!
//! Both ends of the wellhead link live here:
//!
//! - `WellheadModbusServer`: the simulated device. It keeps the latest position
//!   block in input registers for a client to read.
//! - `ModbusRegisterClient`: the relay side. It reads the block with a bounded
//!   timeout and implements [`crate::relay::RegisterReader`].
//!
//! The register layout and float encoding are described in [`register_map`].

pub mod modbus_client;
pub mod modbus_server;
pub mod register_map;

pub use modbus_client::ModbusRegisterClient;
pub use modbus_server::WellheadModbusServer;
