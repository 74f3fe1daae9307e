// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus server implementation for the simulated wellhead
//!
//! For avoiding confusion with the Modbus master/slave terminology, this module uses
//! the terms "server" and "client" instead. The server is the device that provides data,
//! while the client is the device that requests data.
//!
//! The Modbus master is the device that requests data, while the Modbus slave is the device
//! that provides data. In other words, the relay is the client and the simulated wellhead
//! is the server.
//!
//! ## Register Map
//!
//! ### Input Registers (Read Only)
//!
//! | Register Address | Description | Encoding |
//! |-----------------|-------------|----------|
//! | 1006-1007 | Update counter | f32, high word first |
//! | 1008-1009 | Device elapsed time (s) | f32, high word first |
//! | 1010-1011 | Status code (0 = nominal) | f32, high word first |
//! | 1012-1013 | X angle (degrees) | f32, high word first |
//! | 1014-1015 | Y angle (degrees) | f32, high word first |
//!
//! ### Holding Registers
//!
//! | Register Address | Description | Encoding |
//! |-----------------|-------------|----------|
//! | 0 | X angle | thousandths of a degree + peak amplitude × 1000 |
//! | 1 | Y angle | thousandths of a degree + peak amplitude × 1000 |

use std::{
    collections::HashMap,
    future,
    sync::{Arc, Mutex, MutexGuard},
};

use log::{debug, error};

use tokio_modbus::prelude::*;

use super::register_map::{
    decode_floats, encode_floats, BLOCK_BASE_ADDRESS, BLOCK_LEN, BLOCK_REGISTER_COUNT,
    SCALED_X_REGISTER, SCALED_Y_REGISTER, WORDS_PER_VALUE,
};

/// A Modbus TCP server exposing the latest wellhead position.
///
/// Cloning the server is cheap and every clone shares the same register
/// storage, so the update loop and each client connection can hold their own
/// handle.
///
/// ### Read consistency
///
/// [`write_block`](Self::write_block) replaces the whole position block while
/// holding the input register lock, and requests are served under the same
/// lock. A client therefore never observes a block mixing two updates.
#[derive(Clone)]
pub struct WellheadModbusServer {
    /// Input registers (position block)
    pub input_registers: Arc<Mutex<HashMap<u16, u16>>>,

    /// Holding registers (legacy scaled-integer position)
    pub holding_registers: Arc<Mutex<HashMap<u16, u16>>>,
}

impl tokio_modbus::server::Service for WellheadModbusServer {
    type Request = Request<'static>;
    type Response = Response;
    type Exception = ExceptionCode;
    type Future = future::Ready<Result<Self::Response, Self::Exception>>;

    /// Process a Modbus request and provide a response
    ///
    /// Only the read functions are served:
    /// - 0x04: Read Input Registers
    /// - 0x03: Read Holding Registers
    ///
    /// Any other function code returns an IllegalFunction exception; the
    /// wellhead has no control path.
    fn call(&self, req: Self::Request) -> Self::Future {
        debug!("Received Modbus request: {:?}", req);

        let res = match req {
            Request::ReadInputRegisters(addr, cnt) => {
                debug!(
                    "Reading {} input registers starting from address {}",
                    cnt, addr
                );
                lock(&self.input_registers)
                    .and_then(|registers| register_read(&registers, addr, cnt))
                    .map(Response::ReadInputRegisters)
            }
            Request::ReadHoldingRegisters(addr, cnt) => {
                debug!(
                    "Reading {} holding registers starting from address {}",
                    cnt, addr
                );
                lock(&self.holding_registers)
                    .and_then(|registers| register_read(&registers, addr, cnt))
                    .map(Response::ReadHoldingRegisters)
            }
            _ => {
                error!(
                    "Exception::IllegalFunction - Unimplemented function code in request: {req:?}"
                );
                Err(ExceptionCode::IllegalFunction)
            }
        };

        if let Err(e) = &res {
            error!("Modbus request error: {:?}", e);
        }

        future::ready(res)
    }
}

impl Default for WellheadModbusServer {
    fn default() -> Self {
        Self::new()
    }
}

impl WellheadModbusServer {
    /// Create a server with a zeroed position block and centred legacy registers.
    pub fn new() -> Self {
        let input_registers = (0..BLOCK_REGISTER_COUNT)
            .map(|offset| (BLOCK_BASE_ADDRESS + offset, 0))
            .collect();

        let mut holding_registers = HashMap::new();
        holding_registers.insert(SCALED_X_REGISTER, 0);
        holding_registers.insert(SCALED_Y_REGISTER, 0);

        Self {
            input_registers: Arc::new(Mutex::new(input_registers)),
            holding_registers: Arc::new(Mutex::new(holding_registers)),
        }
    }

    /// Replace the position block with `values`, starting at slot 0.
    ///
    /// All words are written under one lock acquisition.
    ///
    /// ### Errors
    ///
    /// `IllegalDataAddress` if more than [`BLOCK_LEN`] values are given,
    /// `ServerDeviceFailure` if the register lock is poisoned.
    pub fn write_block(&self, values: &[f32]) -> Result<(), ExceptionCode> {
        let words = encode_floats(values);
        let mut registers = lock(&self.input_registers)?;
        register_write(&mut registers, BLOCK_BASE_ADDRESS, &words)
    }

    /// Read the first `count` values of the position block.
    pub fn read_block(&self, count: usize) -> Result<Vec<f32>, ExceptionCode> {
        if count > BLOCK_LEN {
            return Err(ExceptionCode::IllegalDataAddress);
        }
        let registers = lock(&self.input_registers)?;
        let words = register_read(
            &registers,
            BLOCK_BASE_ADDRESS,
            (count * WORDS_PER_VALUE) as u16,
        )?;
        decode_floats(&words).map_err(|_| ExceptionCode::ServerDeviceFailure)
    }

    /// Update the legacy scaled-integer x/y holding registers.
    pub fn write_scaled(&self, x: u16, y: u16) -> Result<(), ExceptionCode> {
        let mut registers = lock(&self.holding_registers)?;
        register_write(&mut registers, SCALED_X_REGISTER, &[x, y])
    }
}

fn lock(
    registers: &Mutex<HashMap<u16, u16>>,
) -> Result<MutexGuard<'_, HashMap<u16, u16>>, ExceptionCode> {
    registers.lock().map_err(|_| {
        error!("Register storage lock poisoned");
        ExceptionCode::ServerDeviceFailure
    })
}

/// Helper function for reading Modbus registers from a HashMap
///
/// ### Errors
///
/// Returns `ExceptionCode::IllegalDataAddress` if any requested register
/// address does not exist in the HashMap.
fn register_read(
    registers: &HashMap<u16, u16>,
    addr: u16,
    cnt: u16,
) -> Result<Vec<u16>, ExceptionCode> {
    let mut response_values = vec![0; cnt.into()];

    for i in 0..cnt {
        let reg_addr = addr.checked_add(i).ok_or(ExceptionCode::IllegalDataAddress)?;
        if let Some(r) = registers.get(&reg_addr) {
            response_values[i as usize] = *r;
        } else {
            error!(
                "Exception::IllegalDataAddress - Register {} not found",
                reg_addr
            );
            return Err(ExceptionCode::IllegalDataAddress);
        }
    }

    debug!("Successfully read {} registers from address {}", cnt, addr);
    Ok(response_values)
}

/// Helper function for writing values to existing registers
///
/// Nothing is written unless every target address exists.
fn register_write(
    registers: &mut HashMap<u16, u16>,
    addr: u16,
    values: &[u16],
) -> Result<(), ExceptionCode> {
    let all_present = (0..values.len()).all(|i| {
        u16::try_from(i)
            .ok()
            .and_then(|i| addr.checked_add(i))
            .is_some_and(|reg_addr| registers.contains_key(&reg_addr))
    });
    if !all_present {
        error!(
            "Exception::IllegalDataAddress - {} values do not fit from register {}",
            values.len(),
            addr
        );
        return Err(ExceptionCode::IllegalDataAddress);
    }

    for (i, value) in values.iter().enumerate() {
        registers.insert(addr + i as u16, *value);
    }

    debug!(
        "Successfully wrote {} values starting at register {}",
        values.len(),
        addr
    );
    Ok(())
}
