// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Modbus TCP client side of the wellhead link

use std::{net::SocketAddr, time::Duration};

use async_trait::async_trait;
use log::{debug, info, warn};
use tokio::time::timeout;
use tokio_modbus::{client::Context, prelude::*};

use super::register_map::{decode_floats, WORDS_PER_VALUE};
use crate::error::TelemetryError;
use crate::relay::RegisterReader;

/// Reads the wellhead position block over Modbus TCP.
///
/// Every request is bounded by `read_timeout`. After a timeout or a transport
/// failure the connection is flagged stale: a late response could otherwise
/// be taken as the answer to the next request. The next call to
/// [`discard_stale`](RegisterReader::discard_stale) drops the connection and
/// opens a fresh one.
pub struct ModbusRegisterClient {
    ctx: Context,
    socket_addr: SocketAddr,
    slave: Slave,
    read_timeout: Duration,
    stale: bool,
}

impl ModbusRegisterClient {
    /// Connect to the wellhead at `socket_addr`.
    pub async fn connect(
        socket_addr: SocketAddr,
        unit_id: u8,
        read_timeout: Duration,
    ) -> Result<Self, TelemetryError> {
        let slave = Slave(unit_id);
        let ctx = open(socket_addr, slave, read_timeout).await?;
        info!("Connected to wellhead Modbus server at {}", socket_addr);

        Ok(Self {
            ctx,
            socket_addr,
            slave,
            read_timeout,
            stale: false,
        })
    }

    pub fn socket_addr(&self) -> SocketAddr {
        self.socket_addr
    }

    async fn read_words(&mut self, base: u16, quantity: u16) -> Result<Vec<u16>, TelemetryError> {
        let response = timeout(
            self.read_timeout,
            self.ctx.read_input_registers(base, quantity),
        )
        .await
        .map_err(|_| TelemetryError::Timeout(self.read_timeout))??;

        response.map_err(TelemetryError::Exception)
    }
}

async fn open(
    socket_addr: SocketAddr,
    slave: Slave,
    connect_timeout: Duration,
) -> Result<Context, TelemetryError> {
    timeout(connect_timeout, tcp::connect_slave(socket_addr, slave))
        .await
        .map_err(|_| TelemetryError::Timeout(connect_timeout))?
        .map_err(TelemetryError::Io)
}

#[async_trait]
impl RegisterReader for ModbusRegisterClient {
    async fn discard_stale(&mut self) -> Result<(), TelemetryError> {
        if !self.stale {
            return Ok(());
        }

        debug!("Reopening Modbus connection to drop late responses");
        self.ctx = open(self.socket_addr, self.slave, self.read_timeout).await?;
        self.stale = false;
        Ok(())
    }

    async fn read_block(&mut self, base: u16, count: usize) -> Result<Vec<f32>, TelemetryError> {
        let quantity = u16::try_from(count * WORDS_PER_VALUE).map_err(|_| {
            TelemetryError::Malformed(format!("{} values exceed a Modbus request", count))
        })?;

        let words = match self.read_words(base, quantity).await {
            Ok(words) => words,
            Err(e) => {
                if matches!(e, TelemetryError::Timeout(_) | TelemetryError::Transport(_)) {
                    warn!("Marking Modbus connection stale after: {}", e);
                    self.stale = true;
                }
                return Err(e);
            }
        };

        if words.len() != quantity as usize {
            return Err(TelemetryError::Malformed(format!(
                "asked for {} registers, got {}",
                quantity,
                words.len()
            )));
        }

        decode_floats(&words)
    }
}
