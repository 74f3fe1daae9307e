// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Where the ground station gets its positions from

use async_trait::async_trait;
use log::debug;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::TelemetryError;
use crate::relay::RelayDecoder;
use crate::signal::{Position, SignalGenerator};

/// Supplies raw (uncalibrated) positions.
#[async_trait]
pub trait PositionSource: Send {
    /// Current fix at `elapsed` seconds into the session, if one is known.
    fn sample(&mut self, elapsed: f64) -> Option<Position>;

    /// Consume pending input.
    ///
    /// Completes each time new input has been processed. Sources without
    /// input never complete. An error means the source is gone for good.
    async fn pump(&mut self) -> Result<(), TelemetryError>;
}

/// Local deployment: positions come straight from a generator.
pub struct LocalSimulation {
    generator: SignalGenerator,
}

impl LocalSimulation {
    pub fn new(generator: SignalGenerator) -> Self {
        Self { generator }
    }
}

#[async_trait]
impl PositionSource for LocalSimulation {
    fn sample(&mut self, elapsed: f64) -> Option<Position> {
        Some(self.generator.get_position(elapsed))
    }

    async fn pump(&mut self) -> Result<(), TelemetryError> {
        std::future::pending().await
    }
}

/// Networked deployment: positions decoded from the relay downlink.
///
/// Only the most recent frame matters; older frames still in the stream are
/// skipped.
pub struct RelayFeed<R> {
    reader: R,
    decoder: RelayDecoder,
    latest: Option<Position>,
    frames: u64,
}

impl<R> RelayFeed<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            decoder: RelayDecoder::new(),
            latest: None,
            frames: 0,
        }
    }

    /// Number of complete frames received so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }
}

#[async_trait]
impl<R> PositionSource for RelayFeed<R>
where
    R: AsyncRead + Unpin + Send,
{
    fn sample(&mut self, _elapsed: f64) -> Option<Position> {
        self.latest
    }

    async fn pump(&mut self) -> Result<(), TelemetryError> {
        let mut buf = [0u8; 256];
        let read = self.reader.read(&mut buf).await?;
        if read == 0 {
            return Err(TelemetryError::LinkClosed);
        }

        self.decoder.push(&buf[..read]);
        while let Some(message) = self.decoder.next_message() {
            debug!("Received {}", message.to_wire());
            self.latest = Some(message.position());
            self.frames += 1;
        }
        Ok(())
    }
}
