// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Fixed-cadence poll, format and forward loop

use std::time::Duration;

use log::{debug, error, info, warn};
use tokio::time::{self, Instant, MissedTickBehavior};

use super::{RegisterReader, RelayLink, RelayMessage};
use crate::error::TelemetryError;
use crate::modbus::register_map::{position_from_block, BLOCK_BASE_ADDRESS, BLOCK_LEN};
use crate::signal::Position;

/// Timing and addressing of the relay loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelaySettings {
    /// First register of the position block.
    pub base_register: u16,
    /// Target time between two cycle starts.
    pub period: Duration,
}

impl Default for RelaySettings {
    fn default() -> Self {
        Self {
            base_register: BLOCK_BASE_ADDRESS,
            period: Duration::from_millis(1000),
        }
    }
}

/// Polls the wellhead and forwards each position to the ground station.
///
/// Read failures never stop the loop: the last known position (the origin
/// until a first read succeeds) is forwarded instead. A failure to transmit
/// ends [`run`](Self::run).
pub struct PollRelay<R, L> {
    reader: R,
    link: L,
    settings: RelaySettings,
    position: Position,
    cycles: u64,
    read_failures: u64,
    last_cycle_start: Option<Instant>,
}

impl<R, L> PollRelay<R, L>
where
    R: RegisterReader,
    L: RelayLink,
{
    pub fn new(reader: R, link: L, settings: RelaySettings) -> Self {
        Self {
            reader,
            link,
            settings,
            position: Position::ORIGIN,
            cycles: 0,
            read_failures: 0,
            last_cycle_start: None,
        }
    }

    /// Position forwarded by the latest cycle.
    pub fn position(&self) -> Position {
        self.position
    }

    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Number of cycles that fell back to the previous position.
    pub fn read_failures(&self) -> u64 {
        self.read_failures
    }

    /// Run one poll cycle and return the frame that was sent.
    ///
    /// ### Errors
    ///
    /// Only downlink failures are returned; everything that goes wrong on the
    /// read path is logged and absorbed.
    pub async fn cycle(&mut self) -> Result<RelayMessage, TelemetryError> {
        let started = Instant::now();

        self.link.discard_pending().await?;

        match self.read_position().await {
            Ok(position) => {
                self.position = position;
                info!("Read Message:\t {}", RelayMessage::new(position).body());
            }
            Err(e) => {
                self.read_failures += 1;
                warn!(
                    "Read failed, relaying last known position ({}, {}): {}",
                    self.position.x, self.position.y, e
                );
            }
        }

        let message = RelayMessage::new(self.position);
        let wire = message.to_wire();
        self.link.transmit(wire.as_bytes()).await?;

        let rate = self
            .last_cycle_start
            .map(|previous| started.duration_since(previous).as_secs_f64())
            .filter(|elapsed| *elapsed > 0.0)
            .map(|elapsed| 1.0 / elapsed);
        match rate {
            Some(rate) => info!("New Message:\t{}\t\trate:{:2.1} Hz", wire, rate),
            None => info!("New Message:\t{}", wire),
        }

        self.last_cycle_start = Some(started);
        self.cycles += 1;
        Ok(message)
    }

    /// Drive cycles forever at the configured period.
    ///
    /// Each cycle starts one period after the previous cycle started. A cycle
    /// that overruns delays the next one instead of triggering a burst of
    /// catch-up cycles.
    pub async fn run(&mut self) -> Result<(), TelemetryError> {
        info!(
            "Relaying registers {}..{} every {:?}",
            self.settings.base_register,
            self.settings.base_register as usize + BLOCK_LEN * 2,
            self.settings.period
        );

        let mut interval = time::interval(self.settings.period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;
            if let Err(e) = self.cycle().await {
                error!("Downlink failure after {} cycles: {}", self.cycles, e);
                return Err(e);
            }
        }
    }

    async fn read_position(&mut self) -> Result<Position, TelemetryError> {
        self.reader.discard_stale().await?;
        let block = self
            .reader
            .read_block(self.settings.base_register, BLOCK_LEN)
            .await?;
        debug!("Register block: {:?}", block);
        position_from_block(&block)
    }
}
