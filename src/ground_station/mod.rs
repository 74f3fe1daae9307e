// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Ground station
//!
//! The ground station turns raw positions into a classified, logged and
//! plotted history.
//!
//! ## Session lifecycle
//!
//! 1. [`GroundStation::start`] waits for the first fix and keeps it as the
//!    calibration offset. The raw fix is logged with `t = -1`.
//! 2. [`GroundStation::run`] ticks at a fixed interval. A tick samples only
//!    when the elapsed whole second is a multiple of `sample_every_s` and that
//!    second has not been sampled yet; every other tick is idle.
//! 3. A sample is offset by the calibration, classified, appended to the
//!    history, logged, and pushed to the render sink.
//! 4. The loop ends when the render sink reports it was closed.
//!
//! Between ticks the loop keeps draining the position source so the latest
//! relayed frame is always at hand.

pub mod session_log;
pub mod source;

pub use session_log::SessionLog;
pub use source::{LocalSimulation, PositionSource, RelayFeed};

use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::history::{HistoryBuffer, HistorySample};
use crate::safety::{classify, ReferencePolygon};
use crate::signal::Position;
use crate::visualization::{Frame, RenderSink};

/// Exit status used when the operator closes the plot.
pub const SURFACE_CLOSED_EXIT_CODE: i32 = 9;

/// Timing of the ground-station loop.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StationSettings {
    /// Sample on every whole second that is a multiple of this.
    pub sample_every_s: u64,
    /// Visible history, in seconds.
    pub window_s: f64,
    /// Extra history kept behind the visible window, in seconds.
    pub slack_s: f64,
    pub tick_interval: Duration,
}

impl Default for StationSettings {
    fn default() -> Self {
        Self {
            sample_every_s: 5,
            window_s: 30.0,
            slack_s: 5.0,
            tick_interval: Duration::from_millis(100),
        }
    }
}

/// Why [`GroundStation::run`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    SurfaceClosed,
}

impl ShutdownReason {
    pub fn exit_code(&self) -> i32 {
        match self {
            ShutdownReason::SurfaceClosed => SURFACE_CLOSED_EXIT_CODE,
        }
    }
}

pub struct GroundStation<S, K> {
    source: S,
    sink: K,
    polygon: Option<ReferencePolygon>,
    history: HistoryBuffer,
    log: SessionLog,
    settings: StationSettings,
    calibration: Position,
    last_sampled_second: Option<u64>,
}

impl<S, K> GroundStation<S, K>
where
    S: PositionSource,
    K: RenderSink,
{
    /// Wait for the first fix, record it as calibration and open the session.
    pub async fn start(
        mut source: S,
        sink: K,
        polygon: Option<ReferencePolygon>,
        log: SessionLog,
        settings: StationSettings,
    ) -> Result<Self> {
        info!("Waiting for the first position fix");
        let calibration = loop {
            if let Some(position) = source.sample(0.0) {
                break position;
            }
            source
                .pump()
                .await
                .context("Position source failed before the first fix")?;
        };

        let status = classify(calibration, polygon.as_ref());
        log.append(session_log::CALIBRATION_T, calibration, status)?;
        info!(
            "Calibration fix ({:.3}, {:.3}), status {}",
            calibration.x,
            calibration.y,
            status.code()
        );

        Ok(Self {
            source,
            sink,
            polygon,
            history: HistoryBuffer::new(),
            log,
            settings,
            calibration,
            last_sampled_second: None,
        })
    }

    pub fn calibration(&self) -> Position {
        self.calibration
    }

    pub fn history(&self) -> &HistoryBuffer {
        &self.history
    }

    pub fn sink(&self) -> &K {
        &self.sink
    }

    /// Handle one tick at `elapsed` seconds; returns the new sample, if any.
    pub fn tick(&mut self, elapsed: f64) -> Result<Option<HistorySample>> {
        let second = elapsed.max(0.0).floor() as u64;
        if second % self.settings.sample_every_s.max(1) != 0
            || self.last_sampled_second == Some(second)
        {
            return Ok(None);
        }

        let Some(raw) = self.source.sample(elapsed) else {
            debug!("No fix available at t={:.2}", elapsed);
            return Ok(None);
        };
        self.last_sampled_second = Some(second);

        let position = raw - self.calibration;
        let status = classify(position, self.polygon.as_ref());
        let sample = HistorySample::new(elapsed, position, status);

        self.history.append(sample);
        self.history
            .evict_expired(self.settings.window_s, self.settings.slack_s);
        self.log.append(elapsed, position, status)?;

        let frame = Frame::new(&self.history, self.polygon.as_ref(), self.settings.window_s);
        self.sink.update(&frame)?;

        info!(
            "t={:.2} X={:.3} Y={:.3} status={}",
            elapsed,
            position.x,
            position.y,
            status.code()
        );
        Ok(Some(sample))
    }

    /// Tick until the render sink is closed.
    pub async fn run(&mut self) -> Result<ShutdownReason> {
        let started = Instant::now();
        let mut ticker = time::interval(self.settings.tick_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if self.sink.is_closed() {
                info!("Render surface closed, ending session");
                return Ok(ShutdownReason::SurfaceClosed);
            }

            tokio::select! {
                _ = ticker.tick() => {
                    self.tick(started.elapsed().as_secs_f64())?;
                }
                pumped = self.source.pump() => {
                    pumped.context("Position source failed")?;
                }
            }
        }
    }
}
