// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Visualization
//!
//! The ground station pushes a [`Frame`] to a [`RenderSink`] after every
//! sample. The sink decides how to show it; [`PlotSink`] renders an SVG
//! dashboard with `plotters`.
//!
//! A sink can be closed from outside through its [`CloseHandle`], which is how
//! the operator ends a session.

pub mod plot;

pub use plot::PlotSink;

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use crate::history::HistoryBuffer;
use crate::safety::{ReferencePolygon, SafetyStatus};
use crate::signal::Position;

/// Snapshot of the series a sink draws.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub times: Vec<f64>,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
    pub statuses: Vec<SafetyStatus>,
    /// Closed tolerance ring, absent for the circular fallback.
    pub polygon: Option<Vec<Position>>,
    /// Visible time span, in seconds.
    pub window: f64,
}

impl Frame {
    pub fn new(history: &HistoryBuffer, polygon: Option<&ReferencePolygon>, window: f64) -> Self {
        Self {
            times: history.times(),
            xs: history.xs(),
            ys: history.ys(),
            statuses: history.statuses(),
            polygon: polygon.map(|p| p.ring().to_vec()),
            window,
        }
    }

    pub fn latest(&self) -> Option<Position> {
        match (self.xs.last(), self.ys.last()) {
            (Some(x), Some(y)) => Some(Position::new(*x, *y)),
            _ => None,
        }
    }

    /// Time range shown on the timelines: the last `window` seconds, starting
    /// at 0 until that much time has elapsed.
    pub fn time_range(&self) -> (f64, f64) {
        let end = self.times.last().copied().unwrap_or(0.0).max(self.window);
        (end - self.window, end)
    }
}

/// Destination of rendered frames.
pub trait RenderSink {
    fn update(&mut self, frame: &Frame) -> anyhow::Result<()>;

    /// Whether the operator closed the surface.
    fn is_closed(&self) -> bool;
}

/// Shared flag marking a rendering surface as closed.
#[derive(Debug, Clone, Default)]
pub struct CloseHandle(Arc<AtomicBool>);

impl CloseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::HistorySample;

    #[test]
    fn frame_mirrors_history() {
        let mut history = HistoryBuffer::new();
        history.append(HistorySample::new(
            0.0,
            Position::new(0.5, 0.5),
            SafetyStatus::Nominal,
        ));
        history.append(HistorySample::new(
            45.0,
            Position::new(2.5, -1.0),
            SafetyStatus::Fault,
        ));

        let polygon = ReferencePolygon::default_tolerance();
        let frame = Frame::new(&history, Some(&polygon), 30.0);

        assert_eq!(frame.latest(), Some(Position::new(2.5, -1.0)));
        assert_eq!(frame.polygon.as_ref().map(Vec::len), Some(8));
        assert_eq!(frame.time_range(), (15.0, 45.0));
    }

    #[test]
    fn early_frames_start_at_zero() {
        let frame = Frame::new(&HistoryBuffer::new(), None, 30.0);
        assert_eq!(frame.latest(), None);
        assert_eq!(frame.time_range(), (0.0, 30.0));
    }

    #[test]
    fn close_handle_is_shared() {
        let handle = CloseHandle::new();
        let clone = handle.clone();
        assert!(!handle.is_closed());
        clone.close();
        assert!(handle.is_closed());
    }
}
