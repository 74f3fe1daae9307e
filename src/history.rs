// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sliding window of classified samples feeding the plots

use std::collections::VecDeque;

use crate::safety::SafetyStatus;
use crate::signal::Position;

/// One classified position.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HistorySample {
    /// Seconds since the session started.
    pub t: f64,
    pub x: f64,
    pub y: f64,
    pub status: SafetyStatus,
}

impl HistorySample {
    pub fn new(t: f64, position: Position, status: SafetyStatus) -> Self {
        Self {
            t,
            x: position.x,
            y: position.y,
            status,
        }
    }

    pub fn position(&self) -> Position {
        Position::new(self.x, self.y)
    }
}

/// Time-ordered samples, oldest first.
///
/// Callers append in non-decreasing `t`; the buffer never reorders.
#[derive(Debug, Clone, Default)]
pub struct HistoryBuffer {
    samples: VecDeque<HistorySample>,
}

impl HistoryBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, sample: HistorySample) {
        self.samples.push_back(sample);
    }

    /// Drop samples that are `window + slack` seconds or more behind the
    /// newest one.
    ///
    /// Returns the number of evicted samples.
    pub fn evict_expired(&mut self, window: f64, slack: f64) -> usize {
        let Some(newest) = self.newest() else {
            return 0;
        };
        let horizon = newest.t - window - slack;

        let mut evicted = 0;
        while self.samples.front().is_some_and(|oldest| oldest.t <= horizon) {
            self.samples.pop_front();
            evicted += 1;
        }
        evicted
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn newest(&self) -> Option<&HistorySample> {
        self.samples.back()
    }

    pub fn samples(&self) -> impl Iterator<Item = &HistorySample> {
        self.samples.iter()
    }

    pub fn times(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.t).collect()
    }

    pub fn xs(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.x).collect()
    }

    pub fn ys(&self) -> Vec<f64> {
        self.samples.iter().map(|s| s.y).collect()
    }

    pub fn statuses(&self) -> Vec<SafetyStatus> {
        self.samples.iter().map(|s| s.status).collect()
    }
}
