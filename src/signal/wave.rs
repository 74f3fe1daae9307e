// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Sum-of-sinusoids position model

use std::f64::consts::TAU;
use std::ops::Sub;

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Wellhead angular position, in degrees, on the two tilt axes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub const ORIGIN: Position = Position { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Squared distance from the origin.
    pub fn norm_squared(&self) -> f64 {
        self.x * self.x + self.y * self.y
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Offsetting by a calibration reading.
impl Sub for Position {
    type Output = Position;

    fn sub(self, rhs: Position) -> Position {
        Position::new(self.x - rhs.x, self.y - rhs.y)
    }
}

/// One sinusoid: `amplitude * sin(frequency * t + phase)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaveTerm {
    pub amplitude: f64,
    /// Angular frequency in rad/s.
    pub frequency: f64,
    /// Phase offset in radians, in `[0, 2π)` when drawn at random.
    pub phase: f64,
}

impl WaveTerm {
    pub fn value_at(&self, t: f64) -> f64 {
        self.amplitude * (self.frequency * t + self.phase).sin()
    }
}

/// Fixed per-instance random state of a generator.
///
/// Built once and never re-drawn; every future position is a deterministic
/// function of these terms and the elapsed time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveParameters {
    pub x: Vec<WaveTerm>,
    pub y: Vec<WaveTerm>,
}

impl WaveParameters {
    /// Harmonic model with `k` terms per axis.
    ///
    /// Term `n` (1-based) runs at `n / 6` rad/s. Amplitudes start as `1 / n`
    /// and are rescaled so that an axis sums to a random maximum in `[1, 2)`.
    /// Phases are uniform in `[0, 2π)`.
    pub fn harmonic<R: Rng>(k: usize, rng: &mut R) -> Self {
        let x_phases: Vec<f64> = (0..k).map(|_| rng.random::<f64>() * TAU).collect();
        let y_phases: Vec<f64> = (0..k).map(|_| rng.random::<f64>() * TAU).collect();
        let x_max = rng.random::<f64>() + 1.0;
        let y_max = rng.random::<f64>() + 1.0;

        Self {
            x: harmonic_axis(&x_phases, x_max),
            y: harmonic_axis(&y_phases, y_max),
        }
    }

    /// One term per axis with explicit phases.
    pub fn single_tone(amplitude: f64, frequency: f64, phase_x: f64, phase_y: f64) -> Self {
        Self {
            x: vec![WaveTerm {
                amplitude,
                frequency,
                phase: phase_x,
            }],
            y: vec![WaveTerm {
                amplitude,
                frequency,
                phase: phase_y,
            }],
        }
    }

    /// One term per axis with phases drawn uniformly in `[0, 2π)`.
    pub fn single_tone_random<R: Rng>(amplitude: f64, frequency: f64, rng: &mut R) -> Self {
        let phase_x = rng.random::<f64>() * TAU;
        let phase_y = rng.random::<f64>() * TAU;
        Self::single_tone(amplitude, frequency, phase_x, phase_y)
    }

    /// Upper bound of `|x|` and `|y|`: the sum of the term amplitudes.
    pub fn amplitude_bound(&self) -> (f64, f64) {
        let bound = |terms: &[WaveTerm]| -> f64 { terms.iter().map(|t| t.amplitude.abs()).sum() };
        (bound(&self.x), bound(&self.y))
    }
}

fn harmonic_axis(phases: &[f64], max: f64) -> Vec<WaveTerm> {
    let raw: Vec<f64> = (1..=phases.len()).map(|n| 1.0 / n as f64).collect();
    let total: f64 = raw.iter().sum();

    raw.iter()
        .zip(phases)
        .enumerate()
        .map(|(i, (amp, phase))| WaveTerm {
            amplitude: amp / total * max,
            frequency: (i + 1) as f64 / 6.0,
            phase: *phase,
        })
        .collect()
}

/// Time-parameterised position source for the simulated wellhead.
#[derive(Debug, Clone)]
pub struct SignalGenerator {
    parameters: WaveParameters,
    last: Option<Position>,
}

impl SignalGenerator {
    pub fn new(parameters: WaveParameters) -> Self {
        Self {
            parameters,
            last: None,
        }
    }

    pub fn parameters(&self) -> &WaveParameters {
        &self.parameters
    }

    /// Position at elapsed time `t` seconds. Any `t` is accepted, in any order.
    pub fn position_at(&self, t: f64) -> Position {
        let sum = |terms: &[WaveTerm]| -> f64 { terms.iter().map(|term| term.value_at(t)).sum() };
        Position::new(sum(&self.parameters.x), sum(&self.parameters.y))
    }

    /// Same as [`position_at`](Self::position_at), remembering the result.
    pub fn get_position(&mut self, t: f64) -> Position {
        let position = self.position_at(t);
        self.last = Some(position);
        position
    }

    /// Last value handed out by [`get_position`](Self::get_position).
    pub fn last_position(&self) -> Option<Position> {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn zero_phase_tone_starts_at_origin() {
        let generator = SignalGenerator::new(WaveParameters::single_tone(2.0, 1.0, 0.0, 0.0));
        assert_eq!(generator.position_at(0.0), Position::ORIGIN);

        let quarter = generator.position_at(std::f64::consts::FRAC_PI_2);
        assert_abs_diff_eq!(quarter.x, 2.0, epsilon = 1e-12);
        assert_abs_diff_eq!(quarter.y, 2.0, epsilon = 1e-12);
    }

    #[test]
    fn harmonic_amplitudes_are_normalised() {
        let mut rng = StdRng::seed_from_u64(1);
        let params = WaveParameters::harmonic(2, &mut rng);
        let (bx, by) = params.amplitude_bound();

        assert!((1.0..2.0).contains(&bx), "x bound {bx}");
        assert!((1.0..2.0).contains(&by), "y bound {by}");
        // 1/1 : 1/2 ratio survives normalisation
        assert_abs_diff_eq!(params.x[0].amplitude, 2.0 * params.x[1].amplitude, epsilon = 1e-12);
        assert_abs_diff_eq!(params.x[1].frequency, 2.0 / 6.0, epsilon = 1e-12);
        for term in params.x.iter().chain(&params.y) {
            assert!((0.0..TAU).contains(&term.phase));
        }
    }

    #[test]
    fn output_is_bounded_by_amplitude_sum() {
        let mut rng = StdRng::seed_from_u64(99);
        let generator = SignalGenerator::new(WaveParameters::harmonic(4, &mut rng));
        let (bx, by) = generator.parameters().amplitude_bound();

        for i in 0..2_000 {
            let p = generator.position_at(i as f64 * 0.37 - 100.0);
            assert!(p.x.abs() <= bx + 1e-12);
            assert!(p.y.abs() <= by + 1e-12);
        }
    }

    #[test]
    fn output_is_continuous_in_time() {
        let mut rng = StdRng::seed_from_u64(5);
        let generator = SignalGenerator::new(WaveParameters::harmonic(3, &mut rng));
        let t = 17.25;
        let base = generator.position_at(t);

        let mut previous_gap = f64::INFINITY;
        for eps in [1e-1, 1e-3, 1e-5, 1e-7] {
            let gap = (generator.position_at(t + eps) - base).norm_squared().sqrt();
            assert!(gap <= previous_gap);
            previous_gap = gap;
        }
        assert!(previous_gap < 1e-6);
    }

    #[test]
    fn out_of_order_calls_have_no_side_effects() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut generator = SignalGenerator::new(WaveParameters::harmonic(2, &mut rng));
        let later = generator.get_position(50.0);
        let earlier = generator.get_position(10.0);

        assert_eq!(generator.position_at(50.0), later);
        assert_eq!(generator.last_position(), Some(earlier));
    }
}
