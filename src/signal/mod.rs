// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Wellhead signal generation
//!
//! The simulated wellhead moves along a small sum of sinusoids on each axis.
//! All randomness is drawn once, when the [`WaveParameters`] are built, and the
//! generator is then a pure function of the elapsed time.
//!
//! Two models are available:
//!
//! * **Harmonic**: `k` terms per axis, term `n` at frequency `n / 6` with an
//!   amplitude proportional to `1 / n`, normalised so the amplitudes of an axis
//!   sum to a random maximum in `[1, 2)`.
//! * **Single tone**: one term per axis (amplitude 2, frequency 1 on the field
//!   device), used by the register server.
//!
//! ## Examples
//!
//! ```rust
//! use rand::{rngs::StdRng, SeedableRng};
//! use wellhead_telemetry::signal::{SignalGenerator, WaveParameters};
//!
//! let mut rng = StdRng::seed_from_u64(7);
//! let mut generator = SignalGenerator::new(WaveParameters::harmonic(2, &mut rng));
//!
//! let position = generator.get_position(12.5);
//! assert!(position.x.abs() <= generator.parameters().amplitude_bound().0);
//! ```

pub mod wave;

pub use wave::{Position, SignalGenerator, WaveParameters, WaveTerm};

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

/// Selects and parameterises the wave model of a generator.
///
/// This is the serialisable face of [`WaveParameters`]: the configuration
/// names the model, the random draw happens in [`SignalConfig::build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SignalConfig {
    /// `terms` harmonics per axis with random phases and normalised amplitudes.
    Harmonic {
        /// Number of sinusoids per axis.
        terms: usize,
        /// Seed for reproducible runs; OS entropy when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
    /// One sinusoid per axis with a random phase.
    SingleTone {
        /// Peak amplitude in degrees.
        amplitude: f64,
        /// Angular frequency in rad/s.
        frequency: f64,
        /// Seed for reproducible runs; OS entropy when absent.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        seed: Option<u64>,
    },
}

impl SignalConfig {
    /// Draw the random parameters and return a ready generator.
    pub fn build(&self) -> SignalGenerator {
        let mut rng = match self.seed() {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };

        let parameters = match self {
            SignalConfig::Harmonic { terms, .. } => WaveParameters::harmonic(*terms, &mut rng),
            SignalConfig::SingleTone {
                amplitude,
                frequency,
                ..
            } => WaveParameters::single_tone_random(*amplitude, *frequency, &mut rng),
        };

        SignalGenerator::new(parameters)
    }

    fn seed(&self) -> Option<u64> {
        match self {
            SignalConfig::Harmonic { seed, .. } | SignalConfig::SingleTone { seed, .. } => *seed,
        }
    }

    /// Make the random draw reproducible.
    pub fn set_seed(&mut self, value: u64) {
        match self {
            SignalConfig::Harmonic { seed, .. } | SignalConfig::SingleTone { seed, .. } => {
                *seed = Some(value)
            }
        }
    }

    /// Largest amplitude the configured model can reach on an axis.
    pub fn peak_amplitude(&self) -> f64 {
        match self {
            // Normalised maximum is drawn from [1, 2)
            SignalConfig::Harmonic { .. } => 2.0,
            SignalConfig::SingleTone { amplitude, .. } => amplitude.abs(),
        }
    }
}

/// Field device model: one tone per axis, amplitude 2°, 1 rad/s.
impl Default for SignalConfig {
    fn default() -> Self {
        SignalConfig::SingleTone {
            amplitude: 2.0,
            frequency: 1.0,
            seed: None,
        }
    }
}

/// Scale a position component into the legacy unsigned register encoding.
///
/// The value is expressed in thousandths of a degree and shifted up by the
/// peak amplitude so the full swing stays positive.
pub fn scaled_integer(value: f64, peak_amplitude: f64) -> u16 {
    let scaled = (value * 1000.0).trunc() + peak_amplitude * 1000.0;
    scaled.round().clamp(0.0, u16::MAX as f64) as u16
}
