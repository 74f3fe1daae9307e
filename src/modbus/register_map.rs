// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Wellhead register map and its word encoding
//!
//! The position block is a window of five IEEE-754 single precision values
//! stored in input registers. Each value spans two registers, high word first,
//! so a block of five values occupies ten registers.

use crate::error::TelemetryError;
use crate::signal::Position;

/// First input register of the position block.
pub const BLOCK_BASE_ADDRESS: u16 = 1006;

/// Number of float slots in the position block.
pub const BLOCK_LEN: usize = 5;

/// Registers per float slot.
pub const WORDS_PER_VALUE: usize = 2;

/// Number of input registers covered by the position block.
pub const BLOCK_REGISTER_COUNT: u16 = (BLOCK_LEN * WORDS_PER_VALUE) as u16;

/// Slot holding the update counter of the device.
pub const SEQUENCE_SLOT: usize = 0;
/// Slot holding the device elapsed time in seconds.
pub const ELAPSED_SLOT: usize = 1;
/// Slot holding the device status code (0 = nominal).
pub const STATUS_SLOT: usize = 2;
/// Slot holding the x angle.
pub const X_SLOT: usize = 3;
/// Slot holding the y angle.
pub const Y_SLOT: usize = 4;

/// Holding register with the legacy scaled-integer x angle.
pub const SCALED_X_REGISTER: u16 = 0;
/// Holding register with the legacy scaled-integer y angle.
pub const SCALED_Y_REGISTER: u16 = 1;

/// Encode float values into big-endian register pairs.
pub fn encode_floats(values: &[f32]) -> Vec<u16> {
    values
        .iter()
        .flat_map(|value| {
            let bits = value.to_bits();
            [(bits >> 16) as u16, (bits & 0xFFFF) as u16]
        })
        .collect()
}

/// Decode big-endian register pairs into float values.
///
/// # Errors
///
/// Returns [`TelemetryError::Malformed`] when the word count is odd.
pub fn decode_floats(words: &[u16]) -> Result<Vec<f32>, TelemetryError> {
    if words.len() % WORDS_PER_VALUE != 0 {
        return Err(TelemetryError::Malformed(format!(
            "{} registers cannot hold whole float values",
            words.len()
        )));
    }

    Ok(words
        .chunks_exact(WORDS_PER_VALUE)
        .map(|pair| f32::from_bits(((pair[0] as u32) << 16) | pair[1] as u32))
        .collect())
}

/// Extract the position from a decoded block.
///
/// A short block or a non-finite coordinate is reported as malformed; the
/// latter is how a torn or corrupted read shows up once decoded.
pub fn position_from_block(values: &[f32]) -> Result<Position, TelemetryError> {
    if values.len() <= Y_SLOT {
        return Err(TelemetryError::Malformed(format!(
            "expected {} values, got {}",
            BLOCK_LEN,
            values.len()
        )));
    }

    let position = Position::new(values[X_SLOT] as f64, values[Y_SLOT] as f64);
    if !position.is_finite() {
        return Err(TelemetryError::Malformed(format!(
            "non-finite position ({}, {})",
            values[X_SLOT], values[Y_SLOT]
        )));
    }

    Ok(position)
}
