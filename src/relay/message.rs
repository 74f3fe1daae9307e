// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Relay message codec
//!
//! The relay forwards each position as a fixed-width ASCII frame:
//!
//! ```text
//! M X +01.50000 Y -02.25000
//! │ │ └──9────┘ │ └──9────┘
//! │ └ x tag     └ y tag
//! └ message type tag
//! ```
//!
//! Each axis is rendered with a forced sign, two integer digits and five
//! decimals, so a frame is always [`FRAME_LEN`] bytes long. Frames carry no
//! delimiter; [`RelayDecoder`] resynchronises on the `M` tag.

use log::debug;
use thiserror::Error;

use crate::signal::Position;

/// Message type tag opening every frame.
pub const MESSAGE_TAG: u8 = b'M';
/// Tag preceding the x field.
pub const X_TAG: u8 = b'X';
/// Tag preceding the y field.
pub const Y_TAG: u8 = b'Y';

/// Width of one signed axis field.
pub const FIELD_WIDTH: usize = 9;
/// Length of a full frame on the wire.
pub const FRAME_LEN: usize = 1 + 2 * (1 + FIELD_WIDTH);

/// Largest magnitude that fits the field width.
pub const MAX_ABS_VALUE: f64 = 99.99999;

const X_FIELD: std::ops::Range<usize> = 2..2 + FIELD_WIDTH;
const Y_TAG_AT: usize = 2 + FIELD_WIDTH;
const Y_FIELD: std::ops::Range<usize> = Y_TAG_AT + 1..FRAME_LEN;

/// Errors raised when a frame cannot be parsed.
#[derive(Debug, Error, PartialEq)]
pub enum MessageError {
    #[error("frame is {0} bytes long, expected {expected}", expected = FRAME_LEN)]
    WrongLength(usize),

    #[error("expected tag '{expected}' at offset {offset}")]
    MissingTag { expected: char, offset: usize },

    #[error("invalid axis field {0:?}")]
    BadField(String),
}

/// One relayed position sample.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelayMessage {
    position: Position,
}

impl RelayMessage {
    pub fn new(position: Position) -> Self {
        Self { position }
    }

    pub fn position(&self) -> Position {
        self.position
    }

    /// Frame body without the message type tag, e.g. `X+01.50000Y-02.25000`.
    pub fn body(&self) -> String {
        format!(
            "X{:+09.5}Y{:+09.5}",
            clamp_axis(self.position.x),
            clamp_axis(self.position.y)
        )
    }

    /// Full frame as sent on the downlink.
    pub fn to_wire(&self) -> String {
        format!("{}{}", MESSAGE_TAG as char, self.body())
    }

    /// Parse a full frame, tag included.
    pub fn parse(frame: &str) -> Result<Self, MessageError> {
        let bytes = frame.as_bytes();
        if bytes.len() != FRAME_LEN {
            return Err(MessageError::WrongLength(bytes.len()));
        }
        if !frame.is_ascii() {
            return Err(MessageError::BadField(frame.to_string()));
        }

        expect_tag(bytes, 0, MESSAGE_TAG)?;
        expect_tag(bytes, 1, X_TAG)?;
        expect_tag(bytes, Y_TAG_AT, Y_TAG)?;

        let x = parse_field(&frame[X_FIELD])?;
        let y = parse_field(&frame[Y_FIELD])?;
        Ok(Self::new(Position::new(x, y)))
    }
}

fn clamp_axis(value: f64) -> f64 {
    value.clamp(-MAX_ABS_VALUE, MAX_ABS_VALUE)
}

fn expect_tag(bytes: &[u8], offset: usize, tag: u8) -> Result<(), MessageError> {
    if bytes[offset] == tag {
        Ok(())
    } else {
        Err(MessageError::MissingTag {
            expected: tag as char,
            offset,
        })
    }
}

fn parse_field(field: &str) -> Result<f64, MessageError> {
    let signed = field.starts_with('+') || field.starts_with('-');
    let digits_ok = field[1..]
        .bytes()
        .all(|b| b.is_ascii_digit() || b == b'.');

    if !signed || !digits_ok {
        return Err(MessageError::BadField(field.to_string()));
    }

    field
        .parse::<f64>()
        .map_err(|_| MessageError::BadField(field.to_string()))
}

/// Reassembles frames from an undelimited byte stream.
#[derive(Debug, Default)]
pub struct RelayDecoder {
    buffer: Vec<u8>,
    discarded: usize,
}

impl RelayDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append received bytes.
    pub fn push(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes thrown away while resynchronising.
    pub fn discarded(&self) -> usize {
        self.discarded
    }

    /// Next complete frame, if one is buffered.
    pub fn next_message(&mut self) -> Option<RelayMessage> {
        loop {
            match self.buffer.iter().position(|&b| b == MESSAGE_TAG) {
                Some(start) => self.drop_front(start),
                None => {
                    let len = self.buffer.len();
                    self.drop_front(len);
                    return None;
                }
            }

            if self.buffer.len() < FRAME_LEN {
                return None;
            }

            let parsed = std::str::from_utf8(&self.buffer[..FRAME_LEN])
                .map_err(|_| MessageError::BadField("non-ASCII bytes".to_string()))
                .and_then(RelayMessage::parse);

            match parsed {
                Ok(message) => {
                    self.buffer.drain(..FRAME_LEN);
                    return Some(message);
                }
                Err(e) => {
                    debug!("Skipping misaligned frame: {}", e);
                    self.drop_front(1);
                }
            }
        }
    }

    /// Drain every complete frame and keep only the most recent one.
    pub fn latest_message(&mut self) -> Option<RelayMessage> {
        std::iter::from_fn(|| self.next_message()).last()
    }

    fn drop_front(&mut self, count: usize) {
        self.buffer.drain(..count);
        self.discarded += count;
    }
}
