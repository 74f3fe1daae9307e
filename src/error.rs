// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Error types shared by the telemetry links
//!
//! The taxonomy follows the way failures are handled by the loops:
//!
//! - Failures on the register read path (`Timeout`, `Exception`, `Transport`,
//!   `Malformed`) are absorbed by the poll-relay loop, which keeps the last
//!   known position.
//! - Failures on a downlink (`Io`, `LinkClosed`) are fatal and end the process.

use std::time::Duration;

use thiserror::Error;
use tokio_modbus::ExceptionCode;

/// Errors raised while talking to the wellhead or forwarding its data.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The device did not answer within the per-operation timeout.
    #[error("no response from device within {0:?}")]
    Timeout(Duration),

    /// The device answered with a Modbus exception.
    #[error("device answered with Modbus exception {0:?}")]
    Exception(ExceptionCode),

    /// The Modbus transport failed (connection reset, protocol violation...).
    #[error("Modbus transport error: {0}")]
    Transport(#[from] tokio_modbus::Error),

    /// The response arrived but its content cannot be used.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// I/O failure on a byte stream.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the downlink.
    #[error("downlink closed by peer")]
    LinkClosed,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_name_the_failure() {
        let timeout = TelemetryError::Timeout(Duration::from_millis(520));
        assert_eq!(timeout.to_string(), "no response from device within 520ms");

        let exception = TelemetryError::Exception(ExceptionCode::IllegalDataAddress);
        assert!(exception.to_string().contains("IllegalDataAddress"));
    }

    #[test]
    fn io_errors_convert() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "gone");
        assert!(matches!(TelemetryError::from(io), TelemetryError::Io(_)));
    }
}
