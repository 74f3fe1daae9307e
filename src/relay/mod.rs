// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the wellhead-telemetry project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! # Poll-relay
//!
//! The relay sits between the wellhead register block and the ground station.
//! Once per period it reads the position block, renders it as a fixed-width
//! [`RelayMessage`] and writes that frame to the downlink.
//!
//! Both ends are traits so the loop can be driven by the Modbus client and a
//! TCP stream in production and by test doubles in unit tests:
//!
//! - [`RegisterReader`]: bounded block reads on the uplink
//! - [`RelayLink`]: frame transmission on the downlink

pub mod message;
pub mod poll_loop;

pub use message::{MessageError, RelayDecoder, RelayMessage, FRAME_LEN};
pub use poll_loop::{PollRelay, RelaySettings};

use async_trait::async_trait;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::error::TelemetryError;

/// Uplink access to the wellhead register block.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RegisterReader: Send {
    /// Drop any input left over from an earlier, abandoned request.
    async fn discard_stale(&mut self) -> Result<(), TelemetryError>;

    /// Read `count` float values starting at register `base`.
    async fn read_block(&mut self, base: u16, count: usize) -> Result<Vec<f32>, TelemetryError>;
}

/// Downlink towards the ground station.
#[async_trait]
pub trait RelayLink: Send {
    /// Drop output that is still queued from an earlier cycle.
    async fn discard_pending(&mut self) -> Result<(), TelemetryError>;

    /// Send one complete frame.
    async fn transmit(&mut self, frame: &[u8]) -> Result<(), TelemetryError>;
}

/// [`RelayLink`] over any async byte stream.
///
/// Frames are flushed as soon as they are written, so nothing is left queued
/// between cycles.
pub struct StreamLink<W> {
    writer: W,
}

impl<W> StreamLink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

#[async_trait]
impl<W> RelayLink for StreamLink<W>
where
    W: AsyncWrite + Unpin + Send,
{
    // Nothing is ever pending: `transmit` flushes every frame before returning.
    async fn discard_pending(&mut self) -> Result<(), TelemetryError> {
        Ok(())
    }

    async fn transmit(&mut self, frame: &[u8]) -> Result<(), TelemetryError> {
        self.writer.write_all(frame).await?;
        self.writer.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn stream_link_writes_whole_frames() {
        let mut link = StreamLink::new(Vec::new());
        link.transmit(b"MX+00.00000Y+00.00000").await.unwrap();
        link.transmit(b"MX+01.00000Y-01.00000").await.unwrap();

        assert_eq!(
            link.into_inner(),
            b"MX+00.00000Y+00.00000MX+01.00000Y-01.00000".to_vec()
        );
    }

    #[tokio::test]
    async fn buffered_frames_reach_the_peer_before_the_next_cycle() {
        use tokio::io::AsyncReadExt;

        let (client, mut server) = tokio::io::duplex(64);
        let mut link = StreamLink::new(tokio::io::BufWriter::new(client));

        link.transmit(b"MX+00.50000Y-00.25000").await.unwrap();
        link.discard_pending().await.unwrap();

        let mut frame = [0u8; 21];
        tokio::time::timeout(std::time::Duration::from_secs(1), server.read_exact(&mut frame))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&frame, b"MX+00.50000Y-00.25000");
    }

    #[tokio::test]
    async fn stream_link_reports_closed_pipe() {
        let (client, server) = tokio::io::duplex(64);
        drop(server);

        let mut link = StreamLink::new(client);
        let err = link.transmit(b"MX+00.00000Y+00.00000").await.unwrap_err();
        assert!(matches!(err, TelemetryError::Io(_)));
    }
}
