//! Serialized outbound path
//!
//! Every frame written to a connection, status or chunk, goes through
//! [`Outbound`]. The sink sits behind one async mutex that is held for exactly
//! one frame write and released immediately after.

use crate::error::{Result, StreamError};
use acs_common::ServerMessage;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// One outbound WebSocket frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// JSON-encoded [`ServerMessage`]
    Text(String),
    /// Raw chunk bytes
    Binary(Vec<u8>),
}

impl Frame {
    /// Text frame carrying a status message
    pub fn status(data: &str) -> Result<Self> {
        Ok(Frame::Text(ServerMessage::status(data).to_json()?))
    }
}

/// Write half of a connection
#[async_trait]
pub trait FrameSink: Send + 'static {
    async fn send_frame(&mut self, frame: Frame) -> Result<()>;
}

/// In-process sink, used by tests and tooling that consume frames directly
#[async_trait]
impl FrameSink for mpsc::UnboundedSender<Frame> {
    async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        self.send(frame)
            .map_err(|_| StreamError::Transport("frame receiver dropped".to_string()))
    }
}

/// Whether a guarded send reached the sink
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    /// The caller's transfer was cancelled before it got the sink
    Dropped,
}

pub struct Outbound<S> {
    sink: Mutex<S>,
    send_timeout: Duration,
}

impl<S: FrameSink> Outbound<S> {
    pub fn new(sink: S, send_timeout: Duration) -> Self {
        Self {
            sink: Mutex::new(sink),
            send_timeout,
        }
    }

    /// Write one frame unconditionally
    pub async fn send(&self, frame: Frame) -> Result<()> {
        let mut sink = self.sink.lock().await;
        write_bounded(&mut *sink, frame, self.send_timeout).await
    }

    /// Write one frame on behalf of a transfer
    ///
    /// The token is checked after the lock is taken, so once it has fired no
    /// later frame from that transfer reaches the connection.
    pub async fn send_for(&self, frame: Frame, token: &CancellationToken) -> Result<Delivery> {
        let mut sink = self.sink.lock().await;
        if token.is_cancelled() {
            return Ok(Delivery::Dropped);
        }
        write_bounded(&mut *sink, frame, self.send_timeout).await?;
        Ok(Delivery::Sent)
    }
}

async fn write_bounded<S: FrameSink>(sink: &mut S, frame: Frame, limit: Duration) -> Result<()> {
    match tokio::time::timeout(limit, sink.send_frame(frame)).await {
        Ok(result) => result,
        Err(_) => Err(StreamError::SendTimeout(limit)),
    }
}
