//! Transfer worker
//!
//! One task per `start`: resolves the file, announces it, then reads it in
//! fixed-size chunks and pushes each chunk through the session's outbound
//! path with a fixed pacing delay in between. Every failure ends the worker;
//! nothing is retried.

use super::outbound::{Delivery, Frame, FrameSink};
use super::{SessionShared, StreamSettings};
use crate::error::{Result, StreamError};
use crate::library::AudioSource;
use acs_common::protocol::status;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Identity of one transfer within its session
#[derive(Debug, Clone)]
pub struct TransferTicket {
    /// Session generation at spawn time
    pub generation: u64,
    /// Fired on stop, supersede or connection teardown
    pub token: CancellationToken,
}

/// How a transfer ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferOutcome {
    /// End of file reached and announced
    Finished { chunks: u64, bytes: u64 },
    /// Stopped, superseded or torn down
    Cancelled { chunks: u64, bytes: u64 },
    NotFound,
    OpenFailed,
    ReadFailed,
    SendFailed,
}

pub(crate) struct TransferWorker<S, L> {
    session_id: Uuid,
    filename: String,
    ticket: TransferTicket,
    shared: Arc<SessionShared<S>>,
    library: Arc<L>,
    settings: StreamSettings,
}

impl<S: FrameSink, L: AudioSource> TransferWorker<S, L> {
    pub(crate) fn new(
        session_id: Uuid,
        filename: String,
        ticket: TransferTicket,
        shared: Arc<SessionShared<S>>,
        library: Arc<L>,
        settings: StreamSettings,
    ) -> Self {
        Self {
            session_id,
            filename,
            ticket,
            shared,
            library,
            settings,
        }
    }

    pub(crate) async fn run(self) -> TransferOutcome {
        let started = Instant::now();
        let outcome = self.transfer().await;
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match &outcome {
            TransferOutcome::Finished { chunks, bytes } => info!(
                session = %self.session_id,
                file = %self.filename,
                chunks,
                bytes,
                elapsed_ms,
                "Finished streaming file"
            ),
            TransferOutcome::Cancelled { chunks, bytes } => info!(
                session = %self.session_id,
                file = %self.filename,
                chunks,
                bytes,
                elapsed_ms,
                "Streaming stopped for file"
            ),
            other => warn!(
                session = %self.session_id,
                file = %self.filename,
                outcome = ?other,
                elapsed_ms,
                "Transfer ended with error"
            ),
        }
        outcome
    }

    async fn transfer(&self) -> TransferOutcome {
        let path = match self.library.resolve(&self.filename) {
            Ok(path) => path,
            Err(acs_common::Error::Io(e)) => {
                warn!(session = %self.session_id, file = %self.filename, "Cannot stat file: {}", e);
                return self.fail(status::OPEN_ERROR, TransferOutcome::OpenFailed).await;
            }
            Err(e) => {
                debug!(session = %self.session_id, "{}", e);
                let text = status::not_found(&self.filename);
                return self.fail(&text, TransferOutcome::NotFound).await;
            }
        };

        match self.emit(&status::streaming(&self.filename)).await {
            Ok(Delivery::Sent) => {}
            Ok(Delivery::Dropped) => return TransferOutcome::Cancelled { chunks: 0, bytes: 0 },
            Err(e) => return self.send_failed(e),
        }

        let (mut file, size) = match self.library.open(&path).await {
            Ok(opened) => opened,
            Err(e) => {
                warn!(session = %self.session_id, file = %self.filename, "Error opening file: {}", e);
                return self.fail(status::OPEN_ERROR, TransferOutcome::OpenFailed).await;
            }
        };
        debug!(session = %self.session_id, file = %self.filename, size, "Streaming file");

        let token = &self.ticket.token;
        let mut chunks = 0u64;
        let mut bytes = 0u64;

        loop {
            if token.is_cancelled() {
                return TransferOutcome::Cancelled { chunks, bytes };
            }

            let chunk =
                match read_chunk(&mut file, self.settings.chunk_size, self.settings.read_timeout)
                    .await
                {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        warn!(session = %self.session_id, file = %self.filename, "Error reading file: {}", e);
                        return self.fail(status::READ_ERROR, TransferOutcome::ReadFailed).await;
                    }
                };

            if chunk.is_empty() {
                self.shared.finish(self.ticket.generation);
                return match self.emit(status::FINISHED).await {
                    Ok(Delivery::Sent) => TransferOutcome::Finished { chunks, bytes },
                    Ok(Delivery::Dropped) => TransferOutcome::Cancelled { chunks, bytes },
                    Err(e) => self.send_failed(e),
                };
            }

            let len = chunk.len() as u64;
            match self.shared.outbound.send_for(Frame::Binary(chunk), token).await {
                Ok(Delivery::Sent) => {
                    chunks += 1;
                    bytes += len;
                }
                Ok(Delivery::Dropped) => return TransferOutcome::Cancelled { chunks, bytes },
                Err(e) => {
                    let outcome = self.send_failed(e);
                    // The connection is most likely gone; this is best effort
                    if let Err(e) = self.emit(status::WRITE_ERROR).await {
                        debug!(session = %self.session_id, "Write error status not delivered: {}", e);
                    }
                    return outcome;
                }
            }

            if !self.settings.pacing.is_zero() {
                tokio::select! {
                    _ = token.cancelled() => return TransferOutcome::Cancelled { chunks, bytes },
                    _ = tokio::time::sleep(self.settings.pacing) => {}
                }
            }
        }
    }

    /// Status frame gated on this transfer's token
    async fn emit(&self, text: &str) -> Result<Delivery> {
        let frame = Frame::status(text)?;
        self.shared.outbound.send_for(frame, &self.ticket.token).await
    }

    /// Release the session, report a resource error, and end
    ///
    /// The flag is cleared before the status goes out so a client reacting to
    /// the status always finds the session idle. `finish` is a no-op if a
    /// newer transfer or a stop already took over.
    async fn fail(&self, text: &str, outcome: TransferOutcome) -> TransferOutcome {
        self.shared.finish(self.ticket.generation);
        match self.emit(text).await {
            Ok(Delivery::Sent) => outcome,
            Ok(Delivery::Dropped) => TransferOutcome::Cancelled { chunks: 0, bytes: 0 },
            Err(e) => self.send_failed(e),
        }
    }

    fn send_failed(&self, error: StreamError) -> TransferOutcome {
        warn!(session = %self.session_id, file = %self.filename, "Error writing to WebSocket: {}", error);
        self.shared.finish(self.ticket.generation);
        TransferOutcome::SendFailed
    }
}

/// Read up to `chunk_size` bytes, filling the chunk unless end of file is hit
///
/// Returns an empty chunk at end of file.
pub async fn read_chunk<R>(reader: &mut R, chunk_size: usize, limit: Duration) -> Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut chunk = Vec::with_capacity(chunk_size);
    let mut limited = (&mut *reader).take(chunk_size as u64);
    let read = limited.read_to_end(&mut chunk);
    match tokio::time::timeout(limit, read).await {
        Ok(result) => {
            result?;
            Ok(chunk)
        }
        Err(_) => Err(StreamError::ReadTimeout(limit)),
    }
}
