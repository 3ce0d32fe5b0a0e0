//! Per-connection streaming session
//!
//! A [`Session`] owns one connection's streaming state and turns the inbound
//! control messages into transfers:
//!
//! | From | Event | To | Effect |
//! |------|-------|----|--------|
//! | Idle | start(name) | Streaming | fresh token, spawn worker |
//! | Streaming | start(name) | Streaming | fire old token, fresh token, spawn worker |
//! | Streaming | stop | Idle | fire token, "Streaming stopped" |
//! | Idle | stop | Idle | nothing |
//! | Streaming | worker done | Idle | worker clears the flag |
//! | any | start("") | unchanged | "Error: No filename provided" |
//!
//! The streaming flag lives in a cell together with a generation number that
//! every start and stop bumps. A worker may only clear the flag for its own
//! generation, so a late worker can never reset a newer transfer's state.

pub mod outbound;
pub mod worker;

use crate::error::Result;
use crate::library::{AudioLibrary, AudioSource};
use crate::state::SharedState;
use acs_common::config::{StreamingConfig, MAX_CHUNK_SIZE};
use acs_common::protocol::status;
use acs_common::ControlMessage;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use uuid::Uuid;

pub use outbound::{Delivery, Frame, FrameSink, Outbound};
pub use worker::{TransferOutcome, TransferTicket};

use worker::TransferWorker;

/// Session streaming state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Streaming,
}

/// Transfer tuning, fixed for the life of a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamSettings {
    pub chunk_size: usize,
    pub pacing: Duration,
    pub send_timeout: Duration,
    pub read_timeout: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self::from(&StreamingConfig::default())
    }
}

impl StreamSettings {
    /// Chunk size forced into `1..=MAX_CHUNK_SIZE`
    ///
    /// A zero chunk size would read nothing and report every file as finished.
    pub fn normalized(mut self) -> Self {
        let clamped = self.chunk_size.clamp(1, MAX_CHUNK_SIZE);
        if clamped != self.chunk_size {
            warn!("Chunk size {} out of range, using {}", self.chunk_size, clamped);
            self.chunk_size = clamped;
        }
        self
    }
}

impl From<&StreamingConfig> for StreamSettings {
    fn from(config: &StreamingConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            pacing: config.pacing(),
            send_timeout: config.send_timeout(),
            read_timeout: config.read_timeout(),
            shutdown_timeout: config.shutdown_timeout(),
        }
    }
}

#[derive(Debug, Default)]
struct StreamCell {
    streaming: bool,
    generation: u64,
}

/// State touched by both the receive loop and the workers
pub(crate) struct SessionShared<S> {
    pub(crate) outbound: Outbound<S>,
    cell: Mutex<StreamCell>,
}

impl<S: FrameSink> SessionShared<S> {
    fn new(sink: S, send_timeout: Duration) -> Self {
        Self {
            outbound: Outbound::new(sink, send_timeout),
            cell: Mutex::new(StreamCell::default()),
        }
    }

    fn cell(&self) -> MutexGuard<'_, StreamCell> {
        // The cell holds plain data; a panic elsewhere cannot leave it torn
        self.cell.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn is_streaming(&self) -> bool {
        self.cell().streaming
    }

    /// Enter Streaming under a new generation
    fn begin(&self) -> u64 {
        let mut cell = self.cell();
        cell.generation += 1;
        cell.streaming = true;
        cell.generation
    }

    /// Leave Streaming on behalf of the client; false if already idle
    fn halt(&self) -> bool {
        let mut cell = self.cell();
        if !cell.streaming {
            return false;
        }
        cell.streaming = false;
        cell.generation += 1;
        true
    }

    /// Leave Streaming on behalf of the worker holding `generation`
    pub(crate) fn finish(&self, generation: u64) -> bool {
        let mut cell = self.cell();
        if cell.generation != generation || !cell.streaming {
            return false;
        }
        cell.streaming = false;
        true
    }
}

/// Streaming session for one connection
pub struct Session<S: FrameSink, L: AudioSource = AudioLibrary> {
    id: Uuid,
    shared: Arc<SessionShared<S>>,
    /// Token of the current (or last) transfer
    cancel: CancellationToken,
    tasks: TaskTracker,
    library: Arc<L>,
    settings: StreamSettings,
    stats: Arc<SharedState>,
}

impl<S: FrameSink, L: AudioSource> Session<S, L> {
    pub fn new(sink: S, library: Arc<L>, settings: StreamSettings) -> Self {
        let settings = settings.normalized();
        Self {
            id: Uuid::new_v4(),
            shared: Arc::new(SessionShared::new(sink, settings.send_timeout)),
            cancel: CancellationToken::new(),
            tasks: TaskTracker::new(),
            library,
            settings,
            stats: Arc::new(SharedState::new()),
        }
    }

    /// Report transfer counts into server-wide state
    pub fn with_stats(mut self, stats: Arc<SharedState>) -> Self {
        self.stats = stats;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn state(&self) -> StreamState {
        if self.shared.is_streaming() {
            StreamState::Streaming
        } else {
            StreamState::Idle
        }
    }

    pub fn is_streaming(&self) -> bool {
        self.shared.is_streaming()
    }

    /// Handle one inbound text frame
    ///
    /// Malformed messages are logged and dropped. An error means the
    /// connection can no longer be written to.
    pub async fn handle_text(&mut self, text: &str) -> Result<()> {
        match ControlMessage::parse(text) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                warn!(session = %self.id, "Error unmarshaling message: {}", e);
                Ok(())
            }
        }
    }

    pub async fn handle(&mut self, message: ControlMessage) -> Result<()> {
        match message {
            ControlMessage::Start { filename } => self.start(filename).await,
            ControlMessage::Stop => self.stop().await,
        }
    }

    /// Start streaming `filename`, superseding any transfer in progress
    pub async fn start(&mut self, filename: Option<String>) -> Result<()> {
        let Some(filename) = filename.filter(|name| !name.is_empty()) else {
            warn!(session = %self.id, "Start requested without filename");
            return self.send_status(status::NO_FILENAME).await;
        };

        if self.shared.is_streaming() {
            debug!(session = %self.id, file = %filename, "Superseding active transfer");
        }

        self.cancel.cancel();
        self.cancel = CancellationToken::new();
        let ticket = TransferTicket {
            generation: self.shared.begin(),
            token: self.cancel.clone(),
        };

        info!(session = %self.id, file = %filename, generation = ticket.generation, "Starting transfer");
        let worker = TransferWorker::new(
            self.id,
            filename,
            ticket,
            Arc::clone(&self.shared),
            Arc::clone(&self.library),
            self.settings.clone(),
        );
        self.tasks.spawn(worker.run());
        self.stats.record_transfer_started();
        Ok(())
    }

    /// Stop the transfer in progress; no-op while idle
    pub async fn stop(&mut self) -> Result<()> {
        // Idle check and flag clear under one lock
        if !self.shared.halt() {
            debug!(session = %self.id, "Stop while idle ignored");
            return Ok(());
        }

        self.cancel.cancel();
        self.cancel = CancellationToken::new();

        info!(session = %self.id, "Streaming stopped by client");
        self.send_status(status::STOPPED).await
    }

    async fn send_status(&self, text: &str) -> Result<()> {
        self.shared.outbound.send(Frame::status(text)?).await
    }

    /// Tear the session down, waiting a bounded time for workers to exit
    pub async fn close(self) {
        self.cancel.cancel();
        self.tasks.close();
        let limit = self.settings.shutdown_timeout;
        if tokio::time::timeout(limit, self.tasks.wait()).await.is_err() {
            warn!(session = %self.id, "Workers still running after {:?}", limit);
        }
        debug!(session = %self.id, "Session closed");
    }
}

impl<S: FrameSink, L: AudioSource> Drop for Session<S, L> {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
