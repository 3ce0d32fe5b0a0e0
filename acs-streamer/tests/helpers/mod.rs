//! Shared helpers for acs-streamer integration tests

#![allow(dead_code)]

use acs_common::ServerMessage;
use acs_streamer::error::{Result, StreamError};
use acs_streamer::session::{Frame, FrameSink, Session};
use acs_streamer::{AudioLibrary, AudioSource, StreamSettings};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::task::{Context, Poll};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;

pub type ChannelSession = Session<mpsc::UnboundedSender<Frame>>;

const FRAME_TIMEOUT: Duration = Duration::from_secs(5);

/// Deterministic, non-repeating-per-chunk byte content
pub fn pattern(len: usize, seed: u8) -> Vec<u8> {
    (0..len)
        .map(|i| (i % 251) as u8 ^ seed.wrapping_mul(31))
        .collect()
}

pub fn settings(chunk_size: usize, pacing_ms: u64) -> StreamSettings {
    StreamSettings {
        chunk_size,
        pacing: Duration::from_millis(pacing_ms),
        send_timeout: Duration::from_secs(2),
        read_timeout: Duration::from_secs(2),
        shutdown_timeout: Duration::from_secs(2),
    }
}

/// Temporary resource directory with a library over it
pub struct Fixture {
    pub dir: TempDir,
    pub library: Arc<AudioLibrary>,
}

impl Fixture {
    pub fn new(files: &[(&str, Vec<u8>)]) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        for (name, data) in files {
            std::fs::write(dir.path().join(name), data).expect("Failed to write fixture file");
        }
        let library = Arc::new(AudioLibrary::new(
            dir.path(),
            &["mp3".to_string(), "wav".to_string()],
        ));
        Self { dir, library }
    }

    pub fn session(
        &self,
        settings: StreamSettings,
    ) -> (ChannelSession, mpsc::UnboundedReceiver<Frame>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (self.session_with_sink(tx, settings), rx)
    }

    pub fn session_with_sink<S: FrameSink>(&self, sink: S, settings: StreamSettings) -> Session<S> {
        Session::new(sink, Arc::clone(&self.library), settings)
    }
}

pub async fn next_frame(rx: &mut mpsc::UnboundedReceiver<Frame>) -> Frame {
    tokio::time::timeout(FRAME_TIMEOUT, rx.recv())
        .await
        .expect("Timed out waiting for a frame")
        .expect("Frame channel closed")
}

/// Status text of a text frame, None for binary frames
pub fn status_of(frame: &Frame) -> Option<String> {
    match frame {
        Frame::Text(text) => {
            let message: ServerMessage =
                serde_json::from_str(text).expect("Text frame is not a status message");
            Some(message.data().to_string())
        }
        Frame::Binary(_) => None,
    }
}

pub fn statuses(frames: &[Frame]) -> Vec<String> {
    frames.iter().filter_map(status_of).collect()
}

pub fn binaries(frames: &[Frame]) -> Vec<Vec<u8>> {
    frames
        .iter()
        .filter_map(|f| match f {
            Frame::Binary(bytes) => Some(bytes.clone()),
            Frame::Text(_) => None,
        })
        .collect()
}

/// Receive frames up to and including the first status equal to `wanted`
pub async fn collect_until_status(
    rx: &mut mpsc::UnboundedReceiver<Frame>,
    wanted: &str,
) -> Vec<Frame> {
    let mut frames = Vec::new();
    loop {
        let frame = next_frame(rx).await;
        let done = status_of(&frame).as_deref() == Some(wanted);
        frames.push(frame);
        if done {
            return frames;
        }
    }
}

pub async fn assert_no_more_frames(rx: &mut mpsc::UnboundedReceiver<Frame>) {
    tokio::time::sleep(Duration::from_millis(100)).await;
    if let Ok(frame) = rx.try_recv() {
        panic!("Unexpected frame: {:?}", frame);
    }
}

pub async fn wait_until_idle<S: FrameSink>(session: &Session<S>) {
    tokio::time::timeout(FRAME_TIMEOUT, async {
        while session.is_streaming() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("Session never returned to idle");
}

/// Counters shared with a [`ProbeSink`]
#[derive(Debug, Default)]
pub struct ProbeCounters {
    pub writes: AtomicUsize,
    pub in_flight: AtomicUsize,
    pub max_in_flight: AtomicUsize,
}

/// Sink that records how many writes overlap
pub struct ProbeSink {
    counters: Arc<ProbeCounters>,
}

impl ProbeSink {
    pub fn new() -> Self {
        Self {
            counters: Arc::new(ProbeCounters::default()),
        }
    }

    pub fn counters(&self) -> Arc<ProbeCounters> {
        Arc::clone(&self.counters)
    }
}

#[async_trait]
impl FrameSink for ProbeSink {
    async fn send_frame(&mut self, _frame: Frame) -> Result<()> {
        let now = self.counters.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_in_flight.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_micros(200)).await;
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.counters.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// How a [`FaultySource`] misbehaves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fault {
    /// `open` fails with an I/O error
    Open,
    /// Every read fails with an I/O error
    Read,
    /// Reads never complete
    Stall,
}

/// Audio source that resolves every name and then fails as configured
pub struct FaultySource {
    pub fault: Fault,
}

impl FaultySource {
    pub fn session(
        fault: Fault,
        settings: StreamSettings,
    ) -> (
        Session<mpsc::UnboundedSender<Frame>, FaultySource>,
        mpsc::UnboundedReceiver<Frame>,
    ) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session::new(tx, Arc::new(FaultySource { fault }), settings);
        (session, rx)
    }
}

pub struct FaultyReader {
    fault: Fault,
}

impl AsyncRead for FaultyReader {
    fn poll_read(
        self: Pin<&mut Self>,
        _cx: &mut Context<'_>,
        _buf: &mut ReadBuf<'_>,
    ) -> Poll<std::io::Result<()>> {
        match self.fault {
            // The read timeout's timer wakes the task
            Fault::Stall => Poll::Pending,
            _ => Poll::Ready(Err(std::io::Error::other("bad sector"))),
        }
    }
}

#[async_trait]
impl AudioSource for FaultySource {
    type Reader = FaultyReader;

    fn resolve(&self, name: &str) -> acs_common::Result<PathBuf> {
        Ok(PathBuf::from(name))
    }

    async fn open(&self, _path: &Path) -> acs_common::Result<(FaultyReader, u64)> {
        if self.fault == Fault::Open {
            return Err(std::io::Error::from(std::io::ErrorKind::PermissionDenied).into());
        }
        Ok((FaultyReader { fault: self.fault }, 1024))
    }
}

/// Sink that accepts `accept` frames, then fails every write
///
/// Every attempted frame is recorded, including the failed ones.
pub struct FailingSink {
    accept: usize,
    attempts: Arc<Mutex<Vec<Frame>>>,
}

impl FailingSink {
    pub fn new(accept: usize) -> Self {
        Self {
            accept,
            attempts: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn attempts(&self) -> Arc<Mutex<Vec<Frame>>> {
        Arc::clone(&self.attempts)
    }
}

#[async_trait]
impl FrameSink for FailingSink {
    async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        let mut attempts = self.attempts.lock().unwrap();
        attempts.push(frame);
        if attempts.len() > self.accept {
            return Err(StreamError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}
