//! Server-wide shared state
//!
//! Counters shared by all connections. Sessions themselves share nothing;
//! this only feeds the health endpoint and log lines.

use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Shared state accessible by all connections
///
/// Uses atomics for lock-free access from every session task
#[derive(Debug)]
pub struct SharedState {
    /// Open WebSocket sessions
    active_sessions: AtomicU64,

    /// Transfers started since startup (including superseded ones)
    transfers_started: AtomicU64,

    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            active_sessions: AtomicU64::new(0),
            transfers_started: AtomicU64::new(0),
            startup_time: Utc::now(),
        }
    }

    /// Count a session as open until the returned guard is dropped
    pub fn session_opened(self: &Arc<Self>) -> SessionGuard {
        self.active_sessions.fetch_add(1, Ordering::Relaxed);
        SessionGuard {
            state: Arc::clone(self),
        }
    }

    pub fn active_sessions(&self) -> u64 {
        self.active_sessions.load(Ordering::Relaxed)
    }

    pub fn record_transfer_started(&self) {
        self.transfers_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn transfers_started(&self) -> u64 {
        self.transfers_started.load(Ordering::Relaxed)
    }

    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.startup_time).num_seconds().max(0)
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Decrements the active session count on drop
#[derive(Debug)]
pub struct SessionGuard {
    state: Arc<SharedState>,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.active_sessions.fetch_sub(1, Ordering::Relaxed);
    }
}
