//! # ACS Streamer (acs-streamer)
//!
//! Delivers audio files to WebSocket clients as paced binary chunks under
//! explicit start/stop control. Each connection gets its own
//! [`session::Session`]; a `start` spawns a transfer worker and supersedes any
//! transfer already running on that connection.

pub mod api;
pub mod error;
pub mod library;
pub mod session;
pub mod state;

pub use error::{ApiError, StreamError};
pub use library::{AudioLibrary, AudioSource};
pub use session::{Session, StreamSettings, StreamState};
pub use state::SharedState;

use acs_common::config::TomlConfig;
use axum::{routing::get, Router};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Audio files offered for streaming
    pub library: Arc<AudioLibrary>,
    /// Transfer tuning handed to every new session
    pub settings: StreamSettings,
    /// Directory served for unmatched GET paths
    pub static_dir: PathBuf,
    /// Server-wide counters
    pub shared: Arc<SharedState>,
}

impl AppState {
    pub fn new(library: AudioLibrary, settings: StreamSettings, static_dir: PathBuf) -> Self {
        Self {
            library: Arc::new(library),
            settings,
            static_dir,
            shared: Arc::new(SharedState::new()),
        }
    }

    /// Build state from resolved configuration
    pub fn from_config(config: &TomlConfig) -> Self {
        Self::new(
            AudioLibrary::new(&config.resource_dir, &config.streaming.extensions),
            StreamSettings::from(&config.streaming),
            config.static_dir.clone(),
        )
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/ws", get(api::ws_handler))
        .merge(api::audio_routes())
        .merge(api::health_routes())
        .fallback_service(static_files)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
