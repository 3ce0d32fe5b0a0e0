//! HTTP and WebSocket endpoints

pub mod audio;
pub mod health;
pub mod ws;

pub use audio::{audio_routes, list_audio_files, list_audio_names};
pub use health::{health_check, health_routes};
pub use ws::ws_handler;
