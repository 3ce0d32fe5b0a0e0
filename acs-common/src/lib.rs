//! # ACS Common Library
//!
//! Shared code for the audio chunk streamer:
//! - Wire protocol types (control and status messages)
//! - Bootstrap configuration loading
//! - Common error type

pub mod config;
pub mod error;
pub mod protocol;

pub use error::{Error, Result};
pub use protocol::{ControlMessage, ServerMessage};
