//! WebSocket endpoint
//!
//! One [`Session`] per upgraded connection. The socket is split: the write
//! half becomes the session's frame sink, the read half drives the receive
//! loop below.

use crate::error::{Result, StreamError};
use crate::session::{Frame, FrameSink, Session};
use crate::AppState;
use async_trait::async_trait;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Write half of an axum WebSocket
pub struct WsSink(SplitSink<WebSocket, Message>);

#[async_trait]
impl FrameSink for WsSink {
    async fn send_frame(&mut self, frame: Frame) -> Result<()> {
        let message = match frame {
            Frame::Text(text) => Message::Text(text),
            Frame::Binary(bytes) => Message::Binary(bytes),
        };
        self.0
            .send(message)
            .await
            .map_err(|e| StreamError::Transport(e.to_string()))
    }
}

/// GET /ws
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let (sink, mut stream) = socket.split();
    let _open = state.shared.session_opened();

    let mut session = Session::new(
        WsSink(sink),
        Arc::clone(&state.library),
        state.settings.clone(),
    )
    .with_stats(Arc::clone(&state.shared));
    let id = session.id();
    info!(session = %id, "New WebSocket connection established");

    while let Some(received) = stream.next().await {
        match received {
            Ok(Message::Text(text)) => {
                if let Err(e) = session.handle_text(&text).await {
                    warn!(session = %id, "Connection unusable: {}", e);
                    break;
                }
            }
            Ok(Message::Binary(_)) => debug!(session = %id, "Ignoring inbound binary frame"),
            Ok(Message::Close(_)) => break,
            // Ping/pong replies are handled by axum
            Ok(_) => {}
            Err(e) => {
                warn!(session = %id, "Error reading message: {}", e);
                break;
            }
        }
    }

    session.close().await;
    info!(session = %id, "WebSocket connection closed");
}
