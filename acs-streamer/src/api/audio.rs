//! Audio listing endpoints

use axum::{extract::State, routing::get, Json, Router};
use std::sync::Arc;
use tracing::error;

use crate::error::{ApiError, ApiResult};
use crate::library::{AudioFile, AudioLibrary};
use crate::AppState;

/// GET /audios - names of playable files
pub async fn list_audio_names(State(state): State<AppState>) -> ApiResult<Json<Vec<String>>> {
    let names = read_library(&state.library, |library| library.list()).await?;
    Ok(Json(names))
}

/// GET /api/audio/list - playable files with size and duration
pub async fn list_audio_files(State(state): State<AppState>) -> ApiResult<Json<Vec<AudioFile>>> {
    let files = read_library(&state.library, |library| library.entries()).await?;
    Ok(Json(files))
}

/// Run a blocking directory read off the async runtime
async fn read_library<T, F>(library: &Arc<AudioLibrary>, read: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&AudioLibrary) -> acs_common::Result<T> + Send + 'static,
{
    let library = Arc::clone(library);
    let root = library.root().to_path_buf();
    tokio::task::spawn_blocking(move || read(&library))
        .await
        .map_err(|e| ApiError::Internal(e.to_string()))?
        .map_err(|e| {
            error!("Failed to read audio directory {}: {}", root.display(), e);
            ApiError::Internal("Failed to read audio directory".to_string())
        })
}

/// Build audio listing routes
pub fn audio_routes() -> Router<AppState> {
    Router::new()
        .route("/audios", get(list_audio_names))
        .route("/api/audio/list", get(list_audio_files))
}
