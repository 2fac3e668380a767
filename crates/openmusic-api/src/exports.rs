//! Export producer: checks access, then hands the work to the queue.

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::{error, info};

use openmusic_types::api::{ApiResponse, Claims, ExportPlaylistRequest};
use openmusic_types::events::{EXPORT_QUEUE, ExportRequest};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::ValidJson;

/// Enqueue an export of `playlist_id` for `principal_id`. Nothing is
/// published unless the principal may read the playlist.
pub async fn request_export(
    state: &AppState,
    playlist_id: &str,
    principal_id: &str,
    target_email: &str,
) -> Result<(), ApiError> {
    let (id, principal) = (playlist_id.to_string(), principal_id.to_string());
    state
        .db(move |db| db.authorize_collaborator(&id, &principal))
        .await?;

    let payload = ExportRequest {
        playlist_id: playlist_id.to_string(),
        target_email: target_email.to_string(),
    }
    .to_bytes()
    .map_err(|e| ApiError::Internal(format!("failed to encode export request: {e}")))?;

    let queue = state.queue.clone();
    tokio::task::spawn_blocking(move || queue.publish(EXPORT_QUEUE, &payload))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })??;

    info!("Export of playlist {} requested by {}", playlist_id, principal_id);
    Ok(())
}

/// POST /export/playlists/{id}
pub async fn export_playlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(playlist_id): Path<String>,
    ValidJson(req): ValidJson<ExportPlaylistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request_export(&state, &playlist_id, &claims.sub, &req.target_email).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::<()>::message("your request is being processed")),
    ))
}
