use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode, header},
    response::IntoResponse,
};
use tracing::{error, info, warn};

use openmusic_types::api::{AlbumCreated, AlbumRequest, ApiResponse};
use openmusic_types::models::Album;

use crate::covers::{MAX_COVER_BYTES, image_extension};
use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::ValidJson;

/// POST /albums
pub async fn create_album(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<AlbumRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let album_id = state.db(move |db| db.create_album(&req.name, req.year)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("album added", AlbumCreated { album_id })),
    ))
}

/// GET /albums/{id}
pub async fn get_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (row, songs) = state
        .db(move |db| Ok((db.get_album(&id)?, db.get_album_songs(&id)?)))
        .await?;

    let album = Album {
        cover_url: row.cover.as_deref().map(|name| state.covers.url(name)),
        id: row.id,
        name: row.name,
        year: row.year,
        songs,
    };
    Ok(Json(ApiResponse::data(serde_json::json!({ "album": album }))))
}

/// PUT /albums/{id}
pub async fn update_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<AlbumRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db(move |db| db.update_album(&id, &req.name, req.year))
        .await?;
    Ok(Json(ApiResponse::<()>::message("album updated")))
}

/// DELETE /albums/{id}
pub async fn delete_album(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let cover = state
        .db(move |db| {
            let row = db.get_album(&id)?;
            db.delete_album(&id)?;
            Ok(row.cover)
        })
        .await?;

    if let Some(name) = cover {
        if let Err(e) = state.covers.delete(&name).await {
            warn!("Failed to remove cover {} of deleted album: {}", name, e);
        }
    }
    Ok(Json(ApiResponse::<()>::message("album deleted")))
}

/// POST /albums/{id}/covers with the raw image as body, typed by Content-Type.
pub async fn upload_cover(
    State(state): State<AppState>,
    Path(album_id): Path<String>,
    headers: HeaderMap,
    bytes: Bytes,
) -> Result<impl IntoResponse, ApiError> {
    let extension = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(image_extension)
        .ok_or_else(|| ApiError::validation("cover must be an image"))?;

    if bytes.is_empty() {
        return Err(ApiError::validation("cover is empty"));
    }
    if bytes.len() > MAX_COVER_BYTES {
        return Err(ApiError::PayloadTooLarge(format!(
            "cover must be at most {MAX_COVER_BYTES} bytes"
        )));
    }

    // Fail before touching storage if the album is gone
    let id = album_id.clone();
    state.db(move |db| db.get_album(&id)).await?;

    let name = state.covers.write(&album_id, extension, &bytes).await?;

    let (id, stored) = (album_id.clone(), name.clone());
    let previous = match state.db(move |db| db.replace_album_cover(&id, &stored)).await {
        Ok(previous) => previous,
        Err(e) => {
            if let Err(cleanup) = state.covers.delete(&name).await {
                error!("Failed to remove orphaned cover {}: {}", name, cleanup);
            }
            return Err(e);
        }
    };

    if let Some(old) = previous {
        if let Err(e) = state.covers.delete(&old).await {
            warn!("Failed to remove replaced cover {}: {}", old, e);
        }
    }

    info!("Album {} cover replaced with {}", album_id, name);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::<()>::message("cover uploaded")),
    ))
}
