use axum::{
    Extension, Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::info;

use openmusic_types::api::{
    ApiResponse, Claims, PlaylistActivities, PlaylistCreated, PlaylistRequest, PlaylistSongRequest,
};
use openmusic_types::models::ActivityAction;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::ValidJson;

/// POST /playlists
pub async fn create_playlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidJson(req): ValidJson<PlaylistRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist_id = state
        .db(move |db| db.create_playlist(&req.name, &claims.sub))
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "playlist added",
            PlaylistCreated { playlist_id },
        )),
    ))
}

/// GET /playlists: playlists owned by or shared with the caller.
pub async fn list_playlists(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, ApiError> {
    let playlists = state.db(move |db| db.list_playlists_for(&claims.sub)).await?;
    Ok(Json(ApiResponse::data(json!({ "playlists": playlists }))))
}

/// DELETE /playlists/{id}, owner only.
pub async fn delete_playlist(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(playlist_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db(move |db| {
            db.authorize_owner(&playlist_id, &claims.sub)?;
            db.delete_playlist(&playlist_id)
        })
        .await?;
    Ok(Json(ApiResponse::<()>::message("playlist deleted")))
}

/// POST /playlists/{id}/songs
pub async fn add_song(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(playlist_id): Path<String>,
    ValidJson(req): ValidJson<PlaylistSongRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db(move |db| {
            db.authorize_collaborator(&playlist_id, &claims.sub)?;
            db.add_playlist_song(&playlist_id, &req.song_id)?;
            db.record_activity(&playlist_id, &req.song_id, &claims.sub, ActivityAction::Add)
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::<()>::message("song added to playlist")),
    ))
}

/// GET /playlists/{id}/songs
pub async fn list_songs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(playlist_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let playlist = state
        .db(move |db| {
            db.authorize_collaborator(&playlist_id, &claims.sub)?;
            db.get_playlist_songs(&playlist_id)
        })
        .await?;
    Ok(Json(ApiResponse::data(json!({ "playlist": playlist }))))
}

/// DELETE /playlists/{id}/songs
pub async fn remove_song(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(playlist_id): Path<String>,
    ValidJson(req): ValidJson<PlaylistSongRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db(move |db| {
            db.authorize_collaborator(&playlist_id, &claims.sub)?;
            db.remove_playlist_song(&playlist_id, &req.song_id)?;
            db.record_activity(&playlist_id, &req.song_id, &claims.sub, ActivityAction::Delete)
        })
        .await?;
    Ok(Json(ApiResponse::<()>::message("song removed from playlist")))
}

/// GET /playlists/{id}/activities
pub async fn list_activities(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(playlist_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = playlist_id.clone();
    let activities = state
        .db(move |db| {
            db.authorize_collaborator(&id, &claims.sub)?;
            db.list_activities(&id)
        })
        .await?;

    info!("Served {} activities for playlist {}", activities.len(), playlist_id);
    Ok(Json(ApiResponse::data(PlaylistActivities {
        playlist_id,
        activities,
    })))
}
