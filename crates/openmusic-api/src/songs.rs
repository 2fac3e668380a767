use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;

use openmusic_db::models::SongFields;
use openmusic_types::api::{ApiResponse, SongCreated, SongQuery, SongRequest};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::ValidJson;

fn song_fields(req: SongRequest) -> SongFields {
    SongFields {
        title: req.title,
        year: req.year,
        performer: req.performer,
        genre: req.genre,
        duration: req.duration,
        album_id: req.album_id,
    }
}

/// POST /songs
pub async fn create_song(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<SongRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = song_fields(req);
    let song_id = state.db(move |db| db.create_song(&fields)).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("song added", SongCreated { song_id })),
    ))
}

/// GET /songs?title=&performer=
pub async fn list_songs(
    State(state): State<AppState>,
    Query(query): Query<SongQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let songs = state
        .db(move |db| db.list_songs(query.title.as_deref(), query.performer.as_deref()))
        .await?;
    Ok(Json(ApiResponse::data(json!({ "songs": songs }))))
}

/// GET /songs/{id}
pub async fn get_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let song = state.db(move |db| db.get_song(&id)).await?;
    Ok(Json(ApiResponse::data(json!({ "song": song }))))
}

/// PUT /songs/{id}
pub async fn update_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(req): ValidJson<SongRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let fields = song_fields(req);
    state.db(move |db| db.update_song(&id, &fields)).await?;
    Ok(Json(ApiResponse::<()>::message("song updated")))
}

/// DELETE /songs/{id}
pub async fn delete_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    state.db(move |db| db.delete_song(&id)).await?;
    Ok(Json(ApiResponse::<()>::message("song deleted")))
}
