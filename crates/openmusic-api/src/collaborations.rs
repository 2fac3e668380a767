use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};

use openmusic_types::api::{ApiResponse, Claims, CollaborationCreated, CollaborationRequest};

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::ValidJson;

/// POST /collaborations: the owner grants access to another user.
pub async fn add_collaborator(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidJson(req): ValidJson<CollaborationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let collaboration_id = state
        .db(move |db| {
            db.authorize_owner(&req.playlist_id, &claims.sub)?;
            db.add_collaborator(&req.playlist_id, &req.user_id)
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "collaboration added",
            CollaborationCreated { collaboration_id },
        )),
    ))
}

/// DELETE /collaborations
pub async fn remove_collaborator(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ValidJson(req): ValidJson<CollaborationRequest>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .db(move |db| {
            db.authorize_owner(&req.playlist_id, &claims.sub)?;
            db.remove_collaborator(&req.playlist_id, &req.user_id)
        })
        .await?;
    Ok(Json(ApiResponse::<()>::message("collaboration deleted")))
}
