use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::SaltString,
};
use rand_core::OsRng;
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use openmusic_db::Error as DbError;
use openmusic_types::api::{
    AccessToken, ApiResponse, LoginRequest, RefreshTokenRequest, RegisterRequest, TokenPair,
    UserCreated,
};
use openmusic_types::models::User;

use crate::error::ApiError;
use crate::state::AppState;
use crate::validation::ValidJson;

/// Argon2id PHC string with a fresh random salt.
fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("password hashing failed: {e}")))?;
    Ok(hash.to_string())
}

fn verify_password(stored: &str, password: &str) -> Result<bool, ApiError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| ApiError::Internal(format!("stored password hash is invalid: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// POST /users
pub async fn register(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password_hash = hash_password(&req.password)?;

    let user_id = state
        .db(move |db| db.create_user(&req.username, &password_hash, &req.fullname))
        .await?;

    info!("Registered user {}", user_id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message("user added", UserCreated { user_id })),
    ))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let row = state
        .db(move |db| db.get_user_by_id(&id)?.ok_or_else(|| DbError::not_found("user not found")))
        .await?;

    let user = User {
        id: row.id,
        username: row.username,
        fullname: row.fullname,
    };
    Ok(Json(ApiResponse::data(serde_json::json!({ "user": user }))))
}

/// POST /authentications
pub async fn login(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let username = req.username.clone();
    let user = state
        .db(move |db| db.get_user_by_username(&username))
        .await?
        .ok_or_else(|| ApiError::unauthenticated("invalid username or password"))?;

    if !verify_password(&user.password, &req.password)? {
        return Err(ApiError::unauthenticated("invalid username or password"));
    }

    let access_token = state.tokens.issue_access(&user.id)?;
    let refresh_token = state.tokens.issue_refresh(&user.id)?;

    let stored = refresh_token.clone();
    state.db(move |db| db.save_refresh_token(&stored)).await?;

    info!("User {} logged in", user.id);
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::with_message(
            "authentication added",
            TokenPair {
                access_token,
                refresh_token,
            },
        )),
    ))
}

/// PUT /authentications
pub async fn refresh(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = req.refresh_token.clone();
    if !state.db(move |db| db.refresh_token_exists(&token)).await? {
        return Err(ApiError::validation("invalid refresh token"));
    }

    let claims = state.tokens.verify_refresh(&req.refresh_token)?;
    let access_token = state.tokens.issue_access(&claims.sub)?;

    Ok(Json(ApiResponse::with_message(
        "access token refreshed",
        AccessToken { access_token },
    )))
}

/// DELETE /authentications
pub async fn logout(
    State(state): State<AppState>,
    ValidJson(req): ValidJson<RefreshTokenRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = req.refresh_token;
    if !state.db(move |db| db.delete_refresh_token(&token)).await? {
        return Err(ApiError::validation("invalid refresh token"));
    }

    Ok(Json(ApiResponse::<()>::message("refresh token deleted")))
}
