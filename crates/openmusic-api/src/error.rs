use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Everything a handler can fail with. Client faults render as
/// `{"status":"fail"}`, server faults as `{"status":"error"}` with a
/// generic message; the cause is only logged.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Unauthenticated(String),

    #[error("{0}")]
    PayloadTooLarge(String),

    #[error(transparent)]
    Db(#[from] openmusic_db::Error),

    #[error("token error: {0}")]
    Token(#[from] jsonwebtoken::errors::Error),

    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    #[error("{0}")]
    Internal(String),
}

#[derive(Serialize)]
struct ErrorBody {
    status: &'static str,
    message: String,
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn unauthenticated(msg: impl Into<String>) -> Self {
        Self::Unauthenticated(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        use openmusic_db::Error as Db;

        match self {
            Self::Validation(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) => StatusCode::UNAUTHORIZED,
            Self::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Db(Db::NotFound(_)) => StatusCode::NOT_FOUND,
            Self::Db(Db::Conflict(_)) => StatusCode::CONFLICT,
            Self::Db(Db::Forbidden(_)) => StatusCode::FORBIDDEN,
            Self::Db(_) | Self::Token(_) | Self::Storage(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = if status.is_server_error() {
            error!("Request failed: {}", self);
            ErrorBody {
                status: "error",
                message: "internal server error".into(),
            }
        } else {
            ErrorBody {
                status: "fail",
                message: self.to_string(),
            }
        };

        (status, Json(body)).into_response()
    }
}
