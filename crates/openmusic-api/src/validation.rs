//! Request body validation.
//!
//! [`ValidJson`] replaces `Json` in handlers: malformed bodies and failed
//! checks both surface as `ApiError::Validation` (400).

use axum::{
    Json,
    extract::{FromRequest, Request},
};
use serde::de::DeserializeOwned;

use openmusic_types::api::{
    AlbumRequest, CollaborationRequest, ExportPlaylistRequest, LoginRequest, PlaylistRequest,
    PlaylistSongRequest, RefreshTokenRequest, RegisterRequest, SongRequest,
};

use crate::error::ApiError;

pub const MAX_YEAR: i32 = 2099;
const MAX_USERNAME_LEN: usize = 50;

pub trait Validate {
    fn validate(&self) -> Result<(), ApiError>;
}

/// JSON body that has passed [`Validate`].
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|e| ApiError::validation(e.body_text()))?;
        value.validate()?;
        Ok(Self(value))
    }
}

fn required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::validation(format!("{field} is required")));
    }
    Ok(())
}

fn year(value: i32) -> Result<(), ApiError> {
    if value > MAX_YEAR {
        return Err(ApiError::validation(format!("year must not be later than {MAX_YEAR}")));
    }
    Ok(())
}

/// Syntactic check only: one `@`, a non-empty local part and a dotted domain.
pub fn is_email(value: &str) -> bool {
    if value.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && domain.split('.').all(|label| !label.is_empty())
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("username", &self.username)?;
        required("password", &self.password)?;
        required("fullname", &self.fullname)?;
        if self.username.chars().count() > MAX_USERNAME_LEN {
            return Err(ApiError::validation(format!(
                "username must be at most {MAX_USERNAME_LEN} characters"
            )));
        }
        Ok(())
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("username", &self.username)?;
        required("password", &self.password)
    }
}

impl Validate for RefreshTokenRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("refreshToken", &self.refresh_token)
    }
}

impl Validate for AlbumRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("name", &self.name)?;
        year(self.year)
    }
}

impl Validate for SongRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("title", &self.title)?;
        required("performer", &self.performer)?;
        required("genre", &self.genre)?;
        year(self.year)?;
        if matches!(self.duration, Some(d) if d < 0) {
            return Err(ApiError::validation("duration must not be negative"));
        }
        Ok(())
    }
}

impl Validate for PlaylistRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("name", &self.name)
    }
}

impl Validate for PlaylistSongRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("songId", &self.song_id)
    }
}

impl Validate for CollaborationRequest {
    fn validate(&self) -> Result<(), ApiError> {
        required("playlistId", &self.playlist_id)?;
        required("userId", &self.user_id)
    }
}

impl Validate for ExportPlaylistRequest {
    fn validate(&self) -> Result<(), ApiError> {
        if !is_email(&self.target_email) {
            return Err(ApiError::validation("targetEmail must be a valid email"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_syntax() {
        assert!(is_email("alice@example.com"));
        assert!(is_email("a.b+tag@mail.example.co.id"));

        assert!(!is_email("not-an-email"));
        assert!(!is_email("@example.com"));
        assert!(!is_email("alice@localhost"));
        assert!(!is_email("alice@example..com"));
        assert!(!is_email("alice@@example.com"));
        assert!(!is_email("alice @example.com"));
    }

    #[test]
    fn year_is_capped() {
        let album = AlbumRequest {
            name: "Future".into(),
            year: 2100,
        };
        assert!(matches!(album.validate(), Err(ApiError::Validation(_))));

        let album = AlbumRequest {
            name: "Ghost Stories".into(),
            year: 2014,
        };
        album.validate().unwrap();
    }

    #[test]
    fn blank_strings_are_rejected() {
        let song = SongRequest {
            title: "  ".into(),
            year: 2008,
            performer: "Coldplay".into(),
            genre: "Pop".into(),
            duration: None,
            album_id: None,
        };
        assert!(matches!(song.validate(), Err(ApiError::Validation(_))));
    }
}
