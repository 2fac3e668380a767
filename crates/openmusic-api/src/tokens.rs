use std::time::Duration;

use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};

use openmusic_db::ids;
use openmusic_types::api::Claims;

use crate::error::ApiError;

/// Refresh tokens are revoked by deleting them from storage; the expiry
/// only bounds how long a forgotten one stays usable.
const REFRESH_TOKEN_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Signs and verifies the two token kinds. Access and refresh tokens use
/// separate keys, so neither verifies as the other.
pub struct TokenService {
    access_key: String,
    refresh_key: String,
    access_age: Duration,
}

impl TokenService {
    pub fn new(access_key: impl Into<String>, refresh_key: impl Into<String>, access_age: Duration) -> Self {
        Self {
            access_key: access_key.into(),
            refresh_key: refresh_key.into(),
            access_age,
        }
    }

    pub fn issue_access(&self, user_id: &str) -> Result<String, ApiError> {
        sign(&self.access_key, user_id, self.access_age)
    }

    pub fn issue_refresh(&self, user_id: &str) -> Result<String, ApiError> {
        sign(&self.refresh_key, user_id, REFRESH_TOKEN_AGE)
    }

    /// Expired or foreign tokens are `Unauthenticated`.
    pub fn verify_access(&self, token: &str) -> Result<Claims, ApiError> {
        verify(&self.access_key, token).map_err(|_| ApiError::unauthenticated("invalid access token"))
    }

    /// A bad refresh token is a client input error, not an auth failure.
    pub fn verify_refresh(&self, token: &str) -> Result<Claims, ApiError> {
        verify(&self.refresh_key, token).map_err(|_| ApiError::validation("invalid refresh token"))
    }
}

fn sign(key: &str, user_id: &str, age: Duration) -> Result<String, ApiError> {
    let age = chrono::Duration::from_std(age).map_err(|e| ApiError::Internal(e.to_string()))?;
    let claims = Claims {
        sub: user_id.to_string(),
        exp: (chrono::Utc::now() + age).timestamp() as usize,
        jti: Some(ids::generate("token")),
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(key.as_bytes()),
    )?;
    Ok(token)
}

fn verify(key: &str, token: &str) -> jsonwebtoken::errors::Result<Claims> {
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(key.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> TokenService {
        TokenService::new("access-secret", "refresh-secret", Duration::from_secs(1800))
    }

    #[test]
    fn access_token_round_trip() {
        let tokens = service();
        let token = tokens.issue_access("user-1").unwrap();
        assert_eq!(tokens.verify_access(&token).unwrap().sub, "user-1");
    }

    #[test]
    fn keys_are_not_interchangeable() {
        let tokens = service();
        let refresh = tokens.issue_refresh("user-1").unwrap();
        let access = tokens.issue_access("user-1").unwrap();

        assert!(matches!(tokens.verify_access(&refresh), Err(ApiError::Unauthenticated(_))));
        assert!(matches!(tokens.verify_refresh(&access), Err(ApiError::Validation(_))));
    }

    #[test]
    fn every_refresh_token_is_distinct() {
        let tokens = service();
        assert_ne!(
            tokens.issue_refresh("user-1").unwrap(),
            tokens.issue_refresh("user-1").unwrap()
        );
    }

    #[test]
    fn expired_access_token_is_rejected() {
        let tokens = service();
        let claims = Claims {
            sub: "user-1".into(),
            // well past the default 60s leeway
            exp: (chrono::Utc::now().timestamp() - 3600) as usize,
            jti: None,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"access-secret"),
        )
        .unwrap();

        assert!(matches!(tokens.verify_access(&token), Err(ApiError::Unauthenticated(_))));
    }
}
