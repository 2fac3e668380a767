//! Read-through cache for album like counts.
//!
//! Counts are cached per album and invalidated on every toggle, never
//! updated in place, so the first read after a toggle always recomputes.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Extension, Json,
    extract::{Path, State},
    http::{HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
};
use tracing::{debug, warn};

use openmusic_db::Database;
use openmusic_db::models::LikeToggle;
use openmusic_types::api::{ApiResponse, Claims, LikeCount};

use crate::cache::CacheStore;
use crate::error::ApiError;
use crate::state::{AppState, run_blocking};

pub const DATA_SOURCE_HEADER: HeaderName = HeaderName::from_static("x-data-source");

/// Where a count came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountSource {
    Cache,
    Store,
}

pub struct LikeCounter {
    db: Arc<Database>,
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

fn cache_key(album_id: &str) -> String {
    format!("album-likes:{album_id}")
}

impl LikeCounter {
    pub fn new(db: Arc<Database>, cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { db, cache, ttl }
    }

    pub async fn toggle(&self, album_id: &str, user_id: &str) -> Result<LikeToggle, ApiError> {
        let (album, user) = (album_id.to_string(), user_id.to_string());
        let outcome = run_blocking(self.db.clone(), move |db| db.toggle_album_like(&album, &user)).await?;

        // The toggle is committed; a failed invalidation only leaves a stale
        // count until the entry expires.
        if let Err(e) = self.cache.delete(&cache_key(album_id)).await {
            warn!("Failed to invalidate like count for {}: {}", album_id, e);
        }
        Ok(outcome)
    }

    pub async fn count(&self, album_id: &str) -> Result<(u64, CountSource), ApiError> {
        let key = cache_key(album_id);

        match self.cache.get(&key).await {
            Ok(Some(raw)) => match raw.parse::<u64>() {
                Ok(n) => return Ok((n, CountSource::Cache)),
                Err(_) => warn!("Discarding unparsable cached count for {}", album_id),
            },
            Ok(None) => {}
            Err(e) => warn!("Like count cache read failed, using store: {}", e),
        }

        let album = album_id.to_string();
        let n = run_blocking(self.db.clone(), move |db| db.count_album_likes(&album)).await?;

        if let Err(e) = self.cache.set(&key, n.to_string(), self.ttl).await {
            warn!("Failed to cache like count for {}: {}", album_id, e);
        }
        debug!("Like count for {} computed from store", album_id);
        Ok((n, CountSource::Store))
    }
}

/// POST /albums/{id}/likes
pub async fn toggle_like(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    Path(album_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let message = match state.likes.toggle(&album_id, &claims.sub).await? {
        LikeToggle::Liked => "album liked",
        LikeToggle::Unliked => "album unliked",
    };
    Ok((StatusCode::CREATED, Json(ApiResponse::<()>::message(message))))
}

/// GET /albums/{id}/likes
pub async fn get_likes(
    State(state): State<AppState>,
    Path(album_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let (likes, source) = state.likes.count(&album_id).await?;

    let mut response = Json(ApiResponse::data(LikeCount { likes })).into_response();
    if source == CountSource::Cache {
        response
            .headers_mut()
            .insert(DATA_SOURCE_HEADER, HeaderValue::from_static("cache"));
    }
    Ok(response)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;

    use super::*;
    use crate::cache::{CacheError, MokaCache};

    /// Every operation fails; the counter must keep answering from the store.
    struct FailingCache {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl CacheStore for FailingCache {
        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError("down".into()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError("down".into()))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(CacheError("down".into()))
        }
    }

    fn setup(cache: Arc<dyn CacheStore>) -> (LikeCounter, String, String) {
        let db = Arc::new(Database::open_in_memory().unwrap());
        let user = db.create_user("alice", "h", "Alice").unwrap();
        let album = db.create_album("Ghost Stories", 2014).unwrap();
        (LikeCounter::new(db, cache, Duration::from_secs(1800)), album, user)
    }

    #[tokio::test]
    async fn second_read_is_served_from_cache() {
        let (likes, album, user) = setup(Arc::new(MokaCache::new(16)));
        likes.toggle(&album, &user).await.unwrap();

        assert_eq!(likes.count(&album).await.unwrap(), (1, CountSource::Store));
        assert_eq!(likes.count(&album).await.unwrap(), (1, CountSource::Cache));
    }

    #[tokio::test]
    async fn toggle_invalidates_the_cached_count() {
        let (likes, album, user) = setup(Arc::new(MokaCache::new(16)));

        assert_eq!(likes.count(&album).await.unwrap().0, 0);
        assert_eq!(likes.toggle(&album, &user).await.unwrap(), LikeToggle::Liked);
        assert_eq!(likes.count(&album).await.unwrap(), (1, CountSource::Store));

        assert_eq!(likes.toggle(&album, &user).await.unwrap(), LikeToggle::Unliked);
        assert_eq!(likes.count(&album).await.unwrap(), (0, CountSource::Store));
    }

    #[tokio::test]
    async fn cache_failures_fall_back_to_the_store() {
        let cache = Arc::new(FailingCache {
            calls: AtomicUsize::new(0),
        });
        let (likes, album, user) = setup(cache.clone());

        likes.toggle(&album, &user).await.unwrap();
        assert_eq!(likes.count(&album).await.unwrap(), (1, CountSource::Store));
        assert_eq!(likes.count(&album).await.unwrap(), (1, CountSource::Store));
        assert!(cache.calls.load(Ordering::SeqCst) >= 5);
    }

    #[tokio::test]
    async fn toggling_a_missing_album_is_not_found() {
        let (likes, _, user) = setup(Arc::new(MokaCache::new(16)));
        assert!(matches!(
            likes.toggle("album-missing", &user).await,
            Err(ApiError::Db(openmusic_db::Error::NotFound(_)))
        ));
    }
}
