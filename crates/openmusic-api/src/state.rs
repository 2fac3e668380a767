use std::sync::Arc;

use tracing::error;

use openmusic_db::Database;
use openmusic_db::queue::QueueTransport;

use crate::covers::CoverStorage;
use crate::error::ApiError;
use crate::likes::LikeCounter;
use crate::tokens::TokenService;

pub type AppState = Arc<AppStateInner>;

/// Service objects shared by every handler, built once at startup.
pub struct AppStateInner {
    pub db: Arc<Database>,
    pub tokens: TokenService,
    pub likes: LikeCounter,
    pub covers: CoverStorage,
    pub queue: Arc<dyn QueueTransport>,
}

impl AppStateInner {
    /// Run a store call on the blocking pool.
    pub async fn db<F, T>(&self, f: F) -> Result<T, ApiError>
    where
        F: FnOnce(&Database) -> openmusic_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        run_blocking(self.db.clone(), f).await
    }
}

pub async fn run_blocking<F, T>(db: Arc<Database>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> openmusic_db::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let value = tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(e.to_string())
        })??;
    Ok(value)
}
