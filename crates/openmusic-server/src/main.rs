mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::{
    Method,
    header::{AUTHORIZATION, CONTENT_TYPE},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use openmusic_api::cache::MokaCache;
use openmusic_api::covers::CoverStorage;
use openmusic_api::likes::LikeCounter;
use openmusic_api::tokens::TokenService;
use openmusic_api::{AppState, AppStateInner};
use openmusic_db::Database;
use openmusic_db::queue::{QueueTransport, SqliteQueue};
use openmusic_types::events::EXPORT_QUEUE;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openmusic=debug,openmusic_api=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database, queue and cover storage
    let db = Arc::new(Database::open(&config.db_path)?);
    let queue = Arc::new(SqliteQueue::new(db.clone()));
    queue.declare(EXPORT_QUEUE)?;
    let covers = CoverStorage::new(config.upload_dir.clone(), config.public_url.clone()).await?;

    let cache = Arc::new(MokaCache::new(config.cache_capacity));
    let state: AppState = Arc::new(AppStateInner {
        db: db.clone(),
        tokens: TokenService::new(
            config.access_token_key,
            config.refresh_token_key,
            config.access_token_age,
        ),
        likes: LikeCounter::new(db, cache, config.cache_ttl),
        covers,
        queue,
    });

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::any())
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .allow_credentials(false);

    let app = openmusic_api::router(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("OpenMusic server listening on {}", addr);
    info!("Covers served from {}", config.upload_dir.display());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
                .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
            _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
