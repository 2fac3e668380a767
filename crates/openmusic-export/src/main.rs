use std::sync::Arc;

use tracing::info;

use openmusic_db::Database;
use openmusic_db::queue::{QueueTransport, SqliteQueue};
use openmusic_export::{ExportWorker, HttpMailer};
use openmusic_types::events::EXPORT_QUEUE;

use crate::config::Config;

mod config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "openmusic_export=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    let db = Arc::new(Database::open(&config.db_path)?);
    let queue = Arc::new(SqliteQueue::new(db.clone()));
    queue.declare(EXPORT_QUEUE)?;

    let mailer = Arc::new(HttpMailer::new(
        config.mail_api_url,
        config.mail_api_key,
        config.mail_sender,
    ));

    let worker = ExportWorker::new(db, queue, mailer, config.poll_interval);
    worker.run(shutdown_signal()).await;

    info!("Export consumer exited");
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
            _ = ctrl_c => info!("Received Ctrl+C, finishing current export..."),
            _ = sigterm.recv() => info!("Received SIGTERM, finishing current export..."),
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, finishing current export...");
    }
}
