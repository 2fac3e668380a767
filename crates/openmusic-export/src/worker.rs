//! Export consumer: turns queued export requests into emails.
//!
//! Messages are handled one at a time and received with
//! [`AckMode::Auto`], so a message whose processing fails is logged and
//! dropped rather than retried.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tracing::{error, info, warn};

use openmusic_db::Database;
use openmusic_db::queue::{AckMode, Delivery, QueueTransport};
use openmusic_types::events::{EXPORT_QUEUE, ExportRequest, ExportedPlaylist, PlaylistExport};

use crate::mail::{Attachment, Mail, MailDispatcher, MailError};

pub const ATTACHMENT_NAME: &str = "playlist.json";

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("malformed export message: {0}")]
    Decode(#[from] serde_json::Error),

    #[error(transparent)]
    Db(#[from] openmusic_db::Error),

    #[error(transparent)]
    Mail(#[from] MailError),

    #[error("blocking task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// What happened to one export request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Sent,
    /// The playlist was deleted after the request was queued.
    PlaylistGone,
}

pub struct ExportWorker {
    db: Arc<Database>,
    queue: Arc<dyn QueueTransport>,
    mailer: Arc<dyn MailDispatcher>,
    poll_interval: Duration,
}

impl ExportWorker {
    pub fn new(
        db: Arc<Database>,
        queue: Arc<dyn QueueTransport>,
        mailer: Arc<dyn MailDispatcher>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            db,
            queue,
            mailer,
            poll_interval,
        }
    }

    /// Consume until `shutdown` resolves. Shutdown is only observed between
    /// messages, never in the middle of one.
    pub async fn run<F>(&self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::pin!(shutdown);
        info!("Export worker consuming {}", EXPORT_QUEUE);

        loop {
            let handled = match self.poll_once().await {
                Ok(handled) => handled,
                Err(e) => {
                    error!("Failed to receive from {}: {}", EXPORT_QUEUE, e);
                    false
                }
            };

            // Drain without pausing; back off only when idle
            let pause = if handled { Duration::ZERO } else { self.poll_interval };
            tokio::select! {
                biased;
                _ = &mut shutdown => {
                    info!("Export worker stopped");
                    return;
                }
                _ = tokio::time::sleep(pause) => {}
            }
        }
    }

    /// Handle at most one message. Returns `false` if the queue was empty.
    /// Processing failures are logged here; only receive failures escape.
    pub async fn poll_once(&self) -> Result<bool, ExportError> {
        let Some(delivery) = self.receive().await? else {
            return Ok(false);
        };

        match self.process(&delivery.payload).await {
            Ok(Outcome::Sent) => info!("Export message {} delivered", delivery.id),
            Ok(Outcome::PlaylistGone) => {}
            Err(e) => error!("Export message {} failed: {}", delivery.id, e),
        }
        Ok(true)
    }

    async fn receive(&self) -> Result<Option<Delivery>, ExportError> {
        let queue = self.queue.clone();
        let delivery = tokio::task::spawn_blocking(move || queue.receive(EXPORT_QUEUE, AckMode::Auto)).await??;
        Ok(delivery)
    }

    /// Snapshot the playlist and mail it to the requested address.
    pub async fn process(&self, payload: &[u8]) -> Result<Outcome, ExportError> {
        let request = ExportRequest::from_bytes(payload)?;

        let db = self.db.clone();
        let id = request.playlist_id.clone();
        let detail = tokio::task::spawn_blocking(move || db.find_playlist_songs(&id)).await??;

        let Some(detail) = detail else {
            warn!(
                "Playlist {} no longer exists, dropping export to {}",
                request.playlist_id, request.target_email
            );
            return Ok(Outcome::PlaylistGone);
        };

        let subject = format!("Playlist export: {}", detail.name);
        let song_count = detail.songs.len();
        let document = PlaylistExport {
            playlist: ExportedPlaylist {
                id: detail.id,
                name: detail.name,
                songs: detail.songs,
            },
        };

        let mail = Mail {
            to: request.target_email.clone(),
            subject,
            text: "The exported playlist is attached.".to_string(),
            attachments: vec![Attachment {
                filename: ATTACHMENT_NAME.to_string(),
                content_type: "application/json".to_string(),
                content: serde_json::to_vec_pretty(&document)?,
            }],
        };
        self.mailer.send(mail).await?;

        info!(
            "Exported playlist {} ({} songs) to {}",
            request.playlist_id, song_count, request.target_email
        );
        Ok(Outcome::Sent)
    }
}
