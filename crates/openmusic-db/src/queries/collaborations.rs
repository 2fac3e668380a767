use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use crate::error::ConflictExt;
use crate::queries::playlists::query_playlist;
use crate::queries::users::user_exists;
use crate::{Database, Error, Result, ids, now};

impl Database {
    /// Grant `user_id` collaborator access to a playlist. Callers must have
    /// passed [`Database::authorize_owner`] first. Checks and insert run in
    /// one transaction; a duplicate grant is a conflict.
    pub fn add_collaborator(&self, playlist_id: &str, user_id: &str) -> Result<String> {
        self.with_tx(|conn| {
            if !user_exists(conn, user_id)? {
                return Err(Error::not_found("user not found"));
            }
            let playlist =
                query_playlist(conn, playlist_id)?.ok_or_else(|| Error::not_found("playlist not found"))?;
            if playlist.owner == user_id {
                return Err(Error::conflict("the owner cannot be added as a collaborator"));
            }
            if query_grant(conn, playlist_id, user_id)?.is_some() {
                return Err(Error::conflict("user is already a collaborator"));
            }

            let id = ids::generate("collaboration");
            conn.execute(
                "INSERT INTO collaborations (id, playlist_id, user_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                (&id, playlist_id, user_id, now()),
            )
            .on_conflict("user is already a collaborator")?;

            info!("User {} now collaborates on playlist {}", user_id, playlist_id);
            Ok(id)
        })
    }

    pub fn remove_collaborator(&self, playlist_id: &str, user_id: &str) -> Result<()> {
        self.with_tx(|conn| {
            let grant = query_grant(conn, playlist_id, user_id)?
                .ok_or_else(|| Error::not_found("user is not a collaborator on this playlist"))?;

            conn.execute("DELETE FROM collaborations WHERE id = ?1", [&grant])?;
            info!("User {} no longer collaborates on playlist {}", user_id, playlist_id);
            Ok(())
        })
    }

    pub fn is_collaborator(&self, playlist_id: &str, user_id: &str) -> Result<bool> {
        self.with_conn(|conn| Ok(query_grant(conn, playlist_id, user_id)?.is_some()))
    }
}

/// Id of the grant for (playlist, user), if any.
pub(crate) fn query_grant(conn: &Connection, playlist_id: &str, user_id: &str) -> Result<Option<String>> {
    let id = conn
        .query_row(
            "SELECT id FROM collaborations WHERE playlist_id = ?1 AND user_id = ?2",
            [playlist_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}
