use rusqlite::OptionalExtension;

use crate::error::ConflictExt;
use crate::models::LikeToggle;
use crate::queries::albums::album_exists;
use crate::{Database, Error, Result, ids, now};

impl Database {
    /// Toggle a like: removes if exists, inserts if not.
    pub fn toggle_album_like(&self, album_id: &str, user_id: &str) -> Result<LikeToggle> {
        self.with_tx(|conn| {
            if !album_exists(conn, album_id)? {
                return Err(Error::not_found(format!("album {album_id} not found")));
            }

            let existing: Option<String> = conn
                .query_row(
                    "SELECT id FROM user_album_likes WHERE album_id = ?1 AND user_id = ?2",
                    [album_id, user_id],
                    |row| row.get(0),
                )
                .optional()?;

            if let Some(existing_id) = existing {
                conn.execute("DELETE FROM user_album_likes WHERE id = ?1", [&existing_id])?;
                Ok(LikeToggle::Unliked)
            } else {
                conn.execute(
                    "INSERT INTO user_album_likes (id, user_id, album_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                    (ids::generate("album-like"), user_id, album_id, now()),
                )
                .on_conflict("album is already liked")?;
                Ok(LikeToggle::Liked)
            }
        })
    }

    pub fn count_album_likes(&self, album_id: &str) -> Result<u64> {
        self.with_conn(|conn| {
            let n: i64 = conn.query_row(
                "SELECT COUNT(*) FROM user_album_likes WHERE album_id = ?1",
                [album_id],
                |row| row.get(0),
            )?;
            Ok(n as u64)
        })
    }
}
