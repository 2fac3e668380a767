use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use openmusic_types::models::{ActivityAction, ActivityEntry, PlaylistDetail, PlaylistSummary, SongSummary};

use crate::error::ConflictExt;
use crate::models::PlaylistRow;
use crate::queries::songs::song_exists;
use crate::{Database, Error, Result, ids, now};

impl Database {
    // -- Playlists --

    pub fn create_playlist(&self, name: &str, owner: &str) -> Result<String> {
        self.with_conn(|conn| {
            let id = ids::generate("playlist");
            let ts = now();
            conn.execute(
                "INSERT INTO playlists (id, name, owner, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                (&id, name, owner, &ts),
            )?;
            Ok(id)
        })
    }

    pub fn get_playlist(&self, id: &str) -> Result<Option<PlaylistRow>> {
        self.with_conn(|conn| query_playlist(conn, id))
    }

    /// Playlists the user owns or collaborates on, with the owner's username.
    pub fn list_playlists_for(&self, user_id: &str) -> Result<Vec<PlaylistSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT p.id, p.name, u.username
                 FROM playlists p
                 JOIN users u ON p.owner = u.id
                 WHERE p.owner = ?1
                    OR EXISTS (SELECT 1 FROM collaborations c
                               WHERE c.playlist_id = p.id AND c.user_id = ?1)
                 ORDER BY p.created_at, p.rowid",
            )?;
            let rows = stmt
                .query_map([user_id], |row| {
                    Ok(PlaylistSummary {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        username: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Removes the playlist together with its songs, grants and activity log.
    pub fn delete_playlist(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM playlists WHERE id = ?1", [id])?;
            if n == 0 {
                return Err(Error::not_found("cannot delete playlist, id not found"));
            }
            Ok(())
        })
    }

    // -- Membership --

    /// Add a song to a playlist. The existence checks and the insert share
    /// one transaction; the (playlist, song) UNIQUE constraint turns a
    /// concurrent duplicate into a conflict rather than a second row.
    pub fn add_playlist_song(&self, playlist_id: &str, song_id: &str) -> Result<String> {
        self.with_tx(|conn| {
            if query_playlist(conn, playlist_id)?.is_none() {
                return Err(Error::not_found("playlist not found"));
            }
            if !song_exists(conn, song_id)? {
                return Err(Error::not_found("cannot add song, song not found"));
            }

            let present = conn
                .query_row(
                    "SELECT 1 FROM playlist_songs WHERE playlist_id = ?1 AND song_id = ?2",
                    [playlist_id, song_id],
                    |_| Ok(()),
                )
                .optional()?;
            if present.is_some() {
                return Err(Error::conflict("song is already in the playlist"));
            }

            let id = ids::generate("playlist-song");
            conn.execute(
                "INSERT INTO playlist_songs (id, playlist_id, song_id, created_at) VALUES (?1, ?2, ?3, ?4)",
                (&id, playlist_id, song_id, now()),
            )
            .on_conflict("song is already in the playlist")?;

            debug!("Song {} added to playlist {}", song_id, playlist_id);
            Ok(id)
        })
    }

    pub fn remove_playlist_song(&self, playlist_id: &str, song_id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "DELETE FROM playlist_songs WHERE playlist_id = ?1 AND song_id = ?2",
                [playlist_id, song_id],
            )?;
            if n == 0 {
                return Err(Error::not_found("cannot remove song, it is not in the playlist"));
            }
            Ok(())
        })
    }

    /// Playlist header with its current songs; NotFound if the playlist is gone.
    pub fn get_playlist_songs(&self, playlist_id: &str) -> Result<PlaylistDetail> {
        self.find_playlist_songs(playlist_id)?
            .ok_or_else(|| Error::not_found("playlist not found"))
    }

    /// Like [`Database::get_playlist_songs`] but a vanished playlist is `None`.
    /// Header and songs are read from one snapshot so they agree.
    pub fn find_playlist_songs(&self, playlist_id: &str) -> Result<Option<PlaylistDetail>> {
        self.with_read_tx(|conn| {
            let header = conn
                .query_row(
                    "SELECT p.id, p.name, u.username
                     FROM playlists p
                     LEFT JOIN users u ON p.owner = u.id
                     WHERE p.id = ?1",
                    [playlist_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, String>(1)?,
                            row.get::<_, Option<String>>(2)?,
                        ))
                    },
                )
                .optional()?;

            let Some((id, name, username)) = header else {
                return Ok(None);
            };

            let mut stmt = conn.prepare(
                "SELECT s.id, s.title, s.performer
                 FROM playlist_songs ps
                 JOIN songs s ON ps.song_id = s.id
                 WHERE ps.playlist_id = ?1
                 ORDER BY ps.created_at, ps.rowid",
            )?;
            let songs = stmt
                .query_map([playlist_id], |row| {
                    Ok(SongSummary {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        performer: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(Some(PlaylistDetail {
                id,
                name,
                username: username.unwrap_or_else(|| "unknown".to_string()),
                songs,
            }))
        })
    }

    // -- Activity log --

    /// Append one immutable audit entry.
    pub fn record_activity(
        &self,
        playlist_id: &str,
        song_id: &str,
        user_id: &str,
        action: ActivityAction,
    ) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO playlist_song_activities (id, playlist_id, song_id, user_id, action, time)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                (
                    ids::generate("activity"),
                    playlist_id,
                    song_id,
                    user_id,
                    action.as_str(),
                    now(),
                ),
            )?;
            Ok(())
        })
    }

    /// Activity log of a playlist ordered by time, oldest first.
    pub fn list_activities(&self, playlist_id: &str) -> Result<Vec<ActivityEntry>> {
        self.with_conn(|conn| {
            if query_playlist(conn, playlist_id)?.is_none() {
                return Err(Error::not_found("playlist not found"));
            }

            let mut stmt = conn.prepare(
                "SELECT u.username, s.title, a.action, a.time
                 FROM playlist_song_activities a
                 JOIN users u ON a.user_id = u.id
                 JOIN songs s ON a.song_id = s.id
                 WHERE a.playlist_id = ?1
                 ORDER BY a.time, a.rowid",
            )?;
            let raw = stmt
                .query_map([playlist_id], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                    ))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            raw.into_iter()
                .map(|(username, title, action, time)| {
                    let action = action.parse::<ActivityAction>().map_err(Error::Corrupt)?;
                    let time = DateTime::parse_from_rfc3339(&time)
                        .map_err(|e| Error::Corrupt(format!("activity time '{time}': {e}")))?
                        .with_timezone(&Utc);
                    Ok(ActivityEntry {
                        username,
                        title,
                        action,
                        time,
                    })
                })
                .collect()
        })
    }
}

pub(crate) fn query_playlist(conn: &Connection, id: &str) -> Result<Option<PlaylistRow>> {
    let row = conn
        .query_row(
            "SELECT id, name, owner FROM playlists WHERE id = ?1",
            [id],
            |row| {
                Ok(PlaylistRow {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    owner: row.get(2)?,
                })
            },
        )
        .optional()?;
    Ok(row)
}
