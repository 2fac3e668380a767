use rusqlite::{Connection, OptionalExtension, ToSql};

use openmusic_types::models::{Song, SongSummary};

use crate::models::SongFields;
use crate::queries::albums::album_exists;
use crate::{Database, Error, Result, ids, now};

impl Database {
    pub fn create_song(&self, song: &SongFields) -> Result<String> {
        self.with_tx(|conn| {
            ensure_album(conn, song.album_id.as_deref())?;

            let id = ids::generate("song");
            let ts = now();
            conn.execute(
                "INSERT INTO songs (id, title, year, performer, genre, duration, album_id, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
                rusqlite::params![
                    id,
                    song.title,
                    song.year,
                    song.performer,
                    song.genre,
                    song.duration,
                    song.album_id,
                    ts,
                ],
            )?;
            Ok(id)
        })
    }

    /// Case-insensitive substring search; absent filters match everything.
    pub fn list_songs(&self, title: Option<&str>, performer: Option<&str>) -> Result<Vec<SongSummary>> {
        self.with_conn(|conn| {
            let mut sql = String::from("SELECT id, title, performer FROM songs");
            let mut clauses: Vec<&str> = Vec::new();
            let title = title.filter(|t| !t.is_empty()).map(contains_pattern);
            let performer = performer.filter(|p| !p.is_empty()).map(contains_pattern);
            let mut params: Vec<&dyn ToSql> = Vec::new();

            if let Some(title) = &title {
                clauses.push("LOWER(title) LIKE LOWER(?) ESCAPE '\\'");
                params.push(title);
            }
            if let Some(performer) = &performer {
                clauses.push("LOWER(performer) LIKE LOWER(?) ESCAPE '\\'");
                params.push(performer);
            }
            if !clauses.is_empty() {
                sql.push_str(" WHERE ");
                sql.push_str(&clauses.join(" AND "));
            }
            sql.push_str(" ORDER BY created_at");

            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params.as_slice(), |row| {
                    Ok(SongSummary {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        performer: row.get(2)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn get_song(&self, id: &str) -> Result<Song> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, title, year, performer, genre, duration, album_id FROM songs WHERE id = ?1",
                [id],
                |row| {
                    Ok(Song {
                        id: row.get(0)?,
                        title: row.get(1)?,
                        year: row.get(2)?,
                        performer: row.get(3)?,
                        genre: row.get(4)?,
                        duration: row.get(5)?,
                        album_id: row.get(6)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| Error::not_found("song not found"))
        })
    }

    pub fn update_song(&self, id: &str, song: &SongFields) -> Result<()> {
        self.with_tx(|conn| {
            if !song_exists(conn, id)? {
                return Err(Error::not_found("cannot update song, id not found"));
            }
            ensure_album(conn, song.album_id.as_deref())?;

            conn.execute(
                "UPDATE songs
                 SET title = ?1, year = ?2, performer = ?3, genre = ?4, duration = ?5, album_id = ?6, updated_at = ?7
                 WHERE id = ?8",
                rusqlite::params![
                    song.title,
                    song.year,
                    song.performer,
                    song.genre,
                    song.duration,
                    song.album_id,
                    now(),
                    id,
                ],
            )?;
            Ok(())
        })
    }

    /// Deleting a song cascades out of every playlist and activity log.
    pub fn delete_song(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM songs WHERE id = ?1", [id])?;
            if n == 0 {
                return Err(Error::not_found("cannot delete song, id not found"));
            }
            Ok(())
        })
    }
}

pub(crate) fn song_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM songs WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

/// `%needle%` with LIKE wildcards in the needle matched literally.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn ensure_album(conn: &Connection, album_id: Option<&str>) -> Result<()> {
    match album_id {
        Some(album_id) if !album_exists(conn, album_id)? => {
            Err(Error::not_found(format!("album {album_id} not found")))
        }
        _ => Ok(()),
    }
}
