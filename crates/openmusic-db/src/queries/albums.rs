use rusqlite::{Connection, OptionalExtension};

use openmusic_types::models::SongSummary;

use crate::models::AlbumRow;
use crate::{Database, Error, Result, ids, now};

impl Database {
    pub fn create_album(&self, name: &str, year: i32) -> Result<String> {
        self.with_conn(|conn| {
            let id = ids::generate("album");
            let ts = now();
            conn.execute(
                "INSERT INTO albums (id, name, year, created_at, updated_at) VALUES (?1, ?2, ?3, ?4, ?4)",
                rusqlite::params![id, name, year, ts],
            )?;
            Ok(id)
        })
    }

    pub fn get_album(&self, id: &str) -> Result<AlbumRow> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, year, cover FROM albums WHERE id = ?1",
                [id],
                |row| {
                    Ok(AlbumRow {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        year: row.get(2)?,
                        cover: row.get(3)?,
                    })
                },
            )
            .optional()?
            .ok_or_else(|| Error::not_found("album not found"))
        })
    }

    pub fn get_album_songs(&self, album_id: &str) -> Result<Vec<SongSummary>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, title, performer FROM songs WHERE album_id = ?1 ORDER BY created_at",
            )?;
            let rows = stmt
                .query_map([album_id], |row| {
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

    pub fn update_album(&self, id: &str, name: &str, year: i32) -> Result<()> {
        self.with_conn(|conn| {
            let n = conn.execute(
                "UPDATE albums SET name = ?1, year = ?2, updated_at = ?3 WHERE id = ?4",
                rusqlite::params![name, year, now(), id],
            )?;
            if n == 0 {
                return Err(Error::not_found("cannot update album, id not found"));
            }
            Ok(())
        })
    }

    pub fn delete_album(&self, id: &str) -> Result<()> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM albums WHERE id = ?1", [id])?;
            if n == 0 {
                return Err(Error::not_found("cannot delete album, id not found"));
            }
            Ok(())
        })
    }

    /// Swap the album's cover file name, returning the previous one so the
    /// caller can remove it from blob storage.
    pub fn replace_album_cover(&self, id: &str, file_name: &str) -> Result<Option<String>> {
        self.with_tx(|conn| {
            let previous: Option<String> = conn
                .query_row("SELECT cover FROM albums WHERE id = ?1", [id], |row| row.get(0))
                .optional()?
                .ok_or_else(|| Error::not_found("album not found"))?;

            conn.execute(
                "UPDATE albums SET cover = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![file_name, now(), id],
            )?;
            Ok(previous)
        })
    }
}

pub(crate) fn album_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM albums WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}
