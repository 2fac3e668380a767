use rusqlite::{Connection, OptionalExtension};

use crate::error::ConflictExt;
use crate::models::UserRow;
use crate::{Database, Error, Result, ids, now};

impl Database {
    // -- Users --

    /// Insert a user with an already-hashed password. Returns the new id.
    pub fn create_user(&self, username: &str, password_hash: &str, fullname: &str) -> Result<String> {
        self.with_tx(|conn| {
            if query_user_by_username(conn, username)?.is_some() {
                return Err(Error::conflict("username already taken"));
            }

            let id = ids::generate("user");
            let ts = now();
            conn.execute(
                "INSERT INTO users (id, username, password, fullname, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
                (&id, username, password_hash, fullname, &ts),
            )
            .on_conflict("username already taken")?;
            Ok(id)
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_id(conn, id))
    }

    // -- Refresh tokens --

    pub fn save_refresh_token(&self, token: &str) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute("INSERT OR IGNORE INTO authentications (token) VALUES (?1)", [token])?;
            Ok(())
        })
    }

    pub fn refresh_token_exists(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found = conn
                .query_row("SELECT 1 FROM authentications WHERE token = ?1", [token], |_| Ok(()))
                .optional()?;
            Ok(found.is_some())
        })
    }

    /// Returns false if the token was not stored.
    pub fn delete_refresh_token(&self, token: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let n = conn.execute("DELETE FROM authentications WHERE token = ?1", [token])?;
            Ok(n > 0)
        })
    }
}

pub(crate) fn user_exists(conn: &Connection, id: &str) -> Result<bool> {
    let found = conn
        .query_row("SELECT 1 FROM users WHERE id = ?1", [id], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, fullname FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                fullname: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn query_user_by_id(conn: &Connection, id: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, fullname FROM users WHERE id = ?1")?;

    let row = stmt
        .query_row([id], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                fullname: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}
