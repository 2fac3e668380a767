pub mod access;
pub mod error;
pub mod ids;
pub mod migrations;
pub mod models;
pub mod queries;
pub mod queue;

pub use error::{Error, Result};

use chrono::{SecondsFormat, Utc};
use rusqlite::{Connection, TransactionBehavior};
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;
use tracing::info;

pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;

        // WAL mode so the export consumer can read while the API writes
        conn.pragma_update(None, "journal_mode", "WAL")?;
        let db = Self::init(conn)?;

        info!("Database opened at {}", path.display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.pragma_update(None, "foreign_keys", "ON")?;
        conn.busy_timeout(Duration::from_secs(5))?;

        migrations::run(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        f(&conn)
    }

    /// Run `f` inside an IMMEDIATE transaction. Commits when `f` returns
    /// `Ok`; any error rolls the transaction back (on drop) and is returned
    /// unchanged. The connection lock is released on every path.
    pub fn with_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let value = f(&*tx)?;
        tx.commit()?;
        Ok(value)
    }

    /// Run read-only `f` inside a DEFERRED transaction: one consistent
    /// snapshot that never takes the write lock, so readers in another
    /// process do not queue behind writers.
    pub fn with_read_tx<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let mut conn = self.conn.lock().map_err(|_| Error::LockPoisoned)?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Deferred)?;
        let value = f(&*tx)?;
        tx.commit()?;
        Ok(value)
    }
}

/// Current time in the fixed-width RFC 3339 form stored in every
/// timestamp column, so lexical order matches chronological order.
pub(crate) fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}

#[cfg(test)]
pub(crate) mod testing {
    use super::Database;

    /// Seeded fixture: returns (db, owner_id, song_id) with one user
    /// named "alice" and one song.
    pub fn seeded() -> (Database, String, String) {
        let db = Database::open_in_memory().unwrap();
        let owner = db.create_user("alice", "hash", "Alice").unwrap();
        let song = db
            .create_song(&crate::models::SongFields {
                title: "Fix You".into(),
                year: 2005,
                performer: "Coldplay".into(),
                genre: "Rock".into(),
                duration: Some(295),
                album_id: None,
            })
            .unwrap();
        (db, owner, song)
    }
}
