use rusqlite::ErrorCode;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failure taxonomy shared by every store operation. The HTTP layer maps
/// each variant to a status code; nothing in this crate swallows errors.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt row: {0}")]
    Corrupt(String),

    #[error("database lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }
}

fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(e, _) => {
            e.code == ErrorCode::ConstraintViolation
                && (e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                    || e.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY)
        }
        _ => false,
    }
}

/// Maps a UNIQUE/PRIMARY KEY violation on an insert to [`Error::Conflict`].
pub(crate) trait ConflictExt<T> {
    fn on_conflict(self, msg: &str) -> Result<T>;
}

impl<T> ConflictExt<T> for std::result::Result<T, rusqlite::Error> {
    fn on_conflict(self, msg: &str) -> Result<T> {
        self.map_err(|e| {
            if is_unique_violation(&e) {
                Error::conflict(msg)
            } else {
                Error::Sqlite(e)
            }
        })
    }
}
