//! SQLite bootstrap for the catalog store.
//!
//! # Responsibility
//! - Open catalog connections with the pragmas the stores rely on.
//! - Run schema migrations before any catalog read or write.
//!
//! # Invariants
//! - Schema version lives in `PRAGMA user_version`.
//! - Connections handed out are fully migrated and have `foreign_keys=ON`.

use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Mutex;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory, open_shared};

pub type DbResult<T> = Result<T, DbError>;

/// Connection shared by the stores and the reconciliation workers.
///
/// Each store call holds the lock for one statement group only.
pub type SharedConnection = Mutex<Connection>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::UnsupportedSchemaVersion {
                db_version,
                latest_supported,
            } => write!(
                f,
                "catalog schema version {db_version} is newer than supported {latest_supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::UnsupportedSchemaVersion { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
