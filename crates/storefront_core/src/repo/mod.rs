//! Catalog storage contracts and SQLite implementations.
//!
//! # Responsibility
//! - Define the store traits consumed by services and the reconciliation pool.
//! - Keep SQL and row mapping inside the persistence boundary.
//!
//! # Invariants
//! - Lookups signal absence with `RepoError::NotFound`, never an empty value.
//! - Unique-key collisions surface as `RepoError::Conflict`.
//! - Store traits are `Send + Sync` so worker threads can share one store.

use crate::db::{DbError, SharedConnection};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::MutexGuard;
use uuid::Uuid;

pub mod attribute_repo;
pub mod product_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Storage error shared by every catalog store.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    NotFound { entity: &'static str, key: String },
    Conflict { entity: &'static str, key: String },
    InvalidData(String),
    LockPoisoned,
}

impl RepoError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, key } => write!(f, "{entity} not found: {key}"),
            Self::Conflict { entity, key } => write!(f, "{entity} already exists: {key}"),
            Self::InvalidData(message) => write!(f, "invalid persisted catalog data: {message}"),
            Self::LockPoisoned => write!(f, "catalog connection lock poisoned"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

pub(crate) fn lock(conn: &SharedConnection) -> RepoResult<MutexGuard<'_, Connection>> {
    conn.lock().map_err(|_| RepoError::LockPoisoned)
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid value `{value}` in {column}")))
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
