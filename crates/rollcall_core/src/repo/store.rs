//! SQLite-backed record store shared by all repository contracts.

use super::RepoResult;
use crate::db::Database;
use rusqlite::Connection;
use std::path::Path;

/// SQLite implementation of the session, group and recipient repositories.
///
/// Stateless apart from the database location: every call opens its own
/// connection, so one store can be shared across threads behind `Arc`.
#[derive(Debug, Clone)]
pub struct SqliteRollCallStore {
    db: Database,
}

impl SqliteRollCallStore {
    /// Wraps an already-migrated database handle.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Opens (and migrates) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> RepoResult<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    pub(crate) fn connect(&self) -> RepoResult<Connection> {
        Ok(self.db.connect()?)
    }
}
