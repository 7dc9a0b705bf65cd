//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the record-store contracts consumed by the roll-call services.
//! - Isolate SQLite query details from service/business orchestration.
//!
//! # Invariants
//! - Session + target set writes are all-or-nothing.
//! - Duplicate check-ins surface as a value (`CheckInWrite::Duplicate`),
//!   never as an error.
//! - Repository APIs return semantic errors (`NotFound`, `DuplicateName`) in
//!   addition to DB transport errors.

pub mod group_repo;
pub mod recipient_repo;
pub mod session_repo;
mod store;

pub use store::SqliteRollCallStore;

use self::group_repo::GroupRepository;
use self::recipient_repo::{EndpointRepository, RecipientRepository};
use self::session_repo::SessionRepository;

use crate::db::DbError;
use crate::model::ModelValidationError;
use rusqlite::ffi;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Every contract the session manager needs from one shareable store.
pub trait RollCallStore:
    SessionRepository + RecipientRepository + EndpointRepository + GroupRepository + Send + Sync + 'static
{
}

impl<T> RollCallStore for T where
    T: SessionRepository
        + RecipientRepository
        + EndpointRepository
        + GroupRepository
        + Send
        + Sync
        + 'static
{
}

/// Generic repository error for roll-call persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(ModelValidationError),
    Db(DbError),
    NotFound(String),
    DuplicateName(String),
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::DuplicateName(name) => write!(f, "name already in use: {name}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound(_) | Self::DuplicateName(_) | Self::InvalidData(_) => None,
        }
    }
}

impl From<ModelValidationError> for RepoError {
    fn from(value: ModelValidationError) -> Self {
        Self::Validation(value)
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

/// Returns whether `err` is a primary-key or unique-index rejection.
///
/// Foreign-key and check violations share the same primary code, so the
/// extended code is inspected.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(inner, _) => {
            inner.code == rusqlite::ErrorCode::ConstraintViolation
                && matches!(
                    inner.extended_code,
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE
                )
        }
        _ => false,
    }
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
