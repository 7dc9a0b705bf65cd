//! Error taxonomy exposed by the roll-call session manager.

use crate::model::ModelValidationError;
use crate::repo::RepoError;
use crate::resolver::ResolveError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RollCallResult<T> = Result<T, RollCallError>;

/// Caller-facing failure classes.
///
/// There is no conflict class: duplicate check-ins and repeated
/// absence declarations succeed.
#[derive(Debug)]
pub enum RollCallError {
    /// Unknown session, group or recipient reference.
    NotFound(String),
    /// Malformed or out-of-bounds input, or an empty target set.
    InvalidArgument(String),
    /// Caller identity does not match the privileged actor.
    Unauthorized(String),
    /// Store failure; nothing from the failed write is visible.
    DependencyUnavailable(RepoError),
}

impl Display for RollCallError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(what) => write!(f, "not found: {what}"),
            Self::InvalidArgument(message) => write!(f, "invalid argument: {message}"),
            Self::Unauthorized(message) => write!(f, "unauthorized: {message}"),
            Self::DependencyUnavailable(err) => write!(f, "dependency unavailable: {err}"),
        }
    }
}

impl Error for RollCallError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::DependencyUnavailable(err) => Some(err),
            _ => None,
        }
    }
}

impl RollCallError {
    /// Stable machine-readable code for logs and transports.
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::InvalidArgument(_) => "invalid_argument",
            Self::Unauthorized(_) => "unauthorized",
            Self::DependencyUnavailable(_) => "dependency_unavailable",
        }
    }
}

impl From<ModelValidationError> for RollCallError {
    fn from(value: ModelValidationError) -> Self {
        Self::InvalidArgument(value.to_string())
    }
}

impl From<RepoError> for RollCallError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(what) => Self::NotFound(what),
            RepoError::Validation(err) => Self::InvalidArgument(err.to_string()),
            other => Self::DependencyUnavailable(other),
        }
    }
}

impl From<ResolveError> for RollCallError {
    fn from(value: ResolveError) -> Self {
        match value {
            ResolveError::GroupNotFound(name) => Self::NotFound(format!("group {name}")),
            ResolveError::UnknownRecipient(id) => Self::NotFound(format!("recipient {id}")),
            ResolveError::EmptyGroup(_) | ResolveError::EmptyPopulation => {
                Self::InvalidArgument(value.to_string())
            }
            ResolveError::Repo(err) => Self::from(err),
        }
    }
}
