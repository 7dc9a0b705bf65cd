//! Roll-call domain model.
//!
//! # Responsibility
//! - Define canonical records shared by the resolver, store and services.
//! - Own syntactic validation of identifiers and free-text fields.
//!
//! # Invariants
//! - Sessions are identified by a random `SessionId` that is never reused.
//! - A `TargetSet` is deduplicated and ordered by recipient id.
//! - Sessions, check-ins and absence declarations are never deleted.

pub mod attendance;
pub mod group;
pub mod recipient;
pub mod session;

use std::error::Error;
use std::fmt::{Display, Formatter};

/// Syntactic validation failures for model inputs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelValidationError {
    EmptyRecipientId,
    InvalidRecipientId(String),
    EmptyInitiator,
    EmptyGroupName,
    EmptyReason,
    EmptyEndpointToken,
}

impl Display for ModelValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyRecipientId => write!(f, "recipient id cannot be empty"),
            Self::InvalidRecipientId(value) => write!(
                f,
                "recipient id `{value}` is malformed; expected 1-64 chars of [A-Za-z0-9._-]"
            ),
            Self::EmptyInitiator => write!(f, "initiator id cannot be empty"),
            Self::EmptyGroupName => write!(f, "group name cannot be empty"),
            Self::EmptyReason => write!(f, "absence reason cannot be empty"),
            Self::EmptyEndpointToken => write!(f, "push endpoint token cannot be empty"),
        }
    }
}

impl Error for ModelValidationError {}
