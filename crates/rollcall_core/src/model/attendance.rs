//! Recipient responses to a session.
//!
//! # Invariants
//! - At most one `CheckIn` exists per `(session_id, recipient_id)`.
//! - At most one `AbsenceDeclaration` exists per pair; later writes replace it.
//! - Both may coexist for the same pair.

use super::recipient::RecipientId;
use super::session::SessionId;
use serde::{Deserialize, Serialize};

/// A recipient's acknowledgement of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckIn {
    pub session_id: SessionId,
    pub recipient_id: RecipientId,
    /// Unix epoch milliseconds of the first accepted submission.
    pub responded_at: i64,
}

/// A recipient's self-reported non-attendance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbsenceDeclaration {
    pub session_id: SessionId,
    pub recipient_id: RecipientId,
    pub reason: String,
    pub location: Option<String>,
    /// Unix epoch milliseconds of the latest write.
    pub declared_at: i64,
}
