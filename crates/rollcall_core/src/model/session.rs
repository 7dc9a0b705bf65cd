//! Session domain model.
//!
//! # Responsibility
//! - Define the time-boxed roll-call session and its targeting descriptor.
//! - Derive the read-time `is_active` flag from the stored deadline.
//!
//! # Invariants
//! - `expires_at == created_at + window_seconds * 1000` and never changes.
//! - `active` only ever transitions from `true` to `false`.
//! - A `TargetSet` is bound once at creation and never edited.

use super::recipient::RecipientId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use uuid::Uuid;

/// Opaque session identifier.
pub type SessionId = Uuid;

/// Who a session addresses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum Targeting {
    /// Every known recipient at creation time.
    All,
    /// Members of the named preset group at creation time.
    Group(String),
    /// Exactly one recipient, accepted without a population lookup.
    Single(RecipientId),
}

impl Targeting {
    /// Stable storage/log label.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Group(_) => "group",
            Self::Single(_) => "single",
        }
    }
}

/// One attendance request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub initiator_id: String,
    /// Unix epoch milliseconds.
    pub created_at: i64,
    pub window_seconds: u32,
    /// Unix epoch milliseconds; `created_at + window_seconds * 1000`.
    pub expires_at: i64,
    /// Manual-end flag. Not the displayed state; see [`Session::is_active_at`].
    pub active: bool,
    pub targeting: Targeting,
}

impl Session {
    /// Creates a new active session with a generated id.
    pub fn new(
        initiator_id: impl Into<String>,
        targeting: Targeting,
        window_seconds: u32,
        created_at: i64,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            initiator_id: initiator_id.into(),
            created_at,
            window_seconds,
            expires_at: created_at + i64::from(window_seconds) * 1000,
            active: true,
            targeting,
        }
    }

    /// Derived liveness at `now_ms`: not manually ended and deadline not reached.
    pub fn is_active_at(&self, now_ms: i64) -> bool {
        self.active && now_ms < self.expires_at
    }
}

/// Deduplicated recipient set bound to one session.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TargetSet(BTreeSet<RecipientId>);

impl TargetSet {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, recipient_id: &RecipientId) -> bool {
        self.0.contains(recipient_id)
    }

    /// Iterates recipients in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &RecipientId> {
        self.0.iter()
    }
}

impl FromIterator<RecipientId> for TargetSet {
    fn from_iter<T: IntoIterator<Item = RecipientId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
