//! Live view aggregation.
//!
//! # Responsibility
//! - Derive one status per target from stored responses.
//! - Derive the displayed `is_active` flag from the deadline and manual flag.
//!
//! # Invariants
//! - `checked_in + absent + unresponsive == |TargetSet|`.
//! - A check-in always wins over a coexisting absence declaration.
//! - Responses from recipients outside the target set are ignored.
//! - Live view, session listings and recipient history all go through
//!   [`aggregate`], so they cannot disagree.

use crate::model::attendance::{AbsenceDeclaration, CheckIn};
use crate::model::recipient::RecipientId;
use crate::model::session::{Session, TargetSet};
use crate::repo::session_repo::SessionSnapshot;
use serde::Serialize;
use std::collections::HashMap;

/// Derived status of one addressed recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecipientStatus {
    CheckedIn {
        responded_at: i64,
    },
    Absent {
        reason: String,
        location: Option<String>,
    },
    Unresponsive,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecipientStatusEntry {
    pub recipient_id: RecipientId,
    #[serde(flatten)]
    pub status: RecipientStatus,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub checked_in: usize,
    pub absent: usize,
    pub unresponsive: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.checked_in + self.absent + self.unresponsive
    }
}

/// Full per-recipient view of one session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LiveView {
    pub session: Session,
    pub is_active: bool,
    pub counts: StatusCounts,
    /// Ordered by recipient id.
    pub entries: Vec<RecipientStatusEntry>,
}

/// Listing row for a supervisor's sessions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    pub session: Session,
    pub is_active: bool,
    pub target_count: usize,
    pub counts: StatusCounts,
}

/// One session as seen by one addressed recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub session: Session,
    pub is_active: bool,
    #[serde(flatten)]
    pub status: RecipientStatus,
}

/// Computes the live view for `session` at `now_ms`.
pub fn aggregate(
    session: &Session,
    targets: &TargetSet,
    check_ins: &[CheckIn],
    absences: &[AbsenceDeclaration],
    now_ms: i64,
) -> LiveView {
    let check_ins: HashMap<&RecipientId, &CheckIn> = check_ins
        .iter()
        .map(|check_in| (&check_in.recipient_id, check_in))
        .collect();
    let absences: HashMap<&RecipientId, &AbsenceDeclaration> = absences
        .iter()
        .map(|absence| (&absence.recipient_id, absence))
        .collect();

    let mut counts = StatusCounts::default();
    let entries = targets
        .iter()
        .map(|recipient_id| {
            let status = match (check_ins.get(recipient_id), absences.get(recipient_id)) {
                (Some(check_in), _) => {
                    counts.checked_in += 1;
                    RecipientStatus::CheckedIn {
                        responded_at: check_in.responded_at,
                    }
                }
                (None, Some(absence)) => {
                    counts.absent += 1;
                    RecipientStatus::Absent {
                        reason: absence.reason.clone(),
                        location: absence.location.clone(),
                    }
                }
                (None, None) => {
                    counts.unresponsive += 1;
                    RecipientStatus::Unresponsive
                }
            };
            RecipientStatusEntry {
                recipient_id: recipient_id.clone(),
                status,
            }
        })
        .collect();

    LiveView {
        session: session.clone(),
        is_active: session.is_active_at(now_ms),
        counts,
        entries,
    }
}

pub(crate) fn aggregate_snapshot(snapshot: &SessionSnapshot, now_ms: i64) -> LiveView {
    aggregate(
        &snapshot.session,
        &snapshot.targets,
        &snapshot.check_ins,
        &snapshot.absences,
        now_ms,
    )
}

impl LiveView {
    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            session: self.session.clone(),
            is_active: self.is_active,
            target_count: self.entries.len(),
            counts: self.counts,
        }
    }

    /// Status of one recipient, `None` when not addressed.
    pub fn status_of(&self, recipient_id: &RecipientId) -> Option<&RecipientStatus> {
        self.entries
            .binary_search_by(|entry| entry.recipient_id.cmp(recipient_id))
            .ok()
            .map(|index| &self.entries[index].status)
    }

    pub(crate) fn into_history_entry(self, recipient_id: &RecipientId) -> Option<HistoryEntry> {
        let status = self.status_of(recipient_id)?.clone();
        Some(HistoryEntry {
            session: self.session,
            is_active: self.is_active,
            status,
        })
    }
}
