//! Roll-call session manager.
//!
//! # Responsibility
//! - Validate and create sessions, then start notice fan-out.
//! - Accept idempotent check-ins and last-write-wins absence declarations.
//! - End sessions on the initiator's request.
//! - Serve live views, supervisor listings and recipient history.
//!
//! # Invariants
//! - All validation happens before the first write.
//! - The service holds no mutable state; coordination is left to the store.
//! - Notification outcome never gates or rolls back session creation.
//! - Expiry is only ever a read-time comparison against `expires_at`.

use super::error::{RollCallError, RollCallResult};
use super::live_view::{aggregate_snapshot, HistoryEntry, LiveView, SessionSummary};
use crate::clock::{Clock, SystemClock};
use crate::config::{ConfigError, RollCallConfig};
use crate::model::attendance::{AbsenceDeclaration, CheckIn};
use crate::model::recipient::RecipientId;
use crate::model::session::{Session, SessionId, Targeting};
use crate::model::ModelValidationError;
use crate::notify::{fan_out, DispatchBatch, Dispatcher, Notice};
use crate::repo::recipient_repo::EndpointRepository;
use crate::repo::session_repo::CheckInWrite;
use crate::repo::RollCallStore;
use crate::resolver::{RecipientResolver, SingleTargetPolicy};
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use uuid::Uuid;

/// Result of a successful `start_session`.
///
/// `dispatch` may be dropped; delivery continues in the background.
#[derive(Debug)]
pub struct StartedSession {
    pub session_id: SessionId,
    pub target_count: usize,
    pub dispatch: DispatchBatch,
}

/// Acknowledgement of a check-in submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CheckInAck {
    /// `true` when an earlier submission for the pair was already stored.
    pub already_checked: bool,
}

/// Session manager over a shareable record store.
pub struct RollCallService<S: RollCallStore> {
    store: Arc<S>,
    dispatcher: Arc<dyn Dispatcher>,
    clock: Arc<dyn Clock>,
    config: RollCallConfig,
}

impl<S: RollCallStore> RollCallService<S> {
    /// Creates a service using the system clock and default configuration.
    pub fn new(store: Arc<S>, dispatcher: Arc<dyn Dispatcher>) -> Self {
        Self {
            store,
            dispatcher,
            clock: Arc::new(SystemClock),
            config: RollCallConfig::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the configuration after validating it.
    pub fn with_config(mut self, config: RollCallConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &RollCallConfig {
        &self.config
    }

    /// Opens a session addressed by `targeting` for `window_seconds`.
    ///
    /// # Errors
    /// - `InvalidArgument` for a blank initiator, an out-of-bounds window, an
    ///   empty group or an empty population.
    /// - `NotFound` for an unknown group.
    /// - `DependencyUnavailable` when the store rejects the write; no part of
    ///   the session is then visible.
    pub fn start_session(
        &self,
        initiator_id: &str,
        targeting: Targeting,
        window_seconds: u32,
    ) -> RollCallResult<StartedSession> {
        let initiator_id = initiator_id.trim();
        if initiator_id.is_empty() {
            return Err(ModelValidationError::EmptyInitiator.into());
        }
        if !self.config.window_allowed(window_seconds) {
            return Err(RollCallError::InvalidArgument(format!(
                "window_seconds must be within {}..={}, got {window_seconds}",
                self.config.min_window_seconds, self.config.max_window_seconds
            )));
        }

        let targeting = normalize_targeting(targeting)?;
        let targets = RecipientResolver::new(self.store.as_ref())
            .with_single_policy(self.single_target_policy())
            .resolve(&targeting)?;

        let session = Session::new(initiator_id, targeting, window_seconds, self.clock.now_ms());
        if let Err(err) = self.store.insert_session(&session, &targets) {
            warn!(
                "event=session_start module=roll_call status=error targeting={} error={}",
                session.targeting.kind(),
                err
            );
            return Err(RollCallError::DependencyUnavailable(err));
        }
        info!(
            "event=session_start module=roll_call status=ok session_id={} targeting={} targets={} window_seconds={}",
            session.id,
            session.targeting.kind(),
            targets.len(),
            window_seconds
        );

        let notice = Notice {
            title: self.config.notice.title.clone(),
            body: self.config.notice.body.clone(),
            link: self.config.notice.link_for(session.id),
        };
        let endpoints: Arc<dyn EndpointRepository + Send + Sync> = self.store.clone();
        let dispatch = fan_out(
            Arc::clone(&self.dispatcher),
            endpoints,
            session.id,
            &targets,
            notice,
        );

        Ok(StartedSession {
            session_id: session.id,
            target_count: targets.len(),
            dispatch,
        })
    }

    /// Records a check-in; repeating it is a successful no-op.
    ///
    /// Submissions after the deadline are still recorded; the window only
    /// governs what is displayed as active.
    pub fn check_in(&self, session_id: SessionId, recipient_id: &str) -> RollCallResult<CheckInAck> {
        let recipient_id = RecipientId::parse(recipient_id)?;
        let session = self.addressed_session(session_id, &recipient_id)?;
        let now = self.clock.now_ms();

        let write = self.store.insert_check_in(&CheckIn {
            session_id,
            recipient_id: recipient_id.clone(),
            responded_at: now,
        })?;
        let already_checked = write == CheckInWrite::Duplicate;
        info!(
            "event=check_in module=roll_call status=ok session_id={} recipient_id={} already_checked={} late={}",
            session_id,
            recipient_id,
            already_checked,
            !session.is_active_at(now)
        );

        Ok(CheckInAck { already_checked })
    }

    /// Stores or replaces the recipient's absence declaration.
    pub fn declare_absence(
        &self,
        session_id: SessionId,
        recipient_id: &str,
        reason: &str,
        location: Option<&str>,
    ) -> RollCallResult<()> {
        let recipient_id = RecipientId::parse(recipient_id)?;
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(ModelValidationError::EmptyReason.into());
        }
        let location = location
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        self.addressed_session(session_id, &recipient_id)?;

        self.store.upsert_absence(&AbsenceDeclaration {
            session_id,
            recipient_id: recipient_id.clone(),
            reason: reason.to_string(),
            location,
            declared_at: self.clock.now_ms(),
        })?;
        info!(
            "event=absence_declare module=roll_call status=ok session_id={} recipient_id={}",
            session_id, recipient_id
        );
        Ok(())
    }

    /// Ends a session early. Only its initiator may do so; repeating is a no-op.
    pub fn end_session(&self, session_id: SessionId, initiator_id: &str) -> RollCallResult<()> {
        let session = self.require_session(session_id)?;
        if session.initiator_id != initiator_id.trim() {
            warn!(
                "event=session_end module=roll_call status=error session_id={} error_code=unauthorized",
                session_id
            );
            return Err(RollCallError::Unauthorized(format!(
                "session {session_id} can only be ended by its initiator"
            )));
        }
        if !session.active {
            info!(
                "event=session_end module=roll_call status=skip session_id={} reason=already_ended",
                session_id
            );
            return Ok(());
        }

        self.store.deactivate_session(session_id)?;
        info!(
            "event=session_end module=roll_call status=ok session_id={} expired_before_end={}",
            session_id,
            !session.is_active_at(self.clock.now_ms())
        );
        Ok(())
    }

    /// Current per-recipient status and counts.
    pub fn live_view(&self, session_id: SessionId) -> RollCallResult<LiveView> {
        let snapshot = self
            .store
            .load_snapshot(session_id)?
            .ok_or_else(|| RollCallError::NotFound(format!("session {session_id}")))?;
        Ok(aggregate_snapshot(&snapshot, self.clock.now_ms()))
    }

    /// Sessions opened by `initiator_id`, newest first.
    pub fn list_for_initiator(&self, initiator_id: &str) -> RollCallResult<Vec<SessionSummary>> {
        let now = self.clock.now_ms();
        Ok(self
            .store
            .list_snapshots_for_initiator(initiator_id.trim())?
            .iter()
            .map(|snapshot| aggregate_snapshot(snapshot, now).summary())
            .collect())
    }

    /// Every session that addressed `recipient_id`, newest first.
    pub fn history_for_recipient(&self, recipient_id: &str) -> RollCallResult<Vec<HistoryEntry>> {
        let recipient_id = RecipientId::parse(recipient_id)?;
        let now = self.clock.now_ms();
        Ok(self
            .store
            .list_snapshots_for_recipient(&recipient_id)?
            .iter()
            .filter_map(|snapshot| {
                aggregate_snapshot(snapshot, now).into_history_entry(&recipient_id)
            })
            .collect())
    }

    /// Newest session addressing `recipient_id` that is still active.
    pub fn find_active_for_recipient(
        &self,
        recipient_id: &str,
    ) -> RollCallResult<Option<SessionSummary>> {
        let recipient_id = RecipientId::parse(recipient_id)?;
        let now = self.clock.now_ms();
        Ok(self
            .store
            .list_snapshots_for_recipient(&recipient_id)?
            .iter()
            .find(|snapshot| snapshot.session.is_active_at(now))
            .map(|snapshot| aggregate_snapshot(snapshot, now).summary()))
    }

    fn single_target_policy(&self) -> SingleTargetPolicy {
        if self.config.require_known_single_target {
            SingleTargetPolicy::RequireKnown
        } else {
            SingleTargetPolicy::AcceptAny
        }
    }

    fn require_session(&self, session_id: SessionId) -> RollCallResult<Session> {
        self.store
            .get_session(session_id)?
            .ok_or_else(|| RollCallError::NotFound(format!("session {session_id}")))
    }

    fn addressed_session(
        &self,
        session_id: SessionId,
        recipient_id: &RecipientId,
    ) -> RollCallResult<Session> {
        let session = self.require_session(session_id)?;
        if !self.store.is_target(session_id, recipient_id)? {
            return Err(RollCallError::NotFound(format!(
                "recipient {recipient_id} in session {session_id}"
            )));
        }
        Ok(session)
    }
}

/// Trims group names the same way groups are stored.
fn normalize_targeting(targeting: Targeting) -> RollCallResult<Targeting> {
    match targeting {
        Targeting::Group(name) => {
            let trimmed = name.trim();
            if trimmed.is_empty() {
                return Err(ModelValidationError::EmptyGroupName.into());
            }
            Ok(Targeting::Group(trimmed.to_string()))
        }
        other => Ok(other),
    }
}

/// Parses a transport-supplied session id; malformed ids cannot name a session.
pub fn parse_session_id(raw: &str) -> RollCallResult<SessionId> {
    Uuid::parse_str(raw.trim()).map_err(|_| RollCallError::NotFound(format!("session {raw}")))
}
