//! Core domain logic for roll-call attendance sessions.
//! This crate is the single source of truth for session and response invariants.

pub mod clock;
pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod resolver;
pub mod service;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, NoticeTemplate, RollCallConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::attendance::{AbsenceDeclaration, CheckIn};
pub use model::group::PresetGroup;
pub use model::recipient::{Recipient, RecipientId};
pub use model::session::{Session, SessionId, TargetSet, Targeting};
pub use model::ModelValidationError;
pub use notify::{
    DeliveryOutcome, DispatchBatch, DispatchError, DispatchSummary, Dispatcher, LogDispatcher,
    Notice, MAX_NOTIFY_WORKERS,
};
pub use repo::group_repo::GroupRepository;
pub use repo::recipient_repo::{EndpointRepository, RecipientRepository};
pub use repo::session_repo::{CheckInWrite, SessionRepository, SessionSnapshot};
pub use repo::{RepoError, RepoResult, RollCallStore, SqliteRollCallStore};
pub use resolver::{RecipientResolver, ResolveError, SingleTargetPolicy};
pub use service::error::{RollCallError, RollCallResult};
pub use service::group_service::{GroupService, GroupServiceError};
pub use service::live_view::{
    aggregate, HistoryEntry, LiveView, RecipientStatus, RecipientStatusEntry, SessionSummary,
    StatusCounts,
};
pub use service::recipient_service::RecipientService;
pub use service::roll_call_service::{
    parse_session_id, CheckInAck, RollCallService, StartedSession,
};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
