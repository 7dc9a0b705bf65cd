//! Best-effort "session started" notification delivery.
//!
//! # Responsibility
//! - Define the consumed per-recipient push contract (`Dispatcher`).
//! - Fan one notice out to a target set as independent, unordered tasks.
//! - Deregister endpoints that the transport reports as permanently invalid.
//!
//! # Invariants
//! - A failure for one recipient never affects delivery to another.
//! - Delivery outcome never feeds back into session state.

mod fanout;
mod log_dispatcher;

pub use fanout::{fan_out, DispatchBatch, DispatchSummary, MAX_NOTIFY_WORKERS};
pub use log_dispatcher::LogDispatcher;

use crate::model::recipient::RecipientId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Push payload for one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub title: String,
    pub body: String,
    pub link: String,
}

/// Terminal result of one delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Delivered,
    /// The recipient has no registered endpoint.
    NoEndpoint,
    /// The endpoint is gone for good and should be deregistered.
    PermanentlyInvalid,
}

/// Transport failure for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    Unavailable(String),
}

impl Display for DispatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unavailable(message) => write!(f, "push transport unavailable: {message}"),
        }
    }
}

impl Error for DispatchError {}

/// Per-recipient push transport.
pub trait Dispatcher: Send + Sync {
    fn send(
        &self,
        recipient_id: &RecipientId,
        notice: &Notice,
    ) -> Result<DeliveryOutcome, DispatchError>;
}
