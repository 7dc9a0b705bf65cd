//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls into roll-call use-case APIs.
//! - Keep transports decoupled from storage details.

pub mod error;
pub mod group_service;
pub mod live_view;
pub mod recipient_service;
pub mod roll_call_service;
