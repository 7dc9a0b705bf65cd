//! Recipient identity and roster records.

use super::ModelValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

static RECIPIENT_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9._-]{1,64}$").expect("valid recipient id regex"));

/// Syntactically validated recipient identifier.
///
/// Validation is purely lexical; membership in the known population is a
/// targeting concern, not an identity one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecipientId(String);

impl RecipientId {
    /// Parses and trims a raw recipient id.
    pub fn parse(value: &str) -> Result<Self, ModelValidationError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ModelValidationError::EmptyRecipientId);
        }
        if !RECIPIENT_ID_RE.is_match(trimmed) {
            return Err(ModelValidationError::InvalidRecipientId(trimmed.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for RecipientId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Member of the known population addressed by `ALL` targeting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    /// Human-readable label; may be empty.
    pub display_name: String,
}
