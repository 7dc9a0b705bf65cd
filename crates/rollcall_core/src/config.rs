//! Roll-call runtime configuration.
//!
//! # Responsibility
//! - Hold the allowed session window bounds and the "session started" notice.
//! - Load overrides from JSON, falling back to defaults for omitted keys.
//!
//! # Invariants
//! - `1 <= min_window_seconds <= max_window_seconds`.
//! - The notice link template always contains `{session_id}`.

use crate::model::session::SessionId;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

const SESSION_ID_PLACEHOLDER: &str = "{session_id}";
const DEFAULT_MIN_WINDOW_SECONDS: u32 = 1;
const DEFAULT_MAX_WINDOW_SECONDS: u32 = 24 * 60 * 60;

/// Configuration load/validation errors.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    InvalidWindowBounds { min: u32, max: u32 },
    MissingLinkPlaceholder(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::InvalidWindowBounds { min, max } => write!(
                f,
                "window bounds must satisfy 1 <= min <= max, got min={min} max={max}"
            ),
            Self::MissingLinkPlaceholder(template) => write!(
                f,
                "notice link template `{template}` must contain {SESSION_ID_PLACEHOLDER}"
            ),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            _ => None,
        }
    }
}

/// Text pushed to every target when a session starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoticeTemplate {
    pub title: String,
    pub body: String,
    /// Deep link; `{session_id}` is substituted.
    pub link_template: String,
}

impl Default for NoticeTemplate {
    fn default() -> Self {
        Self {
            title: "Roll call started".to_string(),
            body: "Open the app and check in.".to_string(),
            link_template: format!("/call?id={SESSION_ID_PLACEHOLDER}"),
        }
    }
}

impl NoticeTemplate {
    /// Renders the link for one session.
    pub fn link_for(&self, session_id: SessionId) -> String {
        self.link_template
            .replace(SESSION_ID_PLACEHOLDER, &session_id.to_string())
    }
}

/// Top-level roll-call configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RollCallConfig {
    pub min_window_seconds: u32,
    pub max_window_seconds: u32,
    /// When set, `Single` targeting must name a registered recipient.
    pub require_known_single_target: bool,
    pub notice: NoticeTemplate,
}

impl Default for RollCallConfig {
    fn default() -> Self {
        Self {
            min_window_seconds: DEFAULT_MIN_WINDOW_SECONDS,
            max_window_seconds: DEFAULT_MAX_WINDOW_SECONDS,
            require_known_single_target: false,
            notice: NoticeTemplate::default(),
        }
    }
}

impl RollCallConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(ConfigError::Io)?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_window_seconds == 0 || self.min_window_seconds > self.max_window_seconds {
            return Err(ConfigError::InvalidWindowBounds {
                min: self.min_window_seconds,
                max: self.max_window_seconds,
            });
        }
        if !self.notice.link_template.contains(SESSION_ID_PLACEHOLDER) {
            return Err(ConfigError::MissingLinkPlaceholder(
                self.notice.link_template.clone(),
            ));
        }
        Ok(())
    }

    /// Returns whether `window_seconds` is inside the configured bounds.
    ///
    /// A zero window is never allowed, whatever the bounds say.
    pub fn window_allowed(&self, window_seconds: u32) -> bool {
        window_seconds > 0
            && (self.min_window_seconds..=self.max_window_seconds).contains(&window_seconds)
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, RollCallConfig};
    use uuid::Uuid;

    #[test]
    fn defaults_are_valid() {
        let config = RollCallConfig::default();
        config.validate().expect("defaults should validate");
        assert!(config.window_allowed(60));
        assert!(!config.window_allowed(0));
        assert!(!config.window_allowed(24 * 60 * 60 + 1));
    }

    #[test]
    fn partial_json_keeps_defaults_for_missing_keys() {
        let config = RollCallConfig::from_json_str(r#"{"max_window_seconds": 600}"#)
            .expect("partial config should parse");
        assert_eq!(config.max_window_seconds, 600);
        assert_eq!(config.min_window_seconds, 1);
        assert_eq!(config.notice.title, "Roll call started");
    }

    #[test]
    fn inverted_bounds_are_rejected() {
        let err = RollCallConfig::from_json_str(
            r#"{"min_window_seconds": 120, "max_window_seconds": 60}"#,
        )
        .expect_err("min > max must fail");
        assert!(matches!(
            err,
            ConfigError::InvalidWindowBounds { min: 120, max: 60 }
        ));
    }

    #[test]
    fn zero_window_is_refused_even_with_zero_lower_bound() {
        let config = RollCallConfig {
            min_window_seconds: 0,
            ..RollCallConfig::default()
        };
        assert!(!config.window_allowed(0));
        assert!(config.window_allowed(1));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidWindowBounds { min: 0, .. })
        ));
    }

    #[test]
    fn link_template_requires_placeholder() {
        let err = RollCallConfig::from_json_str(r#"{"notice": {"link_template": "/call"}}"#)
            .expect_err("template without placeholder must fail");
        assert!(matches!(err, ConfigError::MissingLinkPlaceholder(_)));
    }

    #[test]
    fn link_substitutes_session_id() {
        let id = Uuid::new_v4();
        let link = RollCallConfig::default().notice.link_for(id);
        assert_eq!(link, format!("/call?id={id}"));
    }
}
