//! Engine configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use keyspec::{DEFAULT_CAPTURE_ACCEPT_TERMINATOR, DEFAULT_CAPTURE_CANCEL_TERMINATOR};

/// Number of past keyboard events kept per mode.
pub const MAX_PAST_EVENTS: usize = 100;
/// Number of past triggered hotkeys kept per mode.
pub const MAX_PAST_HOTKEYS_TRIGGERED: usize = 10;
/// Milliseconds allowed between two keystrokes of a timed sequence.
pub const MAX_TIME_BETWEEN_SEQUENCE_KEYSTROKES_MS: u64 = 1200;
/// Minimum milliseconds between two repeat-triggered runs of the same hotkey.
pub const MIN_TIME_BETWEEN_HOTKEY_REPEATS_MS: u64 = 130;

/// Tunables for the controller and its matchers. Every field has a default.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Capacity of the keydown and keyup event histories.
    pub history_capacity: usize,
    /// Capacity of the triggered-hotkey histories.
    pub triggered_history_capacity: usize,
    /// Timeout between keystrokes for hotkeys with `consider_time_in_sequence`.
    pub sequence_timeout_ms: u64,
    /// Throttle for repeat-enabled hotkeys.
    pub repeat_min_interval_ms: u64,
    /// Pick the most specific matching hotkey instead of the first registered one.
    pub specificity_precedence: bool,
    /// Accept terminator for capture combos without an explicit one.
    pub capture_accept_terminator: String,
    /// Cancel terminator for capture combos.
    pub capture_cancel_terminator: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            history_capacity: MAX_PAST_EVENTS,
            triggered_history_capacity: MAX_PAST_HOTKEYS_TRIGGERED,
            sequence_timeout_ms: MAX_TIME_BETWEEN_SEQUENCE_KEYSTROKES_MS,
            repeat_min_interval_ms: MIN_TIME_BETWEEN_HOTKEY_REPEATS_MS,
            specificity_precedence: false,
            capture_accept_terminator: DEFAULT_CAPTURE_ACCEPT_TERMINATOR.to_string(),
            capture_cancel_terminator: DEFAULT_CAPTURE_CANCEL_TERMINATOR.to_string(),
        }
    }
}

/// Error loading an [`EngineConfig`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// RON syntax or type error.
    #[error("{message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// 1-based column number.
        col: usize,
        /// Human-readable error message.
        message: String,
    },
    /// Values parsed but are unusable.
    #[error("{0}")]
    Validation(String),
}

impl ConfigError {
    /// Render a human-friendly error message including the location when available.
    pub fn pretty(&self) -> String {
        match self {
            Self::Parse { line, col, message } => {
                format!("Engine config parse error at line {line}, column {col}\n{message}")
            }
            Self::Validation(message) => format!("Engine config validation error\n{message}"),
        }
    }
}

impl From<ron::error::SpannedError> for ConfigError {
    fn from(err: ron::error::SpannedError) -> Self {
        Self::Parse {
            line: err.span.start.line,
            col: err.span.start.col,
            message: err.code.to_string(),
        }
    }
}

impl EngineConfig {
    /// Parse a config from RON text. Missing fields take their defaults.
    pub fn from_ron(text: &str) -> Result<Self, ConfigError> {
        let cfg: Self = ron::from_str(text)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check values that deserialize fine but cannot drive the engine.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_capacity == 0 {
            return Err(ConfigError::Validation(
                "history_capacity must be at least 1".into(),
            ));
        }
        if self.triggered_history_capacity == 0 {
            return Err(ConfigError::Validation(
                "triggered_history_capacity must be at least 1".into(),
            ));
        }
        for (field, spec) in [
            ("capture_accept_terminator", &self.capture_accept_terminator),
            ("capture_cancel_terminator", &self.capture_cancel_terminator),
        ] {
            if let Err(e) = keyspec::HotkeyFragment::parse(spec) {
                return Err(ConfigError::Validation(format!("{field}: {e}")));
            }
        }
        Ok(())
    }

    /// Sequence timeout as a duration.
    pub fn sequence_timeout(&self) -> Duration {
        Duration::from_millis(self.sequence_timeout_ms)
    }

    /// Repeat throttle as a duration.
    pub fn repeat_min_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_min_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = EngineConfig::default();
        assert_eq!(cfg.history_capacity, 100);
        assert_eq!(cfg.triggered_history_capacity, 10);
        assert_eq!(cfg.sequence_timeout(), Duration::from_millis(1200));
        assert_eq!(cfg.repeat_min_interval_ms, 130);
        assert!(!cfg.specificity_precedence);
        assert_eq!(cfg.capture_accept_terminator, "enter");
    }

    #[test]
    fn partial_ron_keeps_defaults() {
        let cfg = EngineConfig::from_ron("(specificity_precedence: true, history_capacity: 8)")
            .expect("parse");
        assert!(cfg.specificity_precedence);
        assert_eq!(cfg.history_capacity, 8);
        assert_eq!(cfg.sequence_timeout_ms, 1200);
    }

    #[test]
    fn errors_render() {
        let err = EngineConfig::from_ron("(history_capacity: \"x\")").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { line: 1, .. }));
        assert!(err.pretty().starts_with("Engine config parse error at line 1"));

        let err = EngineConfig::from_ron("(history_capacity: 0)").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));

        let err = EngineConfig::from_ron("(capture_cancel_terminator: \"nope\")").unwrap_err();
        assert!(err.pretty().contains("capture_cancel_terminator"));
    }
}
