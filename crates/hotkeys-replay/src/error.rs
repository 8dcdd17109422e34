//! Error handling for the hotkeys-replay crate.

use std::{io, path::PathBuf, result};

use hotkeys_engine::ConfigError;
use ron::error::SpannedError;
use thiserror::Error;

/// Convenient result type for replay operations.
pub type Result<T> = result::Result<T, Error>;

/// Errors that can occur while loading or replaying a script.
#[derive(Debug, Error)]
pub enum Error {
    /// The script file could not be read.
    #[error("Failed to read {path}: {source}")]
    Read {
        /// Script path.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },
    /// RON syntax or type error in the script.
    #[error("Script parse error at line {line}, column {col}: {message}")]
    Parse {
        /// 1-based line number.
        line: usize,
        /// 1-based column number.
        col: usize,
        /// Human-readable error message.
        message: String,
    },
    /// The embedded engine config is unusable.
    #[error("{}", .0.pretty())]
    Config(#[from] ConfigError),
    /// The engine refused an operation.
    #[error("Engine error: {0}")]
    Engine(#[from] hotkeys_engine::Error),
    /// The script is well formed but inconsistent.
    #[error("Invalid script: {0}")]
    Invalid(String),
}

impl From<SpannedError> for Error {
    fn from(err: SpannedError) -> Self {
        Self::Parse {
            line: err.span.start.line,
            col: err.span.start.col,
            message: err.code.to_string(),
        }
    }
}

impl Error {
    /// Helper for script consistency errors.
    pub fn invalid<M: Into<String>>(msg: M) -> Self {
        Self::Invalid(msg.into())
    }
}
