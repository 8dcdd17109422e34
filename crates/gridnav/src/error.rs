use std::result::Result as StdResult;

use thiserror::Error;

/// Convenient result type for grid navigation.
pub type Result<T> = StdResult<T, GridError>;

/// Errors from grid setup and cursor placement.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GridError {
    /// The grid container does not exist.
    #[error("Grid parent '{0}' not found")]
    MissingParent(String),

    /// The navigator was destroyed.
    #[error("Grid navigator is destroyed")]
    Destroyed,

    /// The grid has not been set up yet.
    #[error("Grid navigator is not set up")]
    NotSetUp,

    /// A cursor position is outside the grid.
    #[error("Cursor position {index} is out of bounds for {len} members")]
    OutOfBounds {
        /// Requested sequence index.
        index: usize,
        /// Number of members.
        len: usize,
    },
}
