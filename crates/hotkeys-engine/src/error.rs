use std::result::Result as StdResult;

use thiserror::Error;

use crate::component::ActionName;

/// Convenient result type for the engine crate.
pub type Result<T> = StdResult<T, Error>;

/// Unified error type for the hotkey engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    /// A combo string could not be parsed.
    #[error("Invalid hotkey combo: {0}")]
    Parse(#[from] keyspec::ParseError),

    /// No context is declared under this name.
    #[error("Context '{0}' doesn't exist")]
    UnknownContext(String),

    /// The operation needs a loaded context.
    #[error("No context loaded")]
    NoContextLoaded,

    /// `load_previous_context` was called with an empty context stack.
    #[error("No previous context to load")]
    NoPreviousContext,

    /// The manager was destroyed and must not be used anymore.
    #[error("The hotkeys manager is destroyed")]
    Destroyed,

    /// A component context was marked final, so new actions are rejected.
    #[error("Component context '{context}' is final; cannot register action '{action}'")]
    FinalContext {
        /// Component context name.
        context: String,
        /// Action that was being registered.
        action: ActionName,
    },

    /// No action with this name exists on the component context or its children.
    #[error("Unknown hotkey action '{0}'")]
    UnknownAction(ActionName),

    /// `generate_hotkeys_context` was called twice without a drop in between.
    #[error("Hotkeys context for '{0}' was already generated")]
    AlreadyGenerated(String),

    /// `drop_hotkeys_context` was called with nothing generated.
    #[error("Hotkeys context for '{0}' is not generated")]
    NotGenerated(String),

    /// Generic error with context.
    #[error("Engine error: {0}")]
    Msg(String),
}
