#![warn(missing_docs)]

//! Replay scripted key events through the hotkey engine.
//!
//! A [`Script`] declares contexts and their hotkeys, then lists [`Step`]s: key events,
//! typed text, and context switches. [`replay`] drives a fresh
//! [`hotkeys_engine::HotkeyContextManager`] through the steps and returns one
//! [`ReplayLine`] per step.

pub mod error;
mod runner;
mod script;

pub use error::{Error, Result};
pub use runner::{ReplayLine, Replayer, replay};
pub use script::{ContextSpec, HotkeyAction, HotkeySpec, Script, Step};
