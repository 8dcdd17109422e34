//! Hotkeys Engine
//!
//! Decides, on every keystroke, which registered hotkey fires:
//! - records keyboard events in bounded per-mode histories
//! - matches combos (sequences, numeric motions, captures) against those histories
//! - runs at most one callback per event, serialized by an execution lock
//! - manages named contexts with a push/pop stack and deferred switching
//!
//! The main types:
//! - [`HotkeyContextManager`]: declare contexts, load them, and feed it events
//! - [`HotkeysContext`] and [`ComponentHotkeyContext`]: the hotkey sets themselves
//! - [`HotkeysController`]: the dispatcher bound to the loaded context
//!
//! Combo parsing lives in the `keyspec` crate.

mod component;
mod config;
mod context;
mod controller;
mod error;
mod history;
mod hotkey;
mod manager;
pub mod test_support;

pub use component::{
    ActionName, ComponentHotkeyContext, DROP_HOTKEY_CONTEXT, HotkeyAction, HotkeyActionParams,
    OverwriteBehavior, WASD_NAVIGATION,
};
pub use config::{
    ConfigError, EngineConfig, MAX_PAST_EVENTS, MAX_PAST_HOTKEYS_TRIGGERED,
    MAX_TIME_BETWEEN_SEQUENCE_KEYSTROKES_MS, MIN_TIME_BETWEEN_HOTKEY_REPEATS_MS,
};
pub use context::HotkeysContext;
pub use controller::{DispatchOutcome, HotkeysController, TriggeredHotkey};
pub use error::{Error, Result};
pub use history::EventHistory;
pub use hotkey::{
    CallbackError, CallbackResult, CaptureOutcome, HOTKEYS_GENERAL_GROUP, HOTKEYS_HIDDEN_GROUP,
    HotkeyCallback, HotkeyData, HotkeyInvocation, HotkeyMatch, HotkeyOptions, async_callback,
    callback, noop_callback,
};
pub use manager::{
    ContextEvent, HotkeyContextManager, hotkeys_manager, setup_hotkeys_manager,
    teardown_hotkeys_manager,
};
