//! keyspec: the hotkey combo grammar.
//!
//! - [`KeyEvent`]: a keyboard event as delivered by the host (key value, modifier flags,
//!   repeat flag, timestamp, and the kind of element it originated from).
//! - [`HotkeyFragment`]: one whitespace-delimited step of a combo (`"ctrl+shift+a"`), with
//!   its required modifiers, primary identity and alternate identities.
//! - [`parse_combo`]: split a full combo (`"g g"`, `"\d j"`) into fragments.
//! - [`HotkeyCaptureMatcher`]: the "type until terminator" matcher for `\c` / `\s` combos.
//!
//! Identities are normalized to keyboard-event key values (`"up"` becomes `"ArrowUp"`,
//! `"space"` becomes `" "`). Shift mutations assume a US keyboard layout.

mod capture;
mod error;
mod event;
mod fragment;
pub mod keys;

pub use capture::{
    CaptureKind, CaptureState, DEFAULT_CAPTURE_ACCEPT_TERMINATOR,
    DEFAULT_CAPTURE_CANCEL_TERMINATOR, HotkeyCaptureMatcher,
};
pub use error::ParseError;
pub use event::{EventTarget, KeyEvent, KeyEventKind};
pub use fragment::{HotkeyFragment, parse_combo};
pub use keys::{
    includes_capture_metakey, is_character_producing, is_letter, is_modifier, is_numeric,
};
