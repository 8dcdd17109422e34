//! Capture matching: `initiator \c|\s [terminator]` combos accumulate typed characters
//! instead of firing on a single fragment.

use tracing::trace;

use crate::{
    HotkeyFragment, KeyEvent, ParseError,
    keys::{self, CHARACTER_METAKEY, STRING_METAKEY},
};

/// Accept terminator used when a capture combo names none.
pub const DEFAULT_CAPTURE_ACCEPT_TERMINATOR: &str = "enter";
/// Cancel terminator for every capture combo.
pub const DEFAULT_CAPTURE_CANCEL_TERMINATOR: &str = "esc";

/// Key value that removes the last captured character.
const BACKSPACE: &str = "Backspace";

/// What a capture collects.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CaptureKind {
    /// `\c`: one character, auto-accepted.
    Character,
    /// `\s`: free-form string until a terminator.
    String,
}

/// Capture lifecycle.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub enum CaptureState {
    /// Waiting for the initiator.
    #[default]
    Unactivated,
    /// Collecting characters.
    Active,
    /// Ended by the accept terminator or by reaching the maximum length.
    Complete,
    /// Ended by the cancel terminator.
    Cancelled,
}

impl CaptureState {
    /// True once the capture ended either way.
    pub fn is_finished(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }
}

/// State machine for one capture combo.
#[derive(Clone, Debug)]
pub struct HotkeyCaptureMatcher {
    /// Combo text as registered.
    combo: String,
    /// Fragment that starts the capture.
    initializer: HotkeyFragment,
    /// Fragment that completes the capture.
    accept_terminator: HotkeyFragment,
    /// Fragment that cancels the capture.
    cancel_terminator: HotkeyFragment,
    /// Character or string capture.
    kind: CaptureKind,
    /// Characters collected so far.
    captured: Vec<String>,
    /// Current state.
    state: CaptureState,
}

impl HotkeyCaptureMatcher {
    /// Parse a capture combo using the default terminators.
    pub fn parse(combo: &str) -> Result<Self, ParseError> {
        Self::with_terminators(
            combo,
            DEFAULT_CAPTURE_ACCEPT_TERMINATOR,
            DEFAULT_CAPTURE_CANCEL_TERMINATOR,
        )
    }

    /// Parse a capture combo. `accept` is used only when the combo has no explicit
    /// terminator.
    pub fn with_terminators(combo: &str, accept: &str, cancel: &str) -> Result<Self, ParseError> {
        let invalid = |reason: &str| ParseError::InvalidCapture {
            combo: combo.to_string(),
            reason: reason.to_string(),
        };

        let parts: Vec<&str> = combo.split_whitespace().collect();
        if !(2..=3).contains(&parts.len()) {
            return Err(invalid("expected 'initiator \\c|\\s [terminator]'"));
        }

        let kind = match parts[1] {
            CHARACTER_METAKEY => CaptureKind::Character,
            STRING_METAKEY => CaptureKind::String,
            other => return Err(invalid(&format!("unknown capture metakey '{other}'"))),
        };

        let accept_spec = parts.get(2).copied().unwrap_or(accept);

        Ok(Self {
            combo: combo.to_string(),
            initializer: HotkeyFragment::parse(parts[0])?,
            accept_terminator: HotkeyFragment::parse(accept_spec)?,
            cancel_terminator: HotkeyFragment::parse(cancel)?,
            kind,
            captured: Vec::new(),
            state: CaptureState::Unactivated,
        })
    }

    /// Combo text as registered.
    pub fn combo(&self) -> &str {
        &self.combo
    }

    /// Character or string capture.
    pub fn kind(&self) -> CaptureKind {
        self.kind
    }

    /// Fragment that starts the capture.
    pub fn initializer_fragment(&self) -> &HotkeyFragment {
        &self.initializer
    }

    /// Fragment that completes the capture.
    pub fn accept_terminator_fragment(&self) -> &HotkeyFragment {
        &self.accept_terminator
    }

    /// Fragment that cancels the capture.
    pub fn cancel_terminator_fragment(&self) -> &HotkeyFragment {
        &self.cancel_terminator
    }

    /// Current state.
    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Maximum number of characters, if bounded.
    pub fn max_length(&self) -> Option<usize> {
        match self.kind {
            CaptureKind::Character => Some(1),
            CaptureKind::String => None,
        }
    }

    /// Test the initiator against `event`. On a match the capture becomes active and any
    /// previously captured characters are discarded.
    pub fn try_trigger(&mut self, event: &KeyEvent) -> bool {
        let triggered = self.initializer.matches(event);
        if triggered {
            trace!("capture '{}' triggered", self.combo);
            self.captured.clear();
            self.state = CaptureState::Active;
        }
        triggered
    }

    /// Feed one event to an active capture. Returns true if the capture ended.
    ///
    /// # Panics
    /// If the capture is not [`CaptureState::Active`]; check [`Self::try_trigger`] first.
    pub fn capture(&mut self, event: &KeyEvent) -> bool {
        assert!(
            self.state == CaptureState::Active,
            "capture() called on '{}' while {:?}",
            self.combo,
            self.state
        );

        let mut accepted = self.accept_terminator.matches(event);
        let cancelled = !accepted && self.cancel_terminator.matches(event);

        if !accepted && !cancelled {
            if event.key == BACKSPACE {
                self.captured.pop();
            } else if keys::is_character_producing(&event.key) {
                self.captured.push(event.key.clone());
            }
            if self
                .max_length()
                .is_some_and(|max| self.captured.len() >= max)
            {
                accepted = true;
            }
        }

        if accepted {
            self.state = CaptureState::Complete;
        } else if cancelled {
            self.state = CaptureState::Cancelled;
        }
        accepted || cancelled
    }

    /// The captured text. Empty unless the capture completed.
    pub fn captured_string(&self) -> String {
        if self.state == CaptureState::Complete {
            self.captured.concat()
        } else {
            String::new()
        }
    }

    /// Characters collected so far, regardless of state.
    pub fn incomplete_captured_string(&self) -> String {
        self.captured.concat()
    }

    /// Return to [`CaptureState::Unactivated`] and forget captured characters.
    pub fn reset(&mut self) {
        self.state = CaptureState::Unactivated;
        self.captured.clear();
    }
}
