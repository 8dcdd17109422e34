use serde::{Deserialize, Serialize};

/// Which keyboard event a key event (or a hotkey) belongs to.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyEventKind {
    /// Key pressed.
    #[default]
    KeyDown,
    /// Key released.
    KeyUp,
}

impl KeyEventKind {
    /// Lowercase name as used by the host event model.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::KeyDown => "keydown",
            Self::KeyUp => "keyup",
        }
    }
}

/// The kind of element an event originated from.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventTarget {
    /// The document body, or no particular element.
    #[default]
    Document,
    /// A single-line text input.
    TextInput,
    /// A multi-line text area.
    TextArea,
    /// Any other element.
    Other,
}

impl EventTarget {
    /// True for elements the user types text into.
    pub fn is_text_input(self) -> bool {
        matches!(self, Self::TextInput | Self::TextArea)
    }
}

/// A keyboard event as seen by the engine.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct KeyEvent {
    /// Key value (`"a"`, `"A"`, `"@"`, `"Enter"`, `"ArrowUp"`, `" "`, ...).
    pub key: String,
    /// Key down or key up.
    #[serde(default)]
    pub kind: KeyEventKind,
    /// Control (or command) held.
    #[serde(default)]
    pub ctrl: bool,
    /// Shift held.
    #[serde(default)]
    pub shift: bool,
    /// Alt (or option) held.
    #[serde(default)]
    pub alt: bool,
    /// OS auto-repeat event from a held key.
    #[serde(default)]
    pub repeat: bool,
    /// Event timestamp in milliseconds.
    #[serde(default)]
    pub timestamp_ms: u64,
    /// Element the event originated from.
    #[serde(default)]
    pub target: EventTarget,
}

impl KeyEvent {
    /// A key down event with no modifiers.
    pub fn down(key: impl Into<String>) -> Self {
        Self::new(key, KeyEventKind::KeyDown)
    }

    /// A key up event with no modifiers.
    pub fn up(key: impl Into<String>) -> Self {
        Self::new(key, KeyEventKind::KeyUp)
    }

    /// An event of the given kind with no modifiers.
    pub fn new(key: impl Into<String>, kind: KeyEventKind) -> Self {
        Self {
            key: key.into(),
            kind,
            ctrl: false,
            shift: false,
            alt: false,
            repeat: false,
            timestamp_ms: 0,
            target: EventTarget::Document,
        }
    }

    /// Mark control as held.
    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    /// Mark shift as held.
    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// Mark alt as held.
    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// Mark the event as an OS auto-repeat.
    pub fn repeating(mut self) -> Self {
        self.repeat = true;
        self
    }

    /// Set the event timestamp.
    pub fn at(mut self, timestamp_ms: u64) -> Self {
        self.timestamp_ms = timestamp_ms;
        self
    }

    /// Set the originating element kind.
    pub fn from_target(mut self, target: EventTarget) -> Self {
        self.target = target;
        self
    }

    /// True if any modifier flag is held.
    pub fn has_modifiers(&self) -> bool {
        self.ctrl || self.shift || self.alt
    }
}
