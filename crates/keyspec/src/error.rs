use thiserror::Error;

/// Errors produced while parsing a combo string.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ParseError {
    /// The combo contained no fragments at all.
    #[error("Empty hotkey combo")]
    EmptyCombo,

    /// A `+`-joined member is neither a modifier nor a known key.
    #[error("Invalid hotkey fragment '{fragment}': unknown member '{member}'")]
    InvalidMember { fragment: String, member: String },

    /// The fragment only named modifiers.
    #[error("Invalid hotkey fragment '{fragment}': no key identity")]
    MissingIdentity { fragment: String },

    /// The combo does not have the `initiator \c|\s [terminator]` shape.
    #[error("Invalid capture combo '{combo}': {reason}")]
    InvalidCapture { combo: String, reason: String },
}
