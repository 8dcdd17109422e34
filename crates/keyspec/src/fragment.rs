use std::{fmt, iter, str::FromStr};

use tracing::trace;

use crate::{
    KeyEvent, ParseError,
    keys::{self, ALT_KEY, COMMAND_KEY, CONTROL_KEY, NUMERIC_METAKEY, OPTIONS_KEY, SHIFT_KEY},
};

/// One key-press step of a combo, e.g. `"ctrl+shift+a"` in `"ctrl+shift+a g"`.
///
/// A parsed fragment always has exactly one primary identity. Additional identities come from
/// extra `+`-joined keys (`"a+x"`), US-layout shift mutations (`"shift+2"` also accepts
/// `"@"`) and metakey expansion (`"\d"` accepts every digit).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct HotkeyFragment {
    /// Fragment text as written.
    source: String,
    /// Combo token that produced the primary identity (`"up"` for `ArrowUp`).
    identity_token: String,
    /// Primary identity as a key value.
    identity: String,
    /// Alternate identities, in insertion order.
    alternates: Vec<String>,
    /// Control required.
    ctrl: bool,
    /// Shift required.
    shift: bool,
    /// Alt required.
    alt: bool,
    /// The identity was written as an uppercase letter.
    uppercase_explicit: bool,
    /// The identity is the `\d` metakey.
    numeric_metakey: bool,
}

/// Split a complete combo string into fragments.
///
/// Fragments are separated by whitespace, which is why the space key is spelled `space`.
/// Any invalid fragment invalidates the whole combo.
pub fn parse_combo(combo: &str) -> Result<Vec<HotkeyFragment>, ParseError> {
    let fragments = combo
        .split_whitespace()
        .map(HotkeyFragment::parse)
        .collect::<Result<Vec<_>, _>>()?;
    if fragments.is_empty() {
        return Err(ParseError::EmptyCombo);
    }
    Ok(fragments)
}

/// Split a fragment into its `+`-joined members, keeping a literal trailing `+` key.
fn split_members(fragment: &str) -> Vec<&str> {
    if fragment == "+" {
        return vec!["+"];
    }
    if let Some(prefix) = fragment.strip_suffix("++") {
        let mut members: Vec<&str> = prefix.split('+').collect();
        members.push("+");
        return members;
    }
    fragment.split('+').collect()
}

impl HotkeyFragment {
    /// Parse a single fragment such as `"ctrl+shift+a"`, `"esc"` or `"\d"`.
    pub fn parse(fragment: &str) -> Result<Self, ParseError> {
        let mut parsed = Self {
            source: fragment.to_string(),
            identity_token: String::new(),
            identity: String::new(),
            alternates: Vec::new(),
            ctrl: false,
            shift: false,
            alt: false,
            uppercase_explicit: false,
            numeric_metakey: false,
        };

        for member in split_members(fragment) {
            parsed.detect_member_role(member)?;
        }

        if parsed.identity.is_empty() {
            return Err(ParseError::MissingIdentity {
                fragment: fragment.to_string(),
            });
        }

        parsed.add_shift_mutations();
        Ok(parsed)
    }

    /// Classify one member: modifier keyword, identity, or invalid.
    fn detect_member_role(&mut self, member: &str) -> Result<(), ParseError> {
        match member {
            CONTROL_KEY | COMMAND_KEY => self.ctrl = true,
            SHIFT_KEY => self.shift = true,
            ALT_KEY | OPTIONS_KEY => self.alt = true,
            _ => {
                if !self.parse_identity_member(member) {
                    return Err(ParseError::InvalidMember {
                        fragment: self.source.clone(),
                        member: member.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Record an identity member. Returns false if the member is not a valid identity.
    fn parse_identity_member(&mut self, member: &str) -> bool {
        if !keys::is_identity_token(member) {
            return false;
        }

        let identity = keys::named_key(member).unwrap_or(member);

        if keys::is_metakey(member) {
            self.numeric_metakey = self.numeric_metakey || member == NUMERIC_METAKEY;
            self.alternates.extend(
                keys::metakey_expansion(member)
                    .iter()
                    .map(|k| (*k).to_string()),
            );
        }

        if self.identity.is_empty() {
            self.identity = identity.to_string();
            self.identity_token = member.to_string();
            self.uppercase_explicit = keys::is_upper_letter(member);
        } else {
            self.alternates.push(identity.to_string());
        }
        true
    }

    /// Add the US-layout shifted version of every identity when shift is required.
    fn add_shift_mutations(&mut self) {
        if !self.shift {
            return;
        }
        let mut shifted: Vec<String> = Vec::new();
        for identity in self.identities() {
            if let Some(mutation) = keys::shift_mutation(identity)
                && !shifted.iter().any(|s| s == mutation)
            {
                shifted.push(mutation.to_string());
            }
        }
        for mutation in shifted {
            if mutation != self.identity && !self.alternates.contains(&mutation) {
                self.alternates.push(mutation);
            }
        }
    }

    /// Fragment text as written.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Primary identity as a key value, e.g. `"a"` for `"ctrl+shift+a"`.
    pub fn identity(&self) -> &str {
        &self.identity
    }

    /// Alternate identities (shift mutations, metakey expansions, extra keys).
    pub fn alternate_identities(&self) -> &[String] {
        &self.alternates
    }

    /// Primary identity followed by all alternates.
    pub fn identities(&self) -> impl Iterator<Item = &str> {
        iter::once(self.identity.as_str()).chain(self.alternates.iter().map(String::as_str))
    }

    /// Control required.
    pub fn requires_ctrl(&self) -> bool {
        self.ctrl
    }

    /// Shift required.
    pub fn requires_shift(&self) -> bool {
        self.shift
    }

    /// Alt required.
    pub fn requires_alt(&self) -> bool {
        self.alt
    }

    /// Any modifier required.
    pub fn requires_modifier(&self) -> bool {
        self.ctrl || self.shift || self.alt
    }

    /// The identity was written as an uppercase letter, e.g. `"G"`.
    pub fn uppercase_explicit(&self) -> bool {
        self.uppercase_explicit
    }

    /// The fragment is the `\d` metakey.
    pub fn numeric_metakey(&self) -> bool {
        self.numeric_metakey
    }

    /// Match the fragment against a live key event.
    ///
    /// Events holding ctrl or alt never match fragments that do not require them, so plain
    /// hotkeys do not shadow host shortcuts. Shift is not treated the same way because it
    /// changes the produced key (`shift+2` is `"@"`).
    pub fn matches(&self, event: &KeyEvent) -> bool {
        if (event.alt && !self.alt) || (event.ctrl && !self.ctrl) {
            return false;
        }

        if !self.matches_identity(event) {
            trace!("fragment {} did not match '{}'", self.source, event.key);
            return false;
        }

        (!self.ctrl || event.ctrl) && (!self.shift || event.shift) && (!self.alt || event.alt)
    }

    /// Compare the event key against every identity.
    ///
    /// Letters compare case-sensitively unless shift is required; other keys compare
    /// case-insensitively so `"enter"` style names match `"Enter"`.
    fn matches_identity(&self, event: &KeyEvent) -> bool {
        let insensitive = self.shift || !keys::is_letter(&event.key);
        self.identities().any(|identity| {
            if insensitive {
                identity.eq_ignore_ascii_case(&event.key)
            } else {
                identity == event.key
            }
        })
    }

    /// True if this is a numeric metakey and the event is a digit.
    pub fn matches_numeric_metakey(&self, event: &KeyEvent) -> bool {
        self.numeric_metakey && keys::is_numeric(&event.key)
    }

    /// Canonical spec string: required modifiers (ctrl, alt, shift) then the identity token.
    pub fn to_spec(&self) -> String {
        let mut out: Vec<&str> = Vec::new();
        if self.ctrl {
            out.push(CONTROL_KEY);
        }
        if self.alt {
            out.push(ALT_KEY);
        }
        if self.shift {
            out.push(SHIFT_KEY);
        }
        out.push(&self.identity_token);
        out.join("+")
    }
}

impl FromStr for HotkeyFragment {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for HotkeyFragment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.source)
    }
}
