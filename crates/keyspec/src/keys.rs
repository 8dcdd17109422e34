//! Key tables and predicates over keyboard-event key values.
//!
//! Key values follow the host keyboard-event model: printable keys are the character they
//! produce (`"a"`, `"A"`, `"@"`, `" "`), everything else uses its standard name
//! (`"Enter"`, `"ArrowUp"`, `"F5"`).

/// Combo keyword for the shift modifier.
pub const SHIFT_KEY: &str = "shift";
/// Combo keyword for the control modifier.
pub const CONTROL_KEY: &str = "ctrl";
/// Combo keyword treated as control.
pub const COMMAND_KEY: &str = "cmd";
/// Combo keyword for the alt modifier.
pub const ALT_KEY: &str = "alt";
/// Combo keyword treated as alt.
pub const OPTIONS_KEY: &str = "opt";

/// Metakey matching any digit.
pub const NUMERIC_METAKEY: &str = "\\d";
/// Metakey matching any letter.
pub const LETTER_METAKEY: &str = "\\l";
/// Capture metakey for free-form string input.
pub const STRING_METAKEY: &str = "\\s";
/// Capture metakey for a single character.
pub const CHARACTER_METAKEY: &str = "\\c";

/// Digit key values.
const DIGITS: [&str; 10] = ["0", "1", "2", "3", "4", "5", "6", "7", "8", "9"];

/// Lowercase letter key values.
const LOWER_LETTERS: [&str; 26] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z",
];

/// Uppercase letter key values.
const UPPER_LETTERS: [&str; 26] = [
    "A", "B", "C", "D", "E", "F", "G", "H", "I", "J", "K", "L", "M", "N", "O", "P", "Q", "R",
    "S", "T", "U", "V", "W", "X", "Y", "Z",
];

/// Non-letter, non-digit keys that produce a character.
const PUNCTUATION: [&str; 32] = [
    "!", "\"", "#", "$", "%", "&", "'", "(", ")", "*", "+", ",", "-", ".", "/", ":", ";", "<",
    "=", ">", "?", "@", "[", "\\", "]", "^", "_", "`", "{", "|", "}", "~",
];

/// Key values of keys that only modify other keys.
const MODIFIER_KEYS: [&str; 14] = [
    "Alt",
    "AltGraph",
    "CapsLock",
    "Control",
    "Fn",
    "FnLock",
    "Hyper",
    "Meta",
    "NumLock",
    "ScrollLock",
    "Shift",
    "Super",
    "Symbol",
    "SymbolLock",
];

/// US keyboard layout: unshifted key -> shifted key.
const SHIFT_MUTATIONS_US: [(&str, &str); 47] = [
    ("1", "!"),
    ("2", "@"),
    ("3", "#"),
    ("4", "$"),
    ("5", "%"),
    ("6", "^"),
    ("7", "&"),
    ("8", "*"),
    ("9", "("),
    ("0", ")"),
    ("`", "~"),
    ("-", "_"),
    ("=", "+"),
    ("[", "{"),
    ("]", "}"),
    ("\\", "|"),
    (";", ":"),
    ("'", "\""),
    (",", "<"),
    (".", ">"),
    ("/", "?"),
    ("a", "A"),
    ("b", "B"),
    ("c", "C"),
    ("d", "D"),
    ("e", "E"),
    ("f", "F"),
    ("g", "G"),
    ("h", "H"),
    ("i", "I"),
    ("j", "J"),
    ("k", "K"),
    ("l", "L"),
    ("m", "M"),
    ("n", "N"),
    ("o", "O"),
    ("p", "P"),
    ("q", "Q"),
    ("r", "R"),
    ("s", "S"),
    ("t", "T"),
    ("u", "U"),
    ("v", "V"),
    ("w", "W"),
    ("x", "X"),
    ("y", "Y"),
    ("z", "Z"),
];

/// True for key values of modifier keys (`"Shift"`, `"Control"`, ...). Case sensitive.
pub fn is_modifier(key: &str) -> bool {
    MODIFIER_KEYS.contains(&key)
}

/// True for the digit keys `0`-`9`.
pub fn is_numeric(key: &str) -> bool {
    DIGITS.contains(&key)
}

/// True for ASCII letters in either case.
pub fn is_letter(key: &str) -> bool {
    LOWER_LETTERS.contains(&key) || UPPER_LETTERS.contains(&key)
}

/// True for punctuation keys that produce a character.
pub fn is_punctuation(key: &str) -> bool {
    PUNCTUATION.contains(&key)
}

/// True if the key produces a character when typed (letters, digits, punctuation, space).
pub fn is_character_producing(key: &str) -> bool {
    is_letter(key) || is_numeric(key) || is_punctuation(key) || key == " "
}

/// True if a combo string contains a capture metakey (`\c` or `\s`).
pub fn includes_capture_metakey(combo: &str) -> bool {
    combo.contains(STRING_METAKEY) || combo.contains(CHARACTER_METAKEY)
}

/// The shifted counterpart of a key on a US layout, if it has one.
pub fn shift_mutation(key: &str) -> Option<&'static str> {
    SHIFT_MUTATIONS_US
        .iter()
        .find(|(plain, _)| *plain == key)
        .map(|(_, shifted)| *shifted)
}

/// Resolve a named-key alias from the combo grammar to its key value.
pub fn named_key(alias: &str) -> Option<&'static str> {
    let key = match alias {
        "esc" => "Escape",
        "enter" => "Enter",
        "space" => " ",
        "tab" => "Tab",
        "backspace" => "Backspace",
        "del" => "Delete",
        "ins" => "Insert",
        "home" => "Home",
        "end" => "End",
        "pgup" => "PageUp",
        "pgdown" => "PageDown",
        "up" => "ArrowUp",
        "down" => "ArrowDown",
        "left" => "ArrowLeft",
        "right" => "ArrowRight",
        "caps" => "CapsLock",
        "num" => "NumLock",
        "scroll" => "ScrollLock",
        "f1" => "F1",
        "f2" => "F2",
        "f3" => "F3",
        "f4" => "F4",
        "f5" => "F5",
        "f6" => "F6",
        "f7" => "F7",
        "f8" => "F8",
        "f9" => "F9",
        "f10" => "F10",
        "f11" => "F11",
        "f12" => "F12",
        _ => return None,
    };
    Some(key)
}

/// True for the matching metakeys `\d` and `\l`.
pub fn is_metakey(token: &str) -> bool {
    token == NUMERIC_METAKEY || token == LETTER_METAKEY
}

/// The key values a matching metakey stands for.
pub fn metakey_expansion(token: &str) -> &'static [&'static str] {
    match token {
        NUMERIC_METAKEY => &DIGITS,
        LETTER_METAKEY => &LETTERS_BOTH_CASES,
        _ => &[],
    }
}

/// All letters, lowercase first.
const LETTERS_BOTH_CASES: [&str; 52] = [
    "a", "b", "c", "d", "e", "f", "g", "h", "i", "j", "k", "l", "m", "n", "o", "p", "q", "r",
    "s", "t", "u", "v", "w", "x", "y", "z", "A", "B", "C", "D", "E", "F", "G", "H", "I", "J",
    "K", "L", "M", "N", "O", "P", "Q", "R", "S", "T", "U", "V", "W", "X", "Y", "Z",
];

/// True if a combo member can serve as a fragment identity.
pub(crate) fn is_identity_token(token: &str) -> bool {
    if is_modifier(token) {
        return false;
    }
    is_letter(token)
        || is_numeric(token)
        || is_punctuation(token)
        || named_key(token).is_some()
        || is_metakey(token)
}

/// True if the letter is uppercase.
pub(crate) fn is_upper_letter(token: &str) -> bool {
    UPPER_LETTERS.contains(&token)
}
