//! The replay script format.
//!
//! ```ron
//! (
//!     config: Some((sequence_timeout_ms: 800)),
//!     contexts: [
//!         (
//!             name: "main",
//!             hotkeys: [
//!                 (combos: ["ctrl+s"], options: (description: Some("<file>Save"))),
//!                 (combos: ["o"], action: Push("dialog")),
//!             ],
//!         ),
//!     ],
//!     load: Some("main"),
//!     steps: [Type("3g"), Key((key: "s", ctrl: true))],
//! )
//! ```

use std::{fs, path::Path};

use hotkeys_engine::{EngineConfig, HotkeyOptions};
use keyspec::KeyEvent;
use serde::Deserialize;

use crate::error::{Error, Result};

/// What a scripted hotkey does besides being reported.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum HotkeyAction {
    /// Report only.
    #[default]
    Report,
    /// Load a context, forgetting the current one.
    Load(String),
    /// Load a context, pushing the current one onto the stack.
    Push(String),
    /// Return to the previous context.
    Back,
}

/// One hotkey registration.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct HotkeySpec {
    /// Combos sharing the callback and options.
    pub combos: Vec<String>,
    /// Registration options.
    #[serde(default)]
    pub options: HotkeyOptions,
    /// Side effect of firing.
    #[serde(default)]
    pub action: HotkeyAction,
}

/// A named context and its hotkeys.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ContextSpec {
    /// Context name.
    pub name: String,
    /// Hotkeys registered on the context.
    #[serde(default)]
    pub hotkeys: Vec<HotkeySpec>,
}

/// One replay step.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub enum Step {
    /// Dispatch one event. A zero timestamp takes the replay clock.
    Key(KeyEvent),
    /// Dispatch a keydown for every character. Uppercase letters hold shift.
    Type(String),
    /// Load a context, forgetting the current one.
    Load(String),
    /// Load a context, pushing the current one.
    Push(String),
    /// Return to the previous context.
    Back,
    /// Lock context control.
    Lock,
    /// Unlock context control, applying any deferred load.
    Unlock,
    /// Advance the replay clock by this many milliseconds.
    Wait(u64),
}

/// A full replay script.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Script {
    /// Engine tunables. Defaults when absent.
    pub config: Option<EngineConfig>,
    /// Contexts declared before the first step.
    pub contexts: Vec<ContextSpec>,
    /// Context loaded before the first step.
    pub load: Option<String>,
    /// Milliseconds the replay clock advances per event.
    pub step_ms: Option<u64>,
    /// Steps in order.
    pub steps: Vec<Step>,
}

impl Script {
    /// Parse and check a script from RON text.
    pub fn from_ron(text: &str) -> Result<Self> {
        let script: Self = ron::from_str(text)?;
        script.validate()?;
        Ok(script)
    }

    /// Read and parse a script file.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|source| Error::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron(&text)
    }

    /// Reject scripts that reference contexts they never declare.
    pub fn validate(&self) -> Result<()> {
        if let Some(config) = &self.config {
            config.validate()?;
        }
        let mut names: Vec<&str> = Vec::with_capacity(self.contexts.len());
        for ctx in &self.contexts {
            if names.contains(&ctx.name.as_str()) {
                return Err(Error::invalid(format!("context {} declared twice", ctx.name)));
            }
            names.push(&ctx.name);
        }
        let known = |name: &str| names.contains(&name);

        if let Some(load) = &self.load
            && !known(load)
        {
            return Err(Error::invalid(format!("load names unknown context {load}")));
        }
        for ctx in &self.contexts {
            for hk in &ctx.hotkeys {
                if hk.combos.is_empty() {
                    return Err(Error::invalid(format!(
                        "hotkey without combos in context {}",
                        ctx.name
                    )));
                }
                if let HotkeyAction::Load(target) | HotkeyAction::Push(target) = &hk.action
                    && !known(target)
                {
                    return Err(Error::invalid(format!(
                        "hotkey {} targets unknown context {target}",
                        hk.combos.join(", ")
                    )));
                }
            }
        }
        for step in &self.steps {
            if let Step::Load(target) | Step::Push(target) = step
                && !known(target)
            {
                return Err(Error::invalid(format!("step targets unknown context {target}")));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keyspec::KeyEventKind;

    #[test]
    fn parses_a_full_script() {
        let script = Script::from_ron(
            r#"(
                config: Some((repeat_min_interval_ms: 50)),
                contexts: [
                    (name: "main", hotkeys: [
                        (combos: ["ctrl+s"], options: (description: Some("<file>Save"))),
                        (combos: ["o"], action: Push("dialog")),
                    ]),
                    (name: "dialog", hotkeys: [(combos: ["esc"], action: Back)]),
                ],
                load: Some("main"),
                steps: [Type("3g"), Key((key: "s", ctrl: true, kind: keyup)), Wait(2000), Back],
            )"#,
        )
        .expect("script");
        assert_eq!(script.config.expect("config").repeat_min_interval_ms, 50);
        assert_eq!(script.contexts.len(), 2);
        assert_eq!(script.contexts[0].hotkeys[1].action, HotkeyAction::Push("dialog".into()));
        match &script.steps[1] {
            Step::Key(ev) => {
                assert!(ev.ctrl);
                assert_eq!(ev.kind, KeyEventKind::KeyUp);
            }
            other => panic!("unexpected step {other:?}"),
        }
    }

    #[test]
    fn unknown_targets_are_rejected() {
        let err = Script::from_ron(r#"(contexts: [(name: "main")], load: Some("nope"))"#)
            .expect_err("unknown load");
        assert!(matches!(err, Error::Invalid(_)));

        let err = Script::from_ron(
            r#"(contexts: [(name: "main", hotkeys: [(combos: ["x"], action: Load("gone"))])])"#,
        )
        .expect_err("unknown action target");
        assert!(err.to_string().contains("gone"));
    }

    #[test]
    fn syntax_errors_carry_a_location() {
        let err = Script::from_ron("(contexts: [(name: )])").expect_err("syntax");
        assert!(matches!(err, Error::Parse { line: 1, .. }));
    }
}
