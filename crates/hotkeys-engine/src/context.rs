//! Named collections of hotkeys.

use std::{collections::BTreeMap, sync::Arc};

use keyspec::KeyEventKind;
use tracing::trace;

use crate::hotkey::{HotkeyCallback, HotkeyData, HotkeyOptions};

/// A named set of hotkeys, partitioned by mode. A combo is unique per mode.
///
/// Hotkeys keep their registration order, which is also their matching order. Registering
/// an existing combo again replaces it in place.
#[derive(Clone, Debug, Default)]
pub struct HotkeysContext {
    /// Context name.
    name: String,
    /// Keydown hotkeys in registration order.
    keydown: Vec<Arc<HotkeyData>>,
    /// Keyup hotkeys in registration order.
    keyup: Vec<Arc<HotkeyData>>,
}

impl HotkeysContext {
    /// Create an empty context.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Context name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Hotkeys of one mode.
    fn mode_hotkeys(&self, mode: KeyEventKind) -> &Vec<Arc<HotkeyData>> {
        match mode {
            KeyEventKind::KeyDown => &self.keydown,
            KeyEventKind::KeyUp => &self.keyup,
        }
    }

    /// Mutable hotkeys of one mode.
    fn mode_hotkeys_mut(&mut self, mode: KeyEventKind) -> &mut Vec<Arc<HotkeyData>> {
        match mode {
            KeyEventKind::KeyDown => &mut self.keydown,
            KeyEventKind::KeyUp => &mut self.keyup,
        }
    }

    /// Register `callback` under every combo in `triggers`.
    pub fn register<I, S>(&mut self, triggers: I, callback: &HotkeyCallback, options: &HotkeyOptions)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for combo in triggers {
            let hotkey = HotkeyData::new(combo.as_ref(), callback.clone(), options.clone());
            self.register_hotkey(Arc::new(hotkey));
        }
    }

    /// Register a prebuilt hotkey, replacing any hotkey with the same combo and mode.
    pub fn register_hotkey(&mut self, hotkey: Arc<HotkeyData>) {
        trace!("context {}: register {}", self.name, hotkey.combo());
        let slot = self.mode_hotkeys_mut(hotkey.mode());
        match slot.iter_mut().find(|h| h.combo() == hotkey.combo()) {
            Some(existing) => *existing = hotkey,
            None => slot.push(hotkey),
        }
    }

    /// Remove every combo in `triggers` from `mode`.
    pub fn unregister<I, S>(&mut self, triggers: I, mode: KeyEventKind)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for combo in triggers {
            let combo = combo.as_ref();
            self.mode_hotkeys_mut(mode).retain(|h| h.combo() != combo);
        }
    }

    /// True if `combo` is registered for `mode`.
    pub fn has_hotkey(&self, combo: &str, mode: KeyEventKind) -> bool {
        self.hotkey(combo, mode).is_some()
    }

    /// The hotkey registered under `combo` for `mode`.
    pub fn hotkey(&self, combo: &str, mode: KeyEventKind) -> Option<&Arc<HotkeyData>> {
        self.mode_hotkeys(mode).iter().find(|h| h.combo() == combo)
    }

    /// Every hotkey: keydown first, then keyup, each in registration order.
    pub fn hotkeys(&self) -> impl Iterator<Item = &Arc<HotkeyData>> {
        self.keydown.iter().chain(self.keyup.iter())
    }

    /// Hotkeys of a single mode in registration order.
    pub fn hotkeys_for(&self, mode: KeyEventKind) -> &[Arc<HotkeyData>] {
        self.mode_hotkeys(mode)
    }

    /// Hotkeys grouped by their description group.
    pub fn hotkeys_by_group(&self) -> BTreeMap<String, Vec<Arc<HotkeyData>>> {
        let mut groups: BTreeMap<String, Vec<Arc<HotkeyData>>> = BTreeMap::new();
        for hotkey in self.hotkeys() {
            groups
                .entry(hotkey.group().to_string())
                .or_default()
                .push(hotkey.clone());
        }
        groups
    }

    /// Total number of hotkeys.
    pub fn len(&self) -> usize {
        self.keydown.len() + self.keyup.len()
    }

    /// True if no hotkeys are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
