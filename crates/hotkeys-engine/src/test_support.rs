//! Test support utilities for hotkeys-engine unit and integration tests.
//! These helpers are public to avoid dead_code warnings and are lightweight.

use std::sync::Arc;

use keyspec::KeyEvent;
use parking_lot::Mutex;

use crate::{
    controller::{DispatchOutcome, HotkeysController},
    hotkey::{HotkeyCallback, HotkeyInvocation, callback},
};

/// Keydown events for whitespace-separated key values, 10ms apart starting at 1000ms.
pub fn type_keys(keys: &str) -> Vec<KeyEvent> {
    keys_at(keys, 1000, 10)
}

/// Keydown events for whitespace-separated key values with explicit timing.
pub fn keys_at(keys: &str, start_ms: u64, step_ms: u64) -> Vec<KeyEvent> {
    keys.split_whitespace()
        .zip(0u64..)
        .map(|(key, i)| keydown(key).at(start_ms + i * step_ms))
        .collect()
}

/// A keydown event. Single uppercase letters get the shift flag, as a browser reports them.
pub fn keydown(key: &str) -> KeyEvent {
    let event = KeyEvent::down(key);
    if key.chars().count() == 1 && key.chars().all(|c| c.is_ascii_uppercase()) {
        event.with_shift()
    } else {
        event
    }
}

/// Feed every event to `controller`, collecting the outcomes.
pub async fn dispatch_all(
    controller: &HotkeysController,
    events: impl IntoIterator<Item = KeyEvent>,
) -> Vec<DispatchOutcome> {
    let mut out = Vec::new();
    for event in events {
        out.push(controller.dispatch(event).await);
    }
    out
}

/// Records every invocation of the callbacks it hands out.
#[derive(Clone, Default)]
pub struct Recorder {
    /// Invocations in call order.
    calls: Arc<Mutex<Vec<HotkeyInvocation>>>,
}

impl Recorder {
    /// New, empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    /// A callback that appends its invocation to this recorder.
    pub fn callback(&self) -> HotkeyCallback {
        let calls = self.calls.clone();
        callback(move |_, invocation| {
            calls.lock().push(invocation.clone());
        })
    }

    /// Snapshot of every invocation.
    pub fn calls(&self) -> Vec<HotkeyInvocation> {
        self.calls.lock().clone()
    }

    /// Combos that fired, in order.
    pub fn combos(&self) -> Vec<String> {
        self.calls.lock().iter().map(|c| c.combo.clone()).collect()
    }

    /// Number of invocations.
    pub fn count(&self) -> usize {
        self.calls.lock().len()
    }
}
