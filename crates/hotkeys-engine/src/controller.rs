//! The keyboard event dispatcher.
//!
//! The controller owns the trigger indexes and event histories of the bound context. Every
//! incoming event is recorded, matched against the hotkeys indexed under its key, and at
//! most one hotkey runs. State lives behind a `parking_lot` mutex that is released before
//! any callback runs, so callbacks may call back into the controller or the manager.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use parking_lot::Mutex;
use tracing::{debug, trace, warn};

use keyspec::{CaptureState, KeyEvent, KeyEventKind};

use crate::{
    config::EngineConfig,
    context::HotkeysContext,
    history::EventHistory,
    hotkey::{CaptureOutcome, HotkeyData},
};

/// A hotkey that ran, as remembered for repeat throttling.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TriggeredHotkey {
    /// Combo of the hotkey.
    pub combo: String,
    /// Timestamp of the event that fired it.
    pub trigger_time_ms: u64,
}

/// What the controller did with one event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The event came from a text input and was ignored.
    Ignored,
    /// Recorded; executions are paused or locked by a running hotkey.
    Forbidden,
    /// Recorded; nothing matched.
    NoMatch,
    /// A hotkey matched but was not run because it is an OS repeat.
    RepeatBlocked {
        /// Combo that matched.
        combo: String,
    },
    /// A hotkey matched but a previous run of it is still in progress.
    Busy {
        /// Combo that matched.
        combo: String,
    },
    /// A hotkey ran (or was spawned, for non-awaited hotkeys).
    Fired {
        /// Combo that fired.
        combo: String,
        /// Numeric arguments captured during matching.
        motions: Vec<u32>,
    },
    /// A capture hotkey's initiator matched; following keydowns feed the capture.
    CaptureStarted {
        /// Combo of the capture hotkey.
        combo: String,
    },
    /// The active capture consumed the event.
    Captured {
        /// Combo of the capture hotkey.
        combo: String,
        /// Text collected so far.
        progress: String,
    },
    /// The active capture ended and its callback ran.
    CaptureFinished {
        /// Combo of the capture hotkey.
        combo: String,
        /// How the capture ended.
        outcome: CaptureOutcome,
    },
}

impl DispatchOutcome {
    /// True if a hotkey callback ran or was spawned for this event.
    pub fn fired(&self) -> bool {
        matches!(self, Self::Fired { .. } | Self::CaptureFinished { .. })
    }
}

/// Mutable controller state.
struct ControllerState {
    /// Name of the bound context.
    context_name: Option<String>,
    /// Keydown hotkeys by trigger identity, in registration order.
    keydown_triggers: HashMap<String, Vec<Arc<HotkeyData>>>,
    /// Keyup hotkeys by trigger identity, in registration order.
    keyup_triggers: HashMap<String, Vec<Arc<HotkeyData>>>,
    /// Recent keydown events.
    past_keydowns: EventHistory<KeyEvent>,
    /// Recent keyup events.
    past_keyups: EventHistory<KeyEvent>,
    /// Recently triggered keydown hotkeys.
    triggered_keydowns: EventHistory<TriggeredHotkey>,
    /// Recently triggered keyup hotkeys.
    triggered_keyups: EventHistory<TriggeredHotkey>,
    /// Capture hotkey currently collecting input.
    active_capture: Option<Arc<HotkeyData>>,
}

impl ControllerState {
    /// Empty state sized from `config`.
    fn new(config: &EngineConfig) -> Self {
        Self {
            context_name: None,
            keydown_triggers: HashMap::new(),
            keyup_triggers: HashMap::new(),
            past_keydowns: EventHistory::new(config.history_capacity),
            past_keyups: EventHistory::new(config.history_capacity),
            triggered_keydowns: EventHistory::new(config.triggered_history_capacity),
            triggered_keyups: EventHistory::new(config.triggered_history_capacity),
            active_capture: None,
        }
    }

    /// Event history of a mode.
    fn history(&self, mode: KeyEventKind) -> &EventHistory<KeyEvent> {
        match mode {
            KeyEventKind::KeyDown => &self.past_keydowns,
            KeyEventKind::KeyUp => &self.past_keyups,
        }
    }

    /// Mutable event history of a mode.
    fn history_mut(&mut self, mode: KeyEventKind) -> &mut EventHistory<KeyEvent> {
        match mode {
            KeyEventKind::KeyDown => &mut self.past_keydowns,
            KeyEventKind::KeyUp => &mut self.past_keyups,
        }
    }

    /// Trigger index of a mode.
    fn triggers(&self, mode: KeyEventKind) -> &HashMap<String, Vec<Arc<HotkeyData>>> {
        match mode {
            KeyEventKind::KeyDown => &self.keydown_triggers,
            KeyEventKind::KeyUp => &self.keyup_triggers,
        }
    }

    /// Triggered-hotkey history of a mode.
    fn triggered_mut(&mut self, mode: KeyEventKind) -> &mut EventHistory<TriggeredHotkey> {
        match mode {
            KeyEventKind::KeyDown => &mut self.triggered_keydowns,
            KeyEventKind::KeyUp => &mut self.triggered_keyups,
        }
    }

    /// Candidates indexed under `key`: lowercase, uppercase, then exact, deduplicated.
    fn candidates(&self, key: &str, mode: KeyEventKind) -> Vec<Arc<HotkeyData>> {
        let index = self.triggers(mode);
        let mut out: Vec<Arc<HotkeyData>> = Vec::new();
        for variant in [key.to_lowercase(), key.to_uppercase(), key.to_string()] {
            for hotkey in index.get(&variant).into_iter().flatten() {
                if !out.iter().any(|h| Arc::ptr_eq(h, hotkey)) {
                    out.push(hotkey.clone());
                }
            }
        }
        out
    }

    /// True if an OS repeat of `hotkey` must not fire.
    fn should_block_repeat(&mut self, hotkey: &HotkeyData, event: &KeyEvent, min_ms: u64) -> bool {
        if !event.repeat {
            return false;
        }
        if !hotkey.can_repeat() {
            return true;
        }
        let Some(last) = self.triggered_mut(hotkey.mode()).peek_latest() else {
            return false;
        };
        if last.combo != hotkey.combo() {
            return false;
        }
        event.timestamp_ms.saturating_sub(last.trigger_time_ms) <= min_ms
    }
}

/// The keyboard event dispatcher. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct HotkeysController {
    /// Indexes, histories and capture state.
    state: Arc<Mutex<ControllerState>>,
    /// An awaited hotkey is running.
    locked_on_execution: Arc<AtomicBool>,
    /// Executions paused by the host.
    paused: Arc<AtomicBool>,
    /// Engine tunables.
    config: Arc<EngineConfig>,
}

/// What the locked half of dispatch decided.
enum DispatchStep {
    /// A hotkey matched the history.
    Select(Arc<HotkeyData>),
    /// The active capture took the event.
    Consumed(DispatchOutcome),
    /// The active capture ended; its callback runs next.
    Finished(Arc<HotkeyData>, CaptureOutcome),
}

/// Clears the execution lock on drop.
struct ExecutionLock(Arc<AtomicBool>);

impl Drop for ExecutionLock {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl Default for HotkeysController {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl HotkeysController {
    /// Create a controller with no context bound.
    pub fn new(config: EngineConfig) -> Self {
        Self {
            state: Arc::new(Mutex::new(ControllerState::new(&config))),
            locked_on_execution: Arc::new(AtomicBool::new(false)),
            paused: Arc::new(AtomicBool::new(false)),
            config: Arc::new(config),
        }
    }

    /// Engine tunables.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Index every valid hotkey of `context`, replacing the previous binding.
    pub fn bind_context(&self, context: &HotkeysContext) {
        let mut st = self.state.lock();
        if st.context_name.is_some() {
            Self::drop_locked(&mut st);
        }
        for hotkey in context.hotkeys() {
            if !hotkey.valid() {
                debug!("skipping invalid hotkey {}", hotkey.combo());
                continue;
            }
            hotkey.apply_capture_terminators(
                &self.config.capture_accept_terminator,
                &self.config.capture_cancel_terminator,
            );
            let index = match hotkey.mode() {
                KeyEventKind::KeyDown => &mut st.keydown_triggers,
                KeyEventKind::KeyUp => &mut st.keyup_triggers,
            };
            for trigger in hotkey.triggers() {
                index
                    .entry(trigger.to_string())
                    .or_default()
                    .push(hotkey.clone());
            }
        }
        st.context_name = Some(context.name().to_string());
        debug!(
            "bound context {} ({} keydown / {} keyup triggers)",
            context.name(),
            st.keydown_triggers.len(),
            st.keyup_triggers.len()
        );
    }

    /// Clear indexes, histories and any active capture.
    fn drop_locked(st: &mut ControllerState) {
        st.keydown_triggers.clear();
        st.keyup_triggers.clear();
        st.past_keydowns.clear();
        st.past_keyups.clear();
        if let Some(capture) = st.active_capture.take() {
            capture.with_capture(|m| m.reset());
        }
        st.context_name = None;
    }

    /// Unbind the current context so no keystroke state leaks into the next one.
    pub fn drop_context(&self) {
        let mut st = self.state.lock();
        if let Some(name) = &st.context_name {
            debug!("dropping context {}", name);
        }
        Self::drop_locked(&mut st);
    }

    /// True if a context is bound.
    pub fn has_context(&self) -> bool {
        self.state.lock().context_name.is_some()
    }

    /// Name of the bound context.
    pub fn context_name(&self) -> Option<String> {
        self.state.lock().context_name.clone()
    }

    /// Stop executing hotkeys. Events are still recorded.
    pub fn pause(&self) {
        self.paused.store(true, Ordering::Release);
    }

    /// Resume executing hotkeys.
    pub fn resume(&self) {
        self.paused.store(false, Ordering::Release);
    }

    /// True while paused.
    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    /// True while an awaited hotkey is running.
    pub fn is_locked_on_execution(&self) -> bool {
        self.locked_on_execution.load(Ordering::Acquire)
    }

    /// True if no hotkey may run right now.
    pub fn executions_forbidden(&self) -> bool {
        self.is_locked_on_execution() || self.is_paused()
    }

    /// The `n` most recent events of `mode`, newest first.
    ///
    /// Returns `None`, with a log line, if fewer than `n` are recorded.
    pub fn last_events(&self, mode: KeyEventKind, n: usize) -> Option<Vec<KeyEvent>> {
        let st = self.state.lock();
        let history = st.history(mode);
        let events = history.last_n(n).map(|v| v.into_iter().cloned().collect());
        if events.is_none() {
            debug!(
                "not enough past {} events: wanted {}, have {}",
                mode.as_str(),
                n,
                history.len()
            );
        }
        events
    }

    /// The run of digit keydowns ending at the most recent event, newest first.
    pub fn vim_motion_events(&self) -> Vec<KeyEvent> {
        let st = self.state.lock();
        st.past_keydowns
            .iter()
            .take_while(|e| keyspec::is_numeric(&e.key))
            .cloned()
            .collect()
    }

    /// Recently triggered hotkeys of `mode`, newest first.
    pub fn triggered_hotkeys(&self, mode: KeyEventKind) -> Vec<TriggeredHotkey> {
        let mut st = self.state.lock();
        st.triggered_mut(mode).iter().cloned().collect()
    }

    /// Combo of the capture collecting input, if any.
    pub fn active_capture(&self) -> Option<String> {
        self.state
            .lock()
            .active_capture
            .as_ref()
            .map(|h| h.combo().to_string())
    }

    /// Handle one keyboard event. At most one hotkey runs per event.
    ///
    /// Awaited hotkeys run to completion before this returns and hold the execution lock
    /// meanwhile. Other hotkeys are spawned onto the tokio runtime.
    pub async fn dispatch(&self, event: KeyEvent) -> DispatchOutcome {
        if event.target.is_text_input() {
            trace!("ignoring '{}' from a text input", event.key);
            return DispatchOutcome::Ignored;
        }

        let forbidden = self.executions_forbidden();
        let step = {
            let mut st = self.state.lock();
            st.history_mut(event.kind).push(event.clone());
            if forbidden || st.context_name.is_none() {
                None
            } else if st.active_capture.is_some() {
                Some(Self::feed_capture(&mut st, &event))
            } else {
                self.select(&st, &event).map(DispatchStep::Select)
            }
        };

        if forbidden {
            return DispatchOutcome::Forbidden;
        }
        match step {
            None => DispatchOutcome::NoMatch,
            Some(DispatchStep::Select(hotkey)) if hotkey.is_capture() => {
                self.start_capture(&hotkey, &event)
            }
            Some(DispatchStep::Select(hotkey)) => self.activate(hotkey, event, None).await,
            Some(DispatchStep::Consumed(outcome)) => outcome,
            Some(DispatchStep::Finished(hotkey, outcome)) => {
                let combo = hotkey.combo().to_string();
                debug!("capture {} ended: {:?}", combo, outcome.state);
                let fired = self.activate(hotkey, event, Some(outcome.clone())).await;
                if fired.fired() {
                    DispatchOutcome::CaptureFinished { combo, outcome }
                } else {
                    fired
                }
            }
        }
    }

    /// Pick the hotkey to run for `event`.
    fn select(&self, st: &ControllerState, event: &KeyEvent) -> Option<Arc<HotkeyData>> {
        let history = st.history(event.kind);
        let timeout = self.config.sequence_timeout_ms;
        let mut selected: Option<Arc<HotkeyData>> = None;
        for hotkey in st.candidates(&event.key, event.kind) {
            if !hotkey.match_history_with_timeout(history, timeout) {
                continue;
            }
            if !self.config.specificity_precedence {
                return Some(hotkey);
            }
            match &selected {
                Some(best) if hotkey.specificity() <= best.specificity() => {}
                _ => selected = Some(hotkey),
            }
        }
        selected
    }

    /// Activate a capture hotkey whose initiator matched.
    fn start_capture(&self, hotkey: &Arc<HotkeyData>, event: &KeyEvent) -> DispatchOutcome {
        let triggered = hotkey.with_capture(|m| m.try_trigger(event)).unwrap_or(false);
        let combo = hotkey.combo().to_string();
        if !triggered {
            return DispatchOutcome::NoMatch;
        }
        let mut st = self.state.lock();
        st.active_capture = Some(hotkey.clone());
        debug!("capture {} started", combo);
        DispatchOutcome::CaptureStarted { combo }
    }

    /// Route an event to the active capture.
    fn feed_capture(st: &mut ControllerState, event: &KeyEvent) -> DispatchStep {
        let Some(hotkey) = st.active_capture.clone() else {
            return DispatchStep::Consumed(DispatchOutcome::NoMatch);
        };
        let combo = hotkey.combo().to_string();
        if event.kind != KeyEventKind::KeyDown {
            let progress = hotkey
                .with_capture(|m| m.incomplete_captured_string())
                .unwrap_or_default();
            return DispatchStep::Consumed(DispatchOutcome::Captured { combo, progress });
        }

        let step = hotkey.with_capture(|m| {
            if m.state() != CaptureState::Active {
                return None;
            }
            if m.capture(event) {
                let outcome = CaptureOutcome {
                    state: m.state(),
                    text: m.captured_string(),
                };
                m.reset();
                Some(Err(outcome))
            } else {
                Some(Ok(m.incomplete_captured_string()))
            }
        });

        match step.flatten() {
            Some(Ok(progress)) => {
                DispatchStep::Consumed(DispatchOutcome::Captured { combo, progress })
            }
            Some(Err(outcome)) => {
                st.active_capture = None;
                DispatchStep::Finished(hotkey, outcome)
            }
            None => {
                warn!("capture {} was not active; dropping it", combo);
                st.active_capture = None;
                DispatchStep::Consumed(DispatchOutcome::NoMatch)
            }
        }
    }

    /// Run a selected hotkey.
    async fn activate(
        &self,
        hotkey: Arc<HotkeyData>,
        event: KeyEvent,
        capture: Option<CaptureOutcome>,
    ) -> DispatchOutcome {
        let combo = hotkey.combo().to_string();
        {
            let mut st = self.state.lock();
            if st.should_block_repeat(&hotkey, &event, self.config.repeat_min_interval_ms) {
                trace!("blocking repeat of {}", combo);
                return DispatchOutcome::RepeatBlocked { combo };
            }
            if hotkey.is_running() {
                warn!("Hotkey {} is already running. Skipping execution.", combo);
                return DispatchOutcome::Busy { combo };
            }
            st.triggered_mut(hotkey.mode()).push(TriggeredHotkey {
                combo: combo.clone(),
                trigger_time_ms: event.timestamp_ms,
            });
        }

        let invocation = hotkey.take_invocation(capture);
        let motions = invocation.motions.clone();
        debug!("firing {}", combo);

        if hotkey.await_execution() {
            if self.locked_on_execution.swap(true, Ordering::AcqRel) {
                return DispatchOutcome::Forbidden;
            }
            let _lock = ExecutionLock(self.locked_on_execution.clone());
            if !hotkey.run_invocation(event, invocation).await {
                return DispatchOutcome::Busy { combo };
            }
        } else {
            tokio::spawn(async move {
                hotkey.run_invocation(event, invocation).await;
            });
        }
        DispatchOutcome::Fired { combo, motions }
    }
}
