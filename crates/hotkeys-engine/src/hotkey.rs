//! Registered hotkeys and the history matching state machine.

use std::{
    error, fmt,
    sync::{
        Arc, OnceLock,
        atomic::{AtomicBool, Ordering},
    },
};

use futures::{
    FutureExt,
    future::{BoxFuture, ready},
};
use parking_lot::Mutex;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{trace, warn};

use keyspec::{
    CaptureState, HotkeyCaptureMatcher, HotkeyFragment, KeyEvent, KeyEventKind,
    includes_capture_metakey, is_modifier, parse_combo,
};

use crate::{config::MAX_TIME_BETWEEN_SEQUENCE_KEYSTROKES_MS, history::EventHistory};

/// Group for hotkeys whose description names none.
pub const HOTKEYS_GENERAL_GROUP: &str = "general";
/// Conventional group for hotkeys that should not be listed to users.
pub const HOTKEYS_HIDDEN_GROUP: &str = "hidden";

/// Error type returned by hotkey callbacks.
pub type CallbackError = Box<dyn error::Error + Send + Sync>;

/// Result type returned by hotkey callbacks.
pub type CallbackResult = Result<(), CallbackError>;

/// The uniform hotkey callback contract: every callback returns a future.
pub type HotkeyCallback =
    Arc<dyn Fn(KeyEvent, HotkeyInvocation) -> BoxFuture<'static, CallbackResult> + Send + Sync>;

/// Wrap a synchronous closure as a [`HotkeyCallback`].
pub fn callback<F>(f: F) -> HotkeyCallback
where
    F: Fn(&KeyEvent, &HotkeyInvocation) + Send + Sync + 'static,
{
    Arc::new(move |event, invocation| {
        f(&event, &invocation);
        ready(Ok(())).boxed()
    })
}

/// Wrap an async closure as a [`HotkeyCallback`].
pub fn async_callback<F, Fut>(f: F) -> HotkeyCallback
where
    F: Fn(KeyEvent, HotkeyInvocation) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = CallbackResult> + Send + 'static,
{
    Arc::new(move |event, invocation| f(event, invocation).boxed())
}

/// A callback that does nothing.
pub fn noop_callback() -> HotkeyCallback {
    callback(|_, _| {})
}

/// Registration options for a hotkey.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyOptions {
    /// Human-readable description. A `<group>` prefix selects the display group.
    pub description: Option<String>,
    /// Event kind the hotkey fires on.
    pub mode: KeyEventKind,
    /// Block every other hotkey until this one's callback finishes.
    pub await_execution: bool,
    /// Expire sequences whose keystrokes are too far apart.
    pub consider_time_in_sequence: bool,
    /// Fire on OS key-repeat events (throttled).
    pub can_repeat: bool,
}

impl Default for HotkeyOptions {
    fn default() -> Self {
        Self {
            description: None,
            mode: KeyEventKind::KeyDown,
            await_execution: true,
            consider_time_in_sequence: false,
            can_repeat: false,
        }
    }
}

impl HotkeyOptions {
    /// Options with a description and everything else defaulted.
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Set the event kind.
    pub fn mode(mut self, mode: KeyEventKind) -> Self {
        self.mode = mode;
        self
    }

    /// Set whether the callback is awaited under the execution lock.
    pub fn await_execution(mut self, await_execution: bool) -> Self {
        self.await_execution = await_execution;
        self
    }

    /// Set whether sequence keystrokes must be close in time.
    pub fn consider_time_in_sequence(mut self, timed: bool) -> Self {
        self.consider_time_in_sequence = timed;
        self
    }

    /// Set whether OS key repeats fire the hotkey.
    pub fn can_repeat(mut self, can_repeat: bool) -> Self {
        self.can_repeat = can_repeat;
        self
    }
}

/// Result of a successful history match: the numeric "vim motion" arguments.
///
/// Motions are recorded while walking history backwards and put in writing order by
/// [`Self::set_successful`], which also freezes the match.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HotkeyMatch {
    /// Captured numeric arguments.
    motions: Vec<u32>,
    /// Frozen after a successful match.
    successful: bool,
}

impl HotkeyMatch {
    /// Panic if the match is frozen.
    fn panic_if_successful(&self) {
        assert!(
            !self.successful,
            "attempted to modify a hotkey match after it was marked successful"
        );
    }

    /// Record digits read newest-first. Saturates at `u32::MAX`.
    ///
    /// # Panics
    /// If the match is already successful.
    pub fn add_reversed_motion(&mut self, digits_newest_first: &str) {
        self.panic_if_successful();
        let typed: String = digits_newest_first.chars().rev().collect();
        self.motions.push(typed.parse().unwrap_or(u32::MAX));
    }

    /// Put motions in writing order and freeze the match.
    ///
    /// # Panics
    /// If the match is already successful.
    pub fn set_successful(&mut self) {
        self.panic_if_successful();
        self.motions.reverse();
        self.successful = true;
    }

    /// True once frozen.
    pub fn successful(&self) -> bool {
        self.successful
    }

    /// Numeric arguments in writing order.
    pub fn motions(&self) -> &[u32] {
        &self.motions
    }

    /// The first numeric argument, if any.
    pub fn motion(&self) -> Option<u32> {
        self.motions.first().copied()
    }
}

/// How a capture hotkey ended.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CaptureOutcome {
    /// Final state (`Complete` or `Cancelled`).
    pub state: CaptureState,
    /// Captured text. Empty when cancelled.
    pub text: String,
}

impl CaptureOutcome {
    /// True if the capture completed.
    pub fn accepted(&self) -> bool {
        self.state == CaptureState::Complete
    }
}

/// What a callback receives about the hotkey that fired.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HotkeyInvocation {
    /// Combo string as registered.
    pub combo: String,
    /// Description without its group marker.
    pub description: String,
    /// Description group.
    pub group: String,
    /// Numeric arguments in writing order.
    pub motions: Vec<u32>,
    /// Capture result for capture hotkeys.
    pub capture: Option<CaptureOutcome>,
}

impl HotkeyInvocation {
    /// The first numeric argument, if any.
    pub fn motion(&self) -> Option<u32> {
        self.motions.first().copied()
    }
}

/// Releases the execution mutex on drop.
struct ExecutionGuard<'a>(&'a AtomicBool);

impl<'a> ExecutionGuard<'a> {
    /// Take the mutex, or `None` if it is held.
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for ExecutionGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Regex extracting the `<group>` marker from descriptions.
fn description_group_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<(.*)>").ok()).as_ref()
}

/// Split a description into `(group, clean description)`.
fn split_description(description: Option<&str>) -> (String, String) {
    let Some(text) = description else {
        return (HOTKEYS_GENERAL_GROUP.to_string(), String::new());
    };
    let Some(re) = description_group_regex() else {
        return (HOTKEYS_GENERAL_GROUP.to_string(), text.to_string());
    };
    let group = re
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| HOTKEYS_GENERAL_GROUP.to_string());
    (group, re.replace(text, "").into_owned())
}

/// Specificity of a fragment list.
fn specificity_of(fragments: &[HotkeyFragment]) -> u32 {
    fragments
        .iter()
        .map(|f| {
            let base = if f.numeric_metakey() { 5 } else { 1 };
            base + u32::from(f.requires_alt())
                + u32::from(f.requires_ctrl())
                + u32::from(f.requires_shift())
                + u32::from(f.uppercase_explicit())
        })
        .sum()
}

/// One registered combo with its callback, options and transient match state.
pub struct HotkeyData {
    /// Combo string as registered.
    combo: String,
    /// Parsed fragments. Capture hotkeys hold their initiator here.
    fragments: Vec<HotkeyFragment>,
    /// Capture matcher for `\c` / `\s` combos.
    capture: Option<Mutex<HotkeyCaptureMatcher>>,
    /// Callback run on match.
    callback: HotkeyCallback,
    /// Registration options.
    options: HotkeyOptions,
    /// Description group.
    group: String,
    /// Description without the group marker.
    description: String,
    /// Combo parsed successfully.
    valid: bool,
    /// Precedence when several hotkeys match.
    specificity: u32,
    /// Match produced by the last successful `match_history`, consumed by `run`.
    current_match: Mutex<Option<HotkeyMatch>>,
    /// Execution mutex.
    running: AtomicBool,
}

impl fmt::Debug for HotkeyData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotkeyData")
            .field("combo", &self.combo)
            .field("mode", &self.options.mode)
            .field("valid", &self.valid)
            .field("specificity", &self.specificity)
            .finish_non_exhaustive()
    }
}

impl HotkeyData {
    /// Build a hotkey. An unparseable combo is logged and yields an invalid hotkey that
    /// never matches and is never indexed.
    pub fn new(combo: impl Into<String>, callback: HotkeyCallback, options: HotkeyOptions) -> Self {
        let combo = combo.into();
        let (group, description) = split_description(options.description.as_deref());

        let (fragments, capture) = if includes_capture_metakey(&combo) {
            match HotkeyCaptureMatcher::parse(&combo) {
                Ok(m) => (vec![m.initializer_fragment().clone()], Some(Mutex::new(m))),
                Err(e) => {
                    warn!("Error parsing hotkey '{}': {}", combo, e);
                    (Vec::new(), None)
                }
            }
        } else {
            match parse_combo(&combo) {
                Ok(fragments) => (fragments, None),
                Err(e) => {
                    warn!("Error parsing hotkey '{}': {}", combo, e);
                    (Vec::new(), None)
                }
            }
        };

        let capture_mode_ok = capture.is_none() || options.mode == KeyEventKind::KeyDown;
        if !capture_mode_ok {
            warn!("Capture hotkey '{}' must use keydown mode", combo);
        }
        let valid = !fragments.is_empty() && capture_mode_ok;

        Self {
            specificity: specificity_of(&fragments),
            combo,
            fragments,
            capture,
            callback,
            options,
            group,
            description,
            valid,
            current_match: Mutex::new(None),
            running: AtomicBool::new(false),
        }
    }

    /// Combo string as registered.
    pub fn combo(&self) -> &str {
        &self.combo
    }

    /// Parsed fragments; empty when invalid.
    pub fn fragments(&self) -> &[HotkeyFragment] {
        &self.fragments
    }

    /// The callback.
    pub fn callback(&self) -> &HotkeyCallback {
        &self.callback
    }

    /// Registration options.
    pub fn options(&self) -> &HotkeyOptions {
        &self.options
    }

    /// Combo parsed successfully.
    pub fn valid(&self) -> bool {
        self.valid
    }

    /// Event kind the hotkey fires on.
    pub fn mode(&self) -> KeyEventKind {
        self.options.mode
    }

    /// Await the callback under the global execution lock.
    pub fn await_execution(&self) -> bool {
        self.options.await_execution
    }

    /// Sequence keystrokes must be close in time.
    pub fn consider_time_in_sequence(&self) -> bool {
        self.options.consider_time_in_sequence
    }

    /// Fires on OS key repeats.
    pub fn can_repeat(&self) -> bool {
        self.options.can_repeat
    }

    /// Number of fragments.
    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    /// True for invalid hotkeys.
    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    /// More than one fragment.
    pub fn is_sequence(&self) -> bool {
        self.fragments.len() > 1
    }

    /// The first fragment is a numeric metakey (`"\d j"`).
    pub fn with_vim_motion(&self) -> bool {
        self.fragments
            .first()
            .is_some_and(HotkeyFragment::numeric_metakey)
    }

    /// Precedence when several hotkeys match the same event.
    pub fn specificity(&self) -> u32 {
        self.specificity
    }

    /// Description without its group marker.
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Description group, [`HOTKEYS_GENERAL_GROUP`] if none is named.
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Primary identity of the first fragment.
    pub fn face(&self) -> Option<&str> {
        self.fragments.first().map(HotkeyFragment::identity)
    }

    /// All identities of the first fragment.
    pub fn many_faces(&self) -> Vec<&str> {
        self.fragments
            .first()
            .map(|f| f.identities().collect())
            .unwrap_or_default()
    }

    /// Primary identity of the last fragment.
    pub fn trail(&self) -> Option<&str> {
        self.fragments.last().map(HotkeyFragment::identity)
    }

    /// All identities of the last fragment.
    pub fn many_trails(&self) -> Vec<&str> {
        self.fragments
            .last()
            .map(|f| f.identities().collect())
            .unwrap_or_default()
    }

    /// Key that indexes this hotkey: the trail for sequences, the face otherwise.
    pub fn trigger(&self) -> Option<&str> {
        if self.is_sequence() {
            self.trail()
        } else {
            self.face()
        }
    }

    /// Every identity of the triggering fragment.
    pub fn triggers(&self) -> Vec<&str> {
        if self.is_sequence() {
            self.many_trails()
        } else {
            self.many_faces()
        }
    }

    /// True for `\c` / `\s` capture hotkeys.
    pub fn is_capture(&self) -> bool {
        self.capture.is_some()
    }

    /// Capture state, for capture hotkeys.
    pub fn capture_state(&self) -> Option<CaptureState> {
        self.capture.as_ref().map(|m| m.lock().state())
    }

    /// Run `f` against the capture matcher, for capture hotkeys.
    pub(crate) fn with_capture<R>(
        &self,
        f: impl FnOnce(&mut HotkeyCaptureMatcher) -> R,
    ) -> Option<R> {
        self.capture.as_ref().map(|m| f(&mut m.lock()))
    }

    /// Rebuild an idle capture matcher with different terminators.
    pub(crate) fn apply_capture_terminators(&self, accept: &str, cancel: &str) {
        let Some(slot) = &self.capture else {
            return;
        };
        let mut matcher = slot.lock();
        if matcher.state() == CaptureState::Active {
            return;
        }
        match HotkeyCaptureMatcher::with_terminators(&self.combo, accept, cancel) {
            Ok(m) => *matcher = m,
            Err(e) => warn!("Keeping default terminators for '{}': {}", self.combo, e),
        }
    }

    /// A match is pending: `match_history` succeeded and `run` has not consumed it.
    pub fn has_match(&self) -> bool {
        self.current_match.lock().is_some()
    }

    /// Copy of the pending match.
    pub fn match_metadata(&self) -> Option<HotkeyMatch> {
        self.current_match.lock().clone()
    }

    /// The execution mutex is held.
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// [`Self::match_history_with_timeout`] using the default sequence timeout.
    pub fn match_history(&self, history: &EventHistory<KeyEvent>) -> bool {
        self.match_history_with_timeout(history, MAX_TIME_BETWEEN_SEQUENCE_KEYSTROKES_MS)
    }

    /// Decide whether the combo was just completed by the events in `history`.
    ///
    /// Fragments are checked from last to first against events from newest to oldest.
    /// Capture hotkeys only test their initiator against the newest event.
    pub fn match_history_with_timeout(
        &self,
        history: &EventHistory<KeyEvent>,
        sequence_timeout_ms: u64,
    ) -> bool {
        *self.current_match.lock() = None;
        if !self.valid || history.len() < self.len() {
            return false;
        }

        if self.capture.is_some() {
            return history
                .peek(0)
                .is_some_and(|event| self.fragments[0].matches(event));
        }

        let timed = self.consider_time_in_sequence() && self.is_sequence();
        let mut matched = HotkeyMatch::default();
        let mut k = 0usize;
        let mut last_time: Option<u64> = None;
        let expired = |event: &KeyEvent, last: Option<u64>| {
            timed && last.is_some_and(|t| t.saturating_sub(event.timestamp_ms) > sequence_timeout_ms)
        };

        for fragment in self.fragments.iter().rev() {
            if fragment.numeric_metakey() {
                let mut digits = String::new();
                while let Some(event) = history.peek(k) {
                    if skips_modifier(fragment, event) {
                        k += 1;
                        continue;
                    }
                    if !fragment.matches_numeric_metakey(event) {
                        break;
                    }
                    if expired(event, last_time) {
                        trace!("hotkey {} expired", self.combo);
                        return false;
                    }
                    digits.push_str(&event.key);
                    last_time = Some(event.timestamp_ms);
                    k += 1;
                }
                if digits.is_empty() {
                    return false;
                }
                matched.add_reversed_motion(&digits);
                continue;
            }

            let event = loop {
                match history.peek(k) {
                    Some(ev) if skips_modifier(fragment, ev) => k += 1,
                    Some(ev) => break ev,
                    None => return false,
                }
            };
            if expired(event, last_time) {
                trace!("hotkey {} expired", self.combo);
                return false;
            }
            if !fragment.matches(event) {
                trace!(
                    "fragment {} of {} did not match '{}'",
                    fragment.identity(),
                    self.combo,
                    event.key
                );
                return false;
            }
            last_time = Some(event.timestamp_ms);
            k += 1;
        }

        matched.set_successful();
        trace!("hotkey {} matched", self.combo);
        *self.current_match.lock() = Some(matched);
        true
    }

    /// Consume the pending match into the payload handed to the callback.
    pub(crate) fn take_invocation(&self, capture: Option<CaptureOutcome>) -> HotkeyInvocation {
        let matched = self.current_match.lock().take();
        HotkeyInvocation {
            combo: self.combo.clone(),
            description: self.description.clone(),
            group: self.group.clone(),
            motions: matched.map(|m| m.motions).unwrap_or_default(),
            capture,
        }
    }

    /// Run the callback, consuming the pending match.
    ///
    /// Returns false without calling the callback if a previous run is still in
    /// progress. Callback errors are logged.
    pub async fn run(&self, event: KeyEvent) -> bool {
        let invocation = self.take_invocation(None);
        self.run_invocation(event, invocation).await
    }

    /// Run the callback with a prepared invocation under the execution mutex.
    pub(crate) async fn run_invocation(&self, event: KeyEvent, invocation: HotkeyInvocation) -> bool {
        let Some(_guard) = ExecutionGuard::acquire(&self.running) else {
            warn!("Hotkey {} is already running. Skipping execution.", self.combo);
            return false;
        };
        if let Err(e) = (self.callback)(event, invocation).await {
            warn!("Error executing hotkey {}: {}", self.combo, e);
        }
        true
    }
}

/// Modifier-only events are transparent unless the fragment names that key.
fn skips_modifier(fragment: &HotkeyFragment, event: &KeyEvent) -> bool {
    is_modifier(&event.key) && !fragment.identities().any(|i| i == event.key)
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;

    fn history(keys: &[&str]) -> EventHistory<KeyEvent> {
        let mut h = EventHistory::new(100);
        for (i, k) in keys.iter().enumerate() {
            h.push(KeyEvent::down(*k).at(i as u64 * 100));
        }
        h
    }

    fn hk(combo: &str) -> HotkeyData {
        HotkeyData::new(combo, noop_callback(), HotkeyOptions::default())
    }

    #[test]
    fn sequence_order_matters() {
        let cc = hk("c c");
        assert!(cc.match_history(&history(&["c", "c"])));
        assert!(!cc.match_history(&history(&["x", "c"])));

        let cx = hk("c x");
        assert!(cx.match_history(&history(&["c", "x"])));
        assert!(!cx.match_history(&history(&["x", "c"])));
    }

    #[test]
    fn numeric_motion() {
        let h = hk("\\d g");
        assert!(h.match_history(&history(&["3", "g"])));
        assert_eq!(h.match_metadata().and_then(|m| m.motion()), Some(3));

        assert!(h.match_history(&history(&["x", "1", "2", "g"])));
        assert_eq!(h.match_metadata().and_then(|m| m.motion()), Some(12));

        assert!(!h.match_history(&history(&["g"])));
        assert!(!h.match_history(&history(&["x", "g"])));
    }

    #[test]
    fn digit_run_end_is_left_for_next_fragment() {
        let h = hk("z \\d g");
        assert!(h.match_history(&history(&["z", "4", "2", "g"])));
        assert_eq!(h.match_metadata().map(|m| m.motions().to_vec()), Some(vec![42]));
        assert!(!h.match_history(&history(&["q", "4", "2", "g"])));
    }

    #[test]
    fn multiple_motions_in_writing_order() {
        let h = hk("\\d x \\d g");
        assert!(h.match_history(&history(&["5", "x", "1", "7", "g"])));
        assert_eq!(h.match_metadata().map(|m| m.motions().to_vec()), Some(vec![5, 17]));
    }

    #[test]
    fn modifiers_are_skipped() {
        let h = hk("g G");
        let mut hist = EventHistory::new(10);
        hist.push(KeyEvent::down("g"));
        hist.push(KeyEvent::down("Shift").with_shift());
        hist.push(KeyEvent::down("G").with_shift());
        assert!(h.match_history(&hist));
    }

    #[test]
    fn timed_sequences_expire() {
        let timed = HotkeyData::new(
            "g g",
            noop_callback(),
            HotkeyOptions::default().consider_time_in_sequence(true),
        );
        let mut hist = EventHistory::new(10);
        hist.push(KeyEvent::down("g").at(0));
        hist.push(KeyEvent::down("g").at(2000));
        assert!(!timed.match_history(&hist));
        assert!(hk("g g").match_history(&hist));

        hist.push(KeyEvent::down("g").at(2500));
        assert!(timed.match_history(&hist));
    }

    #[test]
    fn failed_match_clears_metadata() {
        let h = hk("\\d g");
        assert!(h.match_history(&history(&["3", "g"])));
        assert!(h.has_match());
        assert!(!h.match_history(&history(&["g", "x"])));
        assert!(!h.has_match());
    }

    #[test]
    fn invalid_combos() {
        let h = hk("ctrl+bogus");
        assert!(!h.valid());
        assert!(h.triggers().is_empty());
        assert!(!h.match_history(&history(&["a"])));
        assert!(!HotkeyData::new(
            "f \\s",
            noop_callback(),
            HotkeyOptions::default().mode(KeyEventKind::KeyUp)
        )
        .valid());
    }

    #[test]
    fn triggers_and_faces() {
        let h = hk("ctrl+k shift+2");
        assert!(h.is_sequence());
        assert_eq!(h.face(), Some("k"));
        assert_eq!(h.trigger(), Some("2"));
        assert_eq!(h.triggers(), vec!["2", "@"]);

        let single = hk("shift+a");
        assert_eq!(single.trigger(), Some("a"));
        assert_eq!(single.many_faces(), vec!["a", "A"]);
    }

    #[test]
    fn specificity_scores() {
        assert_eq!(hk("g").specificity(), 1);
        assert_eq!(hk("G").specificity(), 2);
        assert_eq!(hk("ctrl+shift+a").specificity(), 3);
        assert_eq!(hk("\\d g").specificity(), 6);
    }

    #[test]
    fn description_groups() {
        let grouped = HotkeyData::new(
            "g",
            noop_callback(),
            HotkeyOptions::described("<navigation>Go to the top"),
        );
        assert_eq!(grouped.group(), "navigation");
        assert_eq!(grouped.description(), "Go to the top");

        let plain = HotkeyData::new("g", noop_callback(), HotkeyOptions::described("Top"));
        assert_eq!(plain.group(), HOTKEYS_GENERAL_GROUP);
        assert_eq!(plain.description(), "Top");
    }

    #[test]
    #[should_panic(expected = "after it was marked successful")]
    fn frozen_match_panics() {
        let mut m = HotkeyMatch::default();
        m.set_successful();
        m.add_reversed_motion("1");
    }

    #[tokio::test]
    async fn run_consumes_match_and_reports_motion() {
        let seen = Arc::new(Mutex::new(None));
        let seen_cb = seen.clone();
        let h = HotkeyData::new(
            "\\d j",
            callback(move |_, inv| *seen_cb.lock() = inv.motion()),
            HotkeyOptions::default(),
        );
        assert!(h.match_history(&history(&["7", "j"])));
        assert!(h.run(KeyEvent::down("j")).await);
        assert_eq!(*seen.lock(), Some(7));
        assert!(!h.has_match());
    }

    #[tokio::test]
    async fn reentrant_run_is_dropped() {
        let calls = Arc::new(AtomicUsize::new(0));
        let gate = Arc::new(tokio::sync::Notify::new());
        let (calls_cb, gate_cb) = (calls.clone(), gate.clone());
        let h = Arc::new(HotkeyData::new(
            "x",
            async_callback(move |_, _| {
                let calls = calls_cb.clone();
                let gate = gate_cb.clone();
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    gate.notified().await;
                    Ok::<(), CallbackError>(())
                }
            }),
            HotkeyOptions::default(),
        ));

        let first = tokio::spawn({
            let h = h.clone();
            async move { h.run(KeyEvent::down("x")).await }
        });
        while !h.is_running() {
            tokio::task::yield_now().await;
        }
        assert!(!h.run(KeyEvent::down("x")).await);
        gate.notify_one();
        assert!(first.await.expect("join"));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!h.is_running());
    }

    #[tokio::test]
    async fn callback_errors_release_the_mutex() {
        let h = HotkeyData::new(
            "x",
            async_callback(|_, _| async { Err::<(), CallbackError>("boom".into()) }),
            HotkeyOptions::default(),
        );
        assert!(h.run(KeyEvent::down("x")).await);
        assert!(!h.is_running());
        assert!(h.run(KeyEvent::down("x")).await);
    }
}
