//! Drives a context manager through a script.

use std::{
    fmt,
    sync::{Arc, Weak},
};

use hotkeys_engine::{
    CallbackResult, DispatchOutcome, EngineConfig, HotkeyCallback, HotkeyContextManager,
    HotkeyInvocation, HotkeysContext, async_callback,
};
use keyspec::{KeyEvent, KeyEventKind};
use parking_lot::Mutex;
use tokio::task;
use tracing::{debug, warn};

use crate::{
    error::Result,
    script::{HotkeyAction, Script, Step},
};

/// Default replay clock advance per event.
const DEFAULT_STEP_MS: u64 = 10;
/// Scheduler yields granted to spawned callbacks after each dispatch.
const SETTLE_YIELDS: usize = 4;

/// The result of one replayed step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ReplayLine {
    /// An event was dispatched.
    Event {
        /// The event as dispatched, timestamp included.
        event: KeyEvent,
        /// What the controller did with it.
        outcome: DispatchOutcome,
        /// Callbacks that ran while the event was handled.
        invocations: Vec<HotkeyInvocation>,
        /// Loaded context after the event.
        context: Option<String>,
    },
    /// A context step ran.
    Context {
        /// The step.
        step: Step,
        /// Loaded context afterwards.
        context: Option<String>,
        /// Previous-context stack afterwards, bottom first.
        stack: Vec<String>,
        /// Engine error, if the step was refused.
        error: Option<String>,
    },
}

impl ReplayLine {
    /// True if a hotkey fired on this step.
    pub fn fired(&self) -> bool {
        match self {
            Self::Event { outcome, .. } => outcome.fired(),
            Self::Context { .. } => false,
        }
    }
}

/// Short human form of an event: `ctrl+shift+a`, with `(up)` and `(repeat)` markers.
fn describe_event(event: &KeyEvent) -> String {
    let mut out = String::new();
    for (held, name) in [(event.ctrl, "ctrl+"), (event.alt, "alt+"), (event.shift, "shift+")] {
        if held {
            out.push_str(name);
        }
    }
    match event.key.as_str() {
        " " => out.push_str("space"),
        key => out.push_str(key),
    }
    if event.kind == KeyEventKind::KeyUp {
        out.push_str(" (up)");
    }
    if event.repeat {
        out.push_str(" (repeat)");
    }
    out
}

/// Short human form of a dispatch outcome.
fn describe_outcome(outcome: &DispatchOutcome) -> String {
    match outcome {
        DispatchOutcome::Ignored => "ignored (text input)".into(),
        DispatchOutcome::Forbidden => "forbidden".into(),
        DispatchOutcome::NoMatch => "no match".into(),
        DispatchOutcome::RepeatBlocked { combo } => format!("repeat blocked: {combo}"),
        DispatchOutcome::Busy { combo } => format!("busy: {combo}"),
        DispatchOutcome::Fired { combo, motions } if motions.is_empty() => format!("fired {combo}"),
        DispatchOutcome::Fired { combo, motions } => format!("fired {combo} motions {motions:?}"),
        DispatchOutcome::CaptureStarted { combo } => format!("capture started: {combo}"),
        DispatchOutcome::Captured { combo, progress } => format!("capturing {combo}: {progress:?}"),
        DispatchOutcome::CaptureFinished { combo, outcome } => {
            format!("capture {:?} {combo}: {:?}", outcome.state, outcome.text)
        }
    }
}

impl fmt::Display for ReplayLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event {
                event,
                outcome,
                invocations,
                context,
            } => {
                write!(
                    f,
                    "{:>8}ms [{}] {} -> {}",
                    event.timestamp_ms,
                    context.as_deref().unwrap_or("-"),
                    describe_event(event),
                    describe_outcome(outcome)
                )?;
                for inv in invocations {
                    write!(f, "\n           {} <{}> {}", inv.combo, inv.group, inv.description)?;
                }
                Ok(())
            }
            Self::Context {
                step,
                context,
                stack,
                error,
            } => {
                write!(
                    f,
                    "{step:?} -> [{}] stack {stack:?}",
                    context.as_deref().unwrap_or("-")
                )?;
                if let Some(error) = error {
                    write!(f, " ({error})")?;
                }
                Ok(())
            }
        }
    }
}

/// Replays steps against one manager, keeping a clock for untimed events.
pub struct Replayer {
    /// The engine under test.
    manager: Arc<HotkeyContextManager>,
    /// Invocations collected by every scripted callback.
    invocations: Arc<Mutex<Vec<HotkeyInvocation>>>,
    /// Timestamp of the last dispatched event.
    clock_ms: u64,
    /// Clock advance per event.
    step_ms: u64,
}

impl Replayer {
    /// Build a manager from the script's config and declare its contexts.
    pub fn new(script: &Script) -> Result<Self> {
        let config = script.config.clone().unwrap_or_default();
        let replayer = Self::with_config(config, script.step_ms.unwrap_or(DEFAULT_STEP_MS));

        for spec in &script.contexts {
            let mut ctx = HotkeysContext::new(spec.name.clone());
            for hk in &spec.hotkeys {
                let cb = replayer.hotkey_callback(&hk.action);
                ctx.register(hk.combos.iter().map(String::as_str), &cb, &hk.options);
            }
            debug!("declaring context {} with {} hotkeys", spec.name, ctx.len());
            replayer.manager.declare_context(ctx)?;
        }
        if let Some(name) = &script.load {
            replayer.manager.load_context(name, false)?;
        }
        Ok(replayer)
    }

    /// A replayer with no contexts.
    fn with_config(config: EngineConfig, step_ms: u64) -> Self {
        Self {
            manager: Arc::new(HotkeyContextManager::new(config)),
            invocations: Arc::new(Mutex::new(Vec::new())),
            clock_ms: 0,
            step_ms,
        }
    }

    /// The manager being driven.
    pub fn manager(&self) -> &Arc<HotkeyContextManager> {
        &self.manager
    }

    /// Callback that records its invocation and then performs `action`.
    fn hotkey_callback(&self, action: &HotkeyAction) -> HotkeyCallback {
        let manager = Arc::downgrade(&self.manager);
        let log = self.invocations.clone();
        let action = action.clone();
        async_callback(move |_, invocation| {
            log.lock().push(invocation);
            let manager = manager.clone();
            let action = action.clone();
            async move { perform(&manager, &action) }
        })
    }

    /// Run every step in order.
    pub async fn run(&mut self, steps: &[Step]) -> Result<Vec<ReplayLine>> {
        let mut lines = Vec::with_capacity(steps.len());
        for step in steps {
            match step {
                Step::Key(event) => lines.push(self.dispatch(event.clone()).await?),
                Step::Type(text) => {
                    for c in text.chars() {
                        lines.push(self.dispatch(typed(c)).await?);
                    }
                }
                Step::Wait(ms) => self.clock_ms += ms,
                _ => lines.push(self.context_step(step)),
            }
        }
        Ok(lines)
    }

    /// Stamp and dispatch one event, then collect the callbacks it ran.
    async fn dispatch(&mut self, mut event: KeyEvent) -> Result<ReplayLine> {
        if event.timestamp_ms == 0 {
            event.timestamp_ms = self.clock_ms + self.step_ms;
        }
        self.clock_ms = self.clock_ms.max(event.timestamp_ms);

        let outcome = self.manager.dispatch(event.clone()).await?;
        for _ in 0..SETTLE_YIELDS {
            task::yield_now().await;
        }
        let invocations = self.invocations.lock().drain(..).collect();
        Ok(ReplayLine::Event {
            event,
            outcome,
            invocations,
            context: self.manager.current_context_name(),
        })
    }

    /// Apply a context step. Refusals are reported, not fatal.
    fn context_step(&self, step: &Step) -> ReplayLine {
        let m = &self.manager;
        let res = match step {
            Step::Load(name) => m.load_context(name, false),
            Step::Push(name) => m.load_context(name, true),
            Step::Back => m.load_previous_context(),
            Step::Lock => m.lock_context_control(),
            Step::Unlock => m.unlock_context_control(),
            Step::Key(_) | Step::Type(_) | Step::Wait(_) => Ok(()),
        };
        let error = res.err().map(|e| {
            warn!("{step:?} refused: {e}");
            e.to_string()
        });
        ReplayLine::Context {
            step: step.clone(),
            context: m.current_context_name(),
            stack: m.context_stack(),
            error,
        }
    }
}

/// Perform a hotkey's side effect on the manager, if it still exists.
fn perform(
    manager: &Weak<HotkeyContextManager>,
    action: &HotkeyAction,
) -> CallbackResult {
    let Some(manager) = manager.upgrade() else {
        return Ok(());
    };
    match action {
        HotkeyAction::Report => {}
        HotkeyAction::Load(name) => manager.load_context(name, false)?,
        HotkeyAction::Push(name) => manager.load_context(name, true)?,
        HotkeyAction::Back => manager.load_previous_context()?,
    }
    Ok(())
}

/// The keydown a typed character produces.
fn typed(c: char) -> KeyEvent {
    let event = KeyEvent::down(c.to_string());
    if c.is_uppercase() {
        event.with_shift()
    } else {
        event
    }
}

/// Replay a whole script against a fresh manager.
pub async fn replay(script: &Script) -> Result<Vec<ReplayLine>> {
    let mut replayer = Replayer::new(script)?;
    let lines = replayer.run(&script.steps).await?;
    replayer.manager.destroy();
    Ok(lines)
}
