//! Component hotkey contexts: named actions that parent components may override.
//!
//! A component declares each of its hotkeys as an action with an [`OverwriteBehavior`].
//! A parent embedding the component may overwrite the action's callback, triggers or
//! options. The owner decides what an overwrite means:
//!
//! - [`OverwriteBehavior::Replace`]: the overriding callback runs instead of the owner's.
//! - [`OverwriteBehavior::Wrap`]: the overriding callback runs first, then the owner's.
//! - [`OverwriteBehavior::Ignore`]: the owner calls `panic_if_*_overwritten` before
//!   applying its own behavior, turning an overwrite into a panic.

use std::{fmt, sync::Arc};

use futures::FutureExt;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    context::HotkeysContext,
    error::{Error, Result},
    hotkey::{HotkeyCallback, HotkeyOptions},
};

/// Strongly typed action key.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionName(&'static str);

impl ActionName {
    /// Declare an action name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// The name as a string.
    pub const fn as_str(self) -> &'static str {
        self.0
    }
}

impl fmt::Display for ActionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

/// Leave the current context.
pub const DROP_HOTKEY_CONTEXT: ActionName = ActionName::new("drop_hotkey_context");
/// WASD grid movement.
pub const WASD_NAVIGATION: ActionName = ActionName::new("wasd_navigation");

/// What an overwrite of an action means to its owner.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum OverwriteBehavior {
    /// The overriding callback replaces the owner's.
    #[default]
    Replace,
    /// The overriding callback runs before the owner's.
    Wrap,
    /// Overwrites are forbidden; enforced by the owner via `panic_if_*_overwritten`.
    Ignore,
}

/// Registration parameters for an action.
#[derive(Clone, Default)]
pub struct HotkeyActionParams {
    /// Combos that trigger the action.
    pub triggers: Vec<String>,
    /// Owner callback. Actions without any callback are not materialized.
    pub callback: Option<HotkeyCallback>,
    /// Hotkey options. Actions without a description are not materialized.
    pub options: HotkeyOptions,
}

impl HotkeyActionParams {
    /// Parameters with triggers and options, and no callback yet.
    pub fn new<I, S>(triggers: I, options: HotkeyOptions) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            triggers: triggers.into_iter().map(Into::into).collect(),
            callback: None,
            options,
        }
    }

    /// Set the owner callback.
    pub fn with_callback(mut self, callback: HotkeyCallback) -> Self {
        self.callback = Some(callback);
        self
    }
}

/// One declared action and its overwrite state.
#[derive(Clone)]
pub struct HotkeyAction {
    /// Action key.
    name: ActionName,
    /// Owner-chosen overwrite policy.
    behavior: OverwriteBehavior,
    /// Current triggers.
    triggers: Vec<String>,
    /// Owner callback.
    callback: Option<HotkeyCallback>,
    /// Callback written by an overrider.
    overriding_callback: Option<HotkeyCallback>,
    /// Current options.
    options: HotkeyOptions,
    /// The callback has been overwritten.
    callback_overwritten: bool,
    /// The triggers have been overwritten.
    trigger_overwritten: bool,
    /// The options have been overwritten.
    options_overwritten: bool,
}

impl fmt::Debug for HotkeyAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HotkeyAction")
            .field("name", &self.name)
            .field("behavior", &self.behavior)
            .field("triggers", &self.triggers)
            .field("callback_overwritten", &self.callback_overwritten)
            .field("trigger_overwritten", &self.trigger_overwritten)
            .field("options_overwritten", &self.options_overwritten)
            .finish_non_exhaustive()
    }
}

/// Run `first`, then `second` if `first` succeeded.
fn wrap_callbacks(first: HotkeyCallback, second: HotkeyCallback) -> HotkeyCallback {
    Arc::new(move |event, invocation| {
        let (first, second) = (first.clone(), second.clone());
        async move {
            first(event.clone(), invocation.clone()).await?;
            second(event, invocation).await
        }
        .boxed()
    })
}

impl HotkeyAction {
    /// Action key.
    pub fn name(&self) -> ActionName {
        self.name
    }

    /// Owner-chosen overwrite policy.
    pub fn behavior(&self) -> OverwriteBehavior {
        self.behavior
    }

    /// Current triggers.
    pub fn triggers(&self) -> &[String] {
        &self.triggers
    }

    /// Current options.
    pub fn options(&self) -> &HotkeyOptions {
        &self.options
    }

    /// The callback has been overwritten.
    pub fn callback_overwritten(&self) -> bool {
        self.callback_overwritten
    }

    /// The triggers have been overwritten.
    pub fn trigger_overwritten(&self) -> bool {
        self.trigger_overwritten
    }

    /// The options have been overwritten.
    pub fn options_overwritten(&self) -> bool {
        self.options_overwritten
    }

    /// The callback the materialized hotkey runs.
    pub fn effective_callback(&self) -> Option<HotkeyCallback> {
        match (&self.overriding_callback, &self.callback, self.behavior) {
            (Some(over), Some(own), OverwriteBehavior::Wrap) => {
                Some(wrap_callbacks(over.clone(), own.clone()))
            }
            (Some(over), _, _) => Some(over.clone()),
            (None, own, _) => own.clone(),
        }
    }
}

/// A component's hotkey declarations plus its embedded child components.
#[derive(Debug)]
pub struct ComponentHotkeyContext {
    /// Context name, also used for the generated [`HotkeysContext`].
    name: String,
    /// Own actions in registration order.
    actions: Vec<HotkeyAction>,
    /// Embedded components, flattened before own actions.
    children: Vec<ComponentHotkeyContext>,
    /// No more actions may be registered.
    is_final: bool,
    /// A hotkeys context was generated and not yet dropped.
    generated: bool,
    /// Active flag; receivers are notified on change.
    active: watch::Sender<bool>,
}

impl ComponentHotkeyContext {
    /// Create an empty, inactive, non-final component context.
    pub fn new(name: impl Into<String>) -> Self {
        let (active, _) = watch::channel(false);
        Self {
            name: name.into(),
            actions: Vec::new(),
            children: Vec::new(),
            is_final: false,
            generated: false,
            active,
        }
    }

    /// Context name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare an action. Re-declaring a name replaces the previous declaration.
    pub fn register_hotkey_action(
        &mut self,
        name: ActionName,
        behavior: OverwriteBehavior,
        params: HotkeyActionParams,
    ) -> Result<()> {
        if self.is_final {
            return Err(Error::FinalContext {
                context: self.name.clone(),
                action: name,
            });
        }
        let action = HotkeyAction {
            name,
            behavior,
            triggers: params.triggers,
            callback: params.callback,
            overriding_callback: None,
            options: params.options,
            callback_overwritten: false,
            trigger_overwritten: false,
            options_overwritten: false,
        };
        match self.actions.iter_mut().find(|a| a.name == name) {
            Some(existing) => *existing = action,
            None => self.actions.push(action),
        }
        Ok(())
    }

    /// Find an action on this context or any descendant.
    pub fn action(&self, name: ActionName) -> Option<&HotkeyAction> {
        self.actions
            .iter()
            .find(|a| a.name == name)
            .or_else(|| self.children.iter().find_map(|c| c.action(name)))
    }

    /// Mutable lookup on this context or any descendant.
    fn action_mut(&mut self, name: ActionName) -> Option<&mut HotkeyAction> {
        if let Some(idx) = self.actions.iter().position(|a| a.name == name) {
            return self.actions.get_mut(idx);
        }
        self.children.iter_mut().find_map(|c| c.action_mut(name))
    }

    /// Mutable lookup that fails with [`Error::UnknownAction`].
    fn require_action_mut(&mut self, name: ActionName) -> Result<&mut HotkeyAction> {
        self.action_mut(name).ok_or(Error::UnknownAction(name))
    }

    /// True if the action exists here or on a descendant.
    pub fn has_action(&self, name: ActionName) -> bool {
        self.action(name).is_some()
    }

    /// Set the owner's callback without marking the action overwritten.
    pub fn set_action_callback(&mut self, name: ActionName, callback: HotkeyCallback) -> Result<()> {
        self.require_action_mut(name)?.callback = Some(callback);
        Ok(())
    }

    /// Overwrite the action's callback and mark it overwritten.
    pub fn overwrite_hotkey_callback(
        &mut self,
        name: ActionName,
        callback: HotkeyCallback,
    ) -> Result<()> {
        let action = self.require_action_mut(name)?;
        action.overriding_callback = Some(callback);
        action.callback_overwritten = true;
        Ok(())
    }

    /// Overwrite the action's triggers and mark them overwritten.
    pub fn overwrite_hotkey_trigger<I, S>(&mut self, name: ActionName, triggers: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let action = self.require_action_mut(name)?;
        action.triggers = triggers.into_iter().map(Into::into).collect();
        action.trigger_overwritten = true;
        Ok(())
    }

    /// Overwrite the action's options and mark them overwritten.
    pub fn overwrite_hotkey_options(&mut self, name: ActionName, options: HotkeyOptions) -> Result<()> {
        let action = self.require_action_mut(name)?;
        action.options = options;
        action.options_overwritten = true;
        Ok(())
    }

    /// # Panics
    /// If the action's callback was overwritten.
    pub fn panic_if_callback_overwritten(&self, name: ActionName) {
        if let Some(action) = self.action(name) {
            assert!(
                !action.callback_overwritten,
                "callback of action '{name}' on '{}' must not be overwritten",
                self.name
            );
        }
    }

    /// # Panics
    /// If the action's triggers were overwritten.
    pub fn panic_if_trigger_overwritten(&self, name: ActionName) {
        if let Some(action) = self.action(name) {
            assert!(
                !action.trigger_overwritten,
                "trigger of action '{name}' on '{}' must not be overwritten",
                self.name
            );
        }
    }

    /// # Panics
    /// If the action's options were overwritten.
    pub fn panic_if_options_overwritten(&self, name: ActionName) {
        if let Some(action) = self.action(name) {
            assert!(
                !action.options_overwritten,
                "options of action '{name}' on '{}' must not be overwritten",
                self.name
            );
        }
    }

    /// Embed a child component.
    pub fn add_child_context(&mut self, child: Self) {
        self.children.push(child);
    }

    /// Embedded children.
    pub fn children(&self) -> &[Self] {
        &self.children
    }

    /// Child by name, searching descendants.
    pub fn child_context(&self, name: &str) -> Option<&Self> {
        self.children
            .iter()
            .find(|c| c.name == name)
            .or_else(|| self.children.iter().find_map(|c| c.child_context(name)))
    }

    /// Forbid further action registration.
    pub fn set_final(&mut self) {
        self.is_final = true;
    }

    /// True once final.
    pub fn is_final(&self) -> bool {
        self.is_final
    }

    /// Set the active flag, notifying subscribers if it changed.
    pub fn set_active(&self, active: bool) {
        self.active.send_if_modified(|current| {
            let changed = *current != active;
            *current = active;
            changed
        });
    }

    /// Current active flag.
    pub fn is_active(&self) -> bool {
        *self.active.borrow()
    }

    /// Subscribe to active-flag changes.
    pub fn subscribe_active(&self) -> watch::Receiver<bool> {
        self.active.subscribe()
    }

    /// True if a generated context has not been dropped.
    pub fn has_generated_hotkeys_context(&self) -> bool {
        self.generated
    }

    /// Append the materialized hotkeys of this subtree to `ctx`, children first.
    fn flatten_into(&self, ctx: &mut HotkeysContext) {
        for child in &self.children {
            child.flatten_into(ctx);
        }
        for action in &self.actions {
            let Some(callback) = action.effective_callback() else {
                debug!("{}: action {} has no callback, skipping", self.name, action.name);
                continue;
            };
            if action.options.description.is_none() {
                debug!("{}: action {} has no description, skipping", self.name, action.name);
                continue;
            }
            ctx.register(&action.triggers, &callback, &action.options);
        }
    }

    /// Materialize every wired-up action of this context and its children.
    ///
    /// Fails with [`Error::AlreadyGenerated`] until [`Self::drop_hotkeys_context`] is called.
    pub fn generate_hotkeys_context(&mut self) -> Result<HotkeysContext> {
        if self.generated {
            return Err(Error::AlreadyGenerated(self.name.clone()));
        }
        let mut ctx = HotkeysContext::new(self.name.clone());
        self.flatten_into(&mut ctx);
        self.generated = true;
        debug!("generated hotkeys context {} ({} hotkeys)", self.name, ctx.len());
        Ok(ctx)
    }

    /// Allow the next [`Self::generate_hotkeys_context`] call.
    pub fn drop_hotkeys_context(&mut self) -> Result<()> {
        if !self.generated {
            return Err(Error::NotGenerated(self.name.clone()));
        }
        self.generated = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use parking_lot::Mutex;

    use super::*;
    use crate::hotkey::{callback, noop_callback};
    use keyspec::{KeyEvent, KeyEventKind};

    const OPEN: ActionName = ActionName::new("open");
    const CLOSE: ActionName = ActionName::new("close");
    const DELETE: ActionName = ActionName::new("delete");

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, tag: &'static str) -> HotkeyCallback {
        let log = log.clone();
        callback(move |_, _| log.lock().push(tag))
    }

    fn params(trigger: &str, cb: Option<HotkeyCallback>) -> HotkeyActionParams {
        HotkeyActionParams {
            triggers: vec![trigger.to_string()],
            callback: cb,
            options: HotkeyOptions::described(format!("run {trigger}")),
        }
    }

    async fn fire(ctx: &HotkeysContext, combo: &str) {
        let hk = ctx.hotkey(combo, KeyEventKind::KeyDown).expect("hotkey").clone();
        hk.run(KeyEvent::down(combo)).await;
    }

    #[tokio::test]
    async fn replace_and_wrap() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut comp = ComponentHotkeyContext::new("viewer");
        let own_open = params("o", Some(recorder(&log, "own-open")));
        let own_close = params("c", Some(recorder(&log, "own-close")));
        comp.register_hotkey_action(OPEN, OverwriteBehavior::Replace, own_open)
            .expect("register");
        comp.register_hotkey_action(CLOSE, OverwriteBehavior::Wrap, own_close)
            .expect("register");

        comp.overwrite_hotkey_callback(OPEN, recorder(&log, "parent-open"))
            .expect("overwrite");
        comp.overwrite_hotkey_callback(CLOSE, recorder(&log, "parent-close"))
            .expect("overwrite");

        let ctx = comp.generate_hotkeys_context().expect("generate");
        fire(&ctx, "o").await;
        fire(&ctx, "c").await;
        assert_eq!(*log.lock(), vec!["parent-open", "parent-close", "own-close"]);
    }

    #[test]
    fn actions_without_callback_or_description_are_skipped() {
        let mut comp = ComponentHotkeyContext::new("viewer");
        comp.register_hotkey_action(OPEN, OverwriteBehavior::Replace, params("o", None))
            .expect("register");
        comp.register_hotkey_action(
            CLOSE,
            OverwriteBehavior::Replace,
            HotkeyActionParams::new(["c"], HotkeyOptions::default())
                .with_callback(noop_callback()),
        )
        .expect("register");
        let ctx = comp.generate_hotkeys_context().expect("generate");
        assert!(ctx.is_empty());
    }

    #[test]
    fn generate_once_until_dropped() {
        let mut comp = ComponentHotkeyContext::new("viewer");
        assert!(comp.generate_hotkeys_context().is_ok());
        assert_eq!(
            comp.generate_hotkeys_context().unwrap_err(),
            Error::AlreadyGenerated("viewer".into())
        );
        comp.drop_hotkeys_context().expect("drop");
        assert_eq!(
            comp.drop_hotkeys_context().unwrap_err(),
            Error::NotGenerated("viewer".into())
        );
        assert!(comp.generate_hotkeys_context().is_ok());
    }

    #[test]
    fn final_contexts_reject_new_actions() {
        let mut comp = ComponentHotkeyContext::new("viewer");
        comp.register_hotkey_action(OPEN, OverwriteBehavior::Ignore, params("o", None))
            .expect("register");
        comp.set_final();
        assert!(matches!(
            comp.register_hotkey_action(CLOSE, OverwriteBehavior::Replace, params("c", None)),
            Err(Error::FinalContext { .. })
        ));
        comp.overwrite_hotkey_trigger(OPEN, ["p"]).expect("overwrite still allowed");
        assert_eq!(
            comp.action(OPEN).map(|a| a.triggers().to_vec()),
            Some(vec!["p".to_string()])
        );
    }

    #[test]
    fn children_are_flattened_and_parent_wins() {
        let mut child = ComponentHotkeyContext::new("tags");
        child
            .register_hotkey_action(DELETE, OverwriteBehavior::Replace, params("x", Some(noop_callback())))
            .expect("register");
        child
            .register_hotkey_action(OPEN, OverwriteBehavior::Replace, params("o", Some(noop_callback())))
            .expect("register");
        child.set_final();

        let mut parent = ComponentHotkeyContext::new("tagger");
        let parent_o = HotkeyActionParams::new(["o"], HotkeyOptions::described("parent o"))
            .with_callback(noop_callback());
        parent
            .register_hotkey_action(CLOSE, OverwriteBehavior::Replace, parent_o)
            .expect("register");
        parent.add_child_context(child);

        assert!(parent.has_action(DELETE));
        assert!(parent.child_context("tags").is_some());
        parent.overwrite_hotkey_trigger(DELETE, ["shift+x"]).expect("overwrite child");

        let ctx = parent.generate_hotkeys_context().expect("generate");
        assert_eq!(ctx.name(), "tagger");
        assert!(ctx.has_hotkey("shift+x", KeyEventKind::KeyDown));
        assert!(!ctx.has_hotkey("x", KeyEventKind::KeyDown));
        assert_eq!(
            ctx.hotkey("o", KeyEventKind::KeyDown).map(|h| h.description()),
            Some("parent o")
        );
        let unknown = ActionName::new("nope");
        assert_eq!(
            parent
                .overwrite_hotkey_callback(unknown, noop_callback())
                .unwrap_err(),
            Error::UnknownAction(unknown)
        );
    }

    #[test]
    #[should_panic(expected = "must not be overwritten")]
    fn ignore_is_enforced_by_the_owner() {
        let mut comp = ComponentHotkeyContext::new("viewer");
        comp.register_hotkey_action(OPEN, OverwriteBehavior::Ignore, params("o", None))
            .expect("register");
        comp.overwrite_hotkey_callback(OPEN, noop_callback())
            .expect("write");
        comp.panic_if_callback_overwritten(OPEN);
    }

    #[tokio::test]
    async fn active_flag_notifies() {
        let comp = ComponentHotkeyContext::new("viewer");
        let mut rx = comp.subscribe_active();
        comp.set_active(true);
        rx.changed().await.expect("changed");
        assert!(*rx.borrow_and_update());
        comp.set_active(true);
        assert!(!rx.has_changed().expect("open"));
        assert!(comp.is_active());
    }
}
