//! Named context registry with a push/pop stack and deferred switching.

use std::{collections::HashMap, sync::Arc};

use keyspec::{KeyEvent, KeyEventKind};
use parking_lot::{Mutex, RwLock, const_rwlock};
use tokio::sync::broadcast;
use tracing::{debug, info};

use crate::{
    component::ComponentHotkeyContext,
    config::EngineConfig,
    context::HotkeysContext,
    controller::{DispatchOutcome, HotkeysController},
    error::{Error, Result},
    hotkey::{HotkeyCallback, HotkeyOptions},
};

/// Capacity of the context event channel.
const EVENT_CAPACITY: usize = 64;

/// Notifications about context changes.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ContextEvent {
    /// A context was declared or replaced.
    Declared(String),
    /// A context was removed from the registry.
    Dropped(String),
    /// The bound context changed. `None` means nothing is bound.
    Changed(Option<String>),
    /// Context switches are being deferred.
    Locked,
    /// Context switches are applied again.
    Unlocked,
    /// The manager was destroyed.
    Destroyed,
}

/// Mutable manager state.
#[derive(Default)]
struct ManagerState {
    /// Declared contexts by name.
    contexts: HashMap<String, HotkeysContext>,
    /// Name of the loaded context.
    current: Option<String>,
    /// Previously loaded contexts, most recent last.
    stack: Vec<String>,
    /// Context switches are deferred.
    locked: bool,
    /// Last switch requested while locked.
    deferred: Option<String>,
    /// `destroy` was called.
    destroyed: bool,
}

impl ManagerState {
    /// Fail if the manager was destroyed.
    fn check_alive(&self) -> Result<()> {
        if self.destroyed {
            return Err(Error::Destroyed);
        }
        Ok(())
    }
}

/// Owns the declared contexts and decides which one the controller has bound.
pub struct HotkeyContextManager {
    /// Registry, stack and lock state.
    state: Mutex<ManagerState>,
    /// Dispatcher for the loaded context.
    controller: HotkeysController,
    /// Context change notifications.
    events: broadcast::Sender<ContextEvent>,
}

impl Default for HotkeyContextManager {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl HotkeyContextManager {
    /// Create a manager with an empty registry.
    pub fn new(config: EngineConfig) -> Self {
        let (events, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self {
            state: Mutex::new(ManagerState::default()),
            controller: HotkeysController::new(config),
            events,
        }
    }

    /// The dispatcher. Use it for pause/resume and history lookback.
    pub fn controller(&self) -> &HotkeysController {
        &self.controller
    }

    /// Subscribe to context change notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<ContextEvent> {
        self.events.subscribe()
    }

    /// Publish an event; having no subscribers is fine.
    fn emit(&self, event: ContextEvent) {
        let _ = self.events.send(event);
    }

    /// Feed one keyboard event to the loaded context.
    pub async fn dispatch(&self, event: KeyEvent) -> Result<DispatchOutcome> {
        self.state.lock().check_alive()?;
        Ok(self.controller.dispatch(event).await)
    }

    /// Add `context` to the registry, replacing a context with the same name.
    ///
    /// Replacing the loaded context rebinds it.
    pub fn declare_context(&self, context: HotkeysContext) -> Result<()> {
        let name = context.name().to_string();
        {
            let mut st = self.state.lock();
            st.check_alive()?;
            if st.current.as_deref() == Some(name.as_str()) {
                self.controller.bind_context(&context);
            }
            st.contexts.insert(name.clone(), context);
        }
        debug!("declared context {}", name);
        self.emit(ContextEvent::Declared(name));
        Ok(())
    }

    /// Generate the hotkeys of a component context and declare them.
    pub fn declare_component_context(&self, component: &mut ComponentHotkeyContext) -> Result<()> {
        self.state.lock().check_alive()?;
        let context = component.generate_hotkeys_context()?;
        self.declare_context(context)
    }

    /// Remove a context from the registry. Dropping the loaded context unbinds it.
    ///
    /// Returns false if no such context was declared.
    pub fn drop_context(&self, name: &str) -> Result<bool> {
        let unbound = {
            let mut st = self.state.lock();
            st.check_alive()?;
            if st.contexts.remove(name).is_none() {
                return Ok(false);
            }
            st.stack.retain(|n| n != name);
            if st.deferred.as_deref() == Some(name) {
                st.deferred = None;
            }
            let unbound = st.current.as_deref() == Some(name);
            if unbound {
                st.current = None;
                self.controller.drop_context();
            }
            unbound
        };
        debug!("dropped context {}", name);
        self.emit(ContextEvent::Dropped(name.to_string()));
        if unbound {
            self.emit(ContextEvent::Changed(None));
        }
        Ok(true)
    }

    /// True if `name` is declared.
    pub fn has_context(&self, name: &str) -> bool {
        self.state.lock().contexts.contains_key(name)
    }

    /// Names of every declared context, sorted.
    pub fn context_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.state.lock().contexts.keys().cloned().collect();
        names.sort();
        names
    }

    /// Copy of a declared context.
    pub fn context(&self, name: &str) -> Option<HotkeysContext> {
        self.state.lock().contexts.get(name).cloned()
    }

    /// Name of the loaded context.
    pub fn current_context_name(&self) -> Option<String> {
        self.state.lock().current.clone()
    }

    /// The context stack, oldest first.
    pub fn context_stack(&self) -> Vec<String> {
        self.state.lock().stack.clone()
    }

    /// Bind the context called `name`.
    ///
    /// With `preserve_previous`, the currently loaded context is pushed onto the stack so
    /// [`Self::load_previous_context`] can return to it. While context control is locked
    /// the request is remembered instead, replacing any earlier deferred request.
    pub fn load_context(&self, name: &str, preserve_previous: bool) -> Result<()> {
        {
            let mut st = self.state.lock();
            st.check_alive()?;
            if !st.contexts.contains_key(name) {
                return Err(Error::UnknownContext(name.to_string()));
            }
            if st.locked {
                debug!("context control locked; deferring load of {}", name);
                st.deferred = Some(name.to_string());
                return Ok(());
            }
            self.load_locked(&mut st, name, preserve_previous)?;
        }
        self.emit(ContextEvent::Changed(Some(name.to_string())));
        Ok(())
    }

    /// Bind `name` with the state lock held.
    fn load_locked(&self, st: &mut ManagerState, name: &str, preserve_previous: bool) -> Result<()> {
        let context = st
            .contexts
            .get(name)
            .ok_or_else(|| Error::UnknownContext(name.to_string()))?;
        if preserve_previous
            && let Some(current) = &st.current
            && st.stack.last() != Some(current)
        {
            st.stack.push(current.clone());
        }
        self.controller.bind_context(context);
        st.current = Some(name.to_string());
        info!("loaded context {}", name);
        Ok(())
    }

    /// Pop the context stack and load what was on top.
    pub fn load_previous_context(&self) -> Result<()> {
        let previous = {
            let mut st = self.state.lock();
            st.check_alive()?;
            st.stack.pop().ok_or(Error::NoPreviousContext)?
        };
        self.load_context(&previous, false)
    }

    /// Defer context switches until [`Self::unlock_context_control`].
    pub fn lock_context_control(&self) -> Result<()> {
        {
            let mut st = self.state.lock();
            st.check_alive()?;
            st.locked = true;
        }
        self.emit(ContextEvent::Locked);
        Ok(())
    }

    /// Stop deferring context switches and apply the last deferred one, if any.
    pub fn unlock_context_control(&self) -> Result<()> {
        let loaded = {
            let mut st = self.state.lock();
            st.check_alive()?;
            st.locked = false;
            match st.deferred.take() {
                Some(name) => {
                    self.load_locked(&mut st, &name, false)?;
                    Some(name)
                }
                None => None,
            }
        };
        self.emit(ContextEvent::Unlocked);
        if let Some(name) = loaded {
            self.emit(ContextEvent::Changed(Some(name)));
        }
        Ok(())
    }

    /// True while context switches are deferred.
    pub fn is_context_control_locked(&self) -> bool {
        self.state.lock().locked
    }

    /// Context switch waiting for unlock.
    pub fn deferred_context(&self) -> Option<String> {
        self.state.lock().deferred.clone()
    }

    /// Run `f` on the loaded context, then rebind it.
    fn edit_current(&self, f: impl FnOnce(&mut HotkeysContext)) -> Result<()> {
        let name = {
            let mut st = self.state.lock();
            st.check_alive()?;
            let name = st.current.clone().ok_or(Error::NoContextLoaded)?;
            let context = st
                .contexts
                .get_mut(&name)
                .ok_or_else(|| Error::UnknownContext(name.clone()))?;
            f(context);
            self.controller.bind_context(context);
            name
        };
        self.emit(ContextEvent::Changed(Some(name)));
        Ok(())
    }

    /// Register hotkeys on the loaded context and rebind it.
    pub fn register_hotkey_on_context<I, S>(
        &self,
        triggers: I,
        callback: &HotkeyCallback,
        options: &HotkeyOptions,
    ) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.edit_current(|ctx| ctx.register(triggers, callback, options))
    }

    /// Unregister hotkeys from the loaded context and rebind it.
    pub fn unregister_hotkey_from_context<I, S>(&self, triggers: I, mode: KeyEventKind) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.edit_current(|ctx| ctx.unregister(triggers, mode))
    }

    /// Rebind the loaded context from the registry.
    pub fn reload_current_context(&self) -> Result<()> {
        self.edit_current(|_| {})
    }

    /// Unbind the loaded context without dropping it from the registry.
    pub fn unregister_current_context(&self) -> Result<()> {
        {
            let mut st = self.state.lock();
            st.check_alive()?;
            st.current = None;
            self.controller.drop_context();
        }
        self.emit(ContextEvent::Changed(None));
        Ok(())
    }

    /// True after [`Self::destroy`].
    pub fn is_destroyed(&self) -> bool {
        self.state.lock().destroyed
    }

    /// Unbind everything and clear the registry. Every later mutation fails.
    pub fn destroy(&self) {
        {
            let mut st = self.state.lock();
            if st.destroyed {
                return;
            }
            *st = ManagerState {
                destroyed: true,
                ..ManagerState::default()
            };
            self.controller.drop_context();
        }
        info!("hotkeys manager destroyed");
        self.emit(ContextEvent::Destroyed);
    }
}

/// Process-wide default manager.
static DEFAULT_MANAGER: RwLock<Option<Arc<HotkeyContextManager>>> = const_rwlock(None);

/// Install a fresh default manager, destroying the previous one.
pub fn setup_hotkeys_manager(config: EngineConfig) -> Arc<HotkeyContextManager> {
    let manager = Arc::new(HotkeyContextManager::new(config));
    let previous = DEFAULT_MANAGER.write().replace(manager.clone());
    if let Some(previous) = previous {
        previous.destroy();
    }
    manager
}

/// The default manager, if one was set up.
pub fn hotkeys_manager() -> Option<Arc<HotkeyContextManager>> {
    DEFAULT_MANAGER.read().clone()
}

/// Destroy and remove the default manager.
pub fn teardown_hotkeys_manager() {
    let previous = DEFAULT_MANAGER.write().take();
    if let Some(previous) = previous {
        previous.destroy();
    }
}
