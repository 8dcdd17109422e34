use std::sync::Arc;

use hotkeys_engine::{
    ActionName, ComponentHotkeyContext, ContextEvent, DispatchOutcome, EngineConfig,
    HotkeyActionParams, HotkeyContextManager, HotkeyOptions, HotkeysContext, OverwriteBehavior,
    hotkeys_manager, setup_hotkeys_manager,
    test_support::{Recorder, dispatch_all, type_keys},
};
use keyspec::{CaptureState, KeyEvent, KeyEventKind};

const SAVE: ActionName = ActionName::new("save");
const CLOSE: ActionName = ActionName::new("close");

fn manager_with(contexts: Vec<HotkeysContext>) -> HotkeyContextManager {
    let manager = HotkeyContextManager::default();
    for ctx in contexts {
        manager.declare_context(ctx).expect("declare");
    }
    manager
}

fn context(name: &str, combos: &[&str], rec: &Recorder) -> HotkeysContext {
    let mut ctx = HotkeysContext::new(name);
    ctx.register(combos.iter().copied(), &rec.callback(), &HotkeyOptions::default());
    ctx
}

#[tokio::test]
async fn loading_a_context_drops_partial_sequences() {
    let rec = Recorder::new();
    let manager = manager_with(vec![
        context("one", &["g g"], &rec),
        context("two", &["g g"], &rec),
    ]);
    manager.load_context("one", false).expect("load");
    manager.dispatch(KeyEvent::down("g")).await.expect("dispatch");
    manager.load_context("two", false).expect("load");
    let out = manager.dispatch(KeyEvent::down("g")).await.expect("dispatch");
    assert_eq!(out, DispatchOutcome::NoMatch);
    assert!(manager.dispatch(KeyEvent::down("g")).await.expect("dispatch").fired());
}

#[tokio::test]
async fn deferred_switch_applies_the_last_request_on_unlock() {
    let rec = Recorder::new();
    let manager = manager_with(vec![
        context("main", &["m"], &rec),
        context("left", &["l"], &rec),
        context("right", &["r"], &rec),
    ]);
    let mut events = manager.subscribe();
    manager.load_context("main", false).expect("load");
    manager.lock_context_control().expect("lock");
    manager.load_context("left", true).expect("defer");
    manager.load_context("right", true).expect("defer");

    assert!(manager.dispatch(KeyEvent::down("m")).await.expect("dispatch").fired());
    manager.unlock_context_control().expect("unlock");
    assert_eq!(manager.current_context_name().as_deref(), Some("right"));
    assert!(manager.context_stack().is_empty());
    assert!(manager.dispatch(KeyEvent::down("r")).await.expect("dispatch").fired());
    assert_eq!(rec.combos(), vec!["m", "r"]);

    let mut seen = Vec::new();
    while let Ok(event) = events.try_recv() {
        seen.push(event);
    }
    assert_eq!(
        seen,
        vec![
            ContextEvent::Changed(Some("main".into())),
            ContextEvent::Locked,
            ContextEvent::Unlocked,
            ContextEvent::Changed(Some("right".into())),
        ]
    );
}

#[tokio::test]
async fn hotkeys_registered_on_the_loaded_context_are_live() {
    let rec = Recorder::new();
    let manager = manager_with(vec![context("main", &["a"], &rec)]);
    manager.load_context("main", false).expect("load");
    manager
        .register_hotkey_on_context(["b"], &rec.callback(), &HotkeyOptions::default())
        .expect("register");
    assert!(manager.dispatch(KeyEvent::down("b")).await.expect("dispatch").fired());

    manager
        .unregister_hotkey_from_context(["a"], KeyEventKind::KeyDown)
        .expect("unregister");
    let out = manager.dispatch(KeyEvent::down("a")).await.expect("dispatch");
    assert_eq!(out, DispatchOutcome::NoMatch);

    manager.unregister_current_context().expect("unbind");
    assert!(manager.has_context("main"));
    let out = manager.dispatch(KeyEvent::down("b")).await.expect("dispatch");
    assert_eq!(out, DispatchOutcome::NoMatch);
    manager.reload_current_context().expect_err("nothing loaded");
}

#[tokio::test]
async fn string_capture_collects_until_enter() {
    let rec = Recorder::new();
    let manager = manager_with(vec![context("main", &["f \\s", "h"], &rec)]);
    manager.load_context("main", false).expect("load");

    let mut outcomes = Vec::new();
    for key in ["f", "h", "i", "Backspace", "o", "Enter"] {
        outcomes.push(manager.dispatch(KeyEvent::down(key)).await.expect("dispatch"));
    }
    assert_eq!(
        outcomes[0],
        DispatchOutcome::CaptureStarted {
            combo: "f \\s".into()
        }
    );
    let progress: Vec<_> = outcomes[1..5]
        .iter()
        .filter_map(|o| match o {
            DispatchOutcome::Captured { progress, .. } => Some(progress.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(progress, vec!["h", "hi", "h", "ho"]);
    assert!(outcomes[5].fired());

    let calls = rec.calls();
    assert_eq!(calls.len(), 1);
    let capture = calls[0].capture.clone().expect("capture outcome");
    assert!(capture.accepted());
    assert_eq!(capture.text, "ho");
    assert_eq!(manager.controller().active_capture(), None);

    assert!(manager.dispatch(KeyEvent::down("h")).await.expect("dispatch").fired());
    assert_eq!(rec.combos(), vec!["f \\s", "h"]);
}

#[tokio::test]
async fn character_capture_completes_on_one_key_and_can_be_cancelled() {
    let rec = Recorder::new();
    let manager = manager_with(vec![context("main", &["m \\c"], &rec)]);
    manager.load_context("main", false).expect("load");

    dispatch_all(manager.controller(), type_keys("m x")).await;
    dispatch_all(manager.controller(), [KeyEvent::down("m"), KeyEvent::down("Escape")]).await;

    let captures: Vec<_> = rec
        .calls()
        .into_iter()
        .filter_map(|c| c.capture)
        .map(|c| (c.state, c.text))
        .collect();
    assert_eq!(
        captures,
        vec![
            (CaptureState::Complete, "x".to_string()),
            (CaptureState::Cancelled, String::new()),
        ]
    );
}

#[tokio::test]
async fn configured_terminators_apply_to_captures() {
    let rec = Recorder::new();
    let config = EngineConfig {
        capture_accept_terminator: "tab".into(),
        ..EngineConfig::default()
    };
    let manager = HotkeyContextManager::new(config);
    manager
        .declare_context(context("main", &["f \\s", "g \\s enter"], &rec))
        .expect("declare");
    manager.load_context("main", false).expect("load");

    dispatch_all(manager.controller(), type_keys("f a Enter b Tab")).await;
    dispatch_all(manager.controller(), type_keys("g c Enter")).await;
    let texts: Vec<_> = rec
        .calls()
        .into_iter()
        .filter_map(|c| c.capture.map(|c| c.text))
        .collect();
    assert_eq!(texts, vec!["ab", "c"]);
}

#[tokio::test]
async fn component_contexts_are_declared_through_the_manager() {
    let rec = Recorder::new();
    let mut parent = ComponentHotkeyContext::new("editor");
    parent
        .register_hotkey_action(
            SAVE,
            OverwriteBehavior::Replace,
            HotkeyActionParams::new(["ctrl+s"], HotkeyOptions::described("<file>Save"))
                .with_callback(rec.callback()),
        )
        .expect("register");
    parent
        .register_hotkey_action(
            CLOSE,
            OverwriteBehavior::Replace,
            HotkeyActionParams::new(["q"], HotkeyOptions::default()).with_callback(rec.callback()),
        )
        .expect("register");

    let manager = HotkeyContextManager::default();
    manager.declare_component_context(&mut parent).expect("declare");
    manager
        .declare_component_context(&mut parent)
        .expect_err("generated twice");
    manager.load_context("editor", false).expect("load");

    assert!(
        manager
            .dispatch(KeyEvent::down("s").with_ctrl())
            .await
            .expect("dispatch")
            .fired()
    );
    let out = manager.dispatch(KeyEvent::down("q")).await.expect("dispatch");
    assert_eq!(out, DispatchOutcome::NoMatch);
    assert_eq!(rec.calls()[0].group, "file");
}

#[tokio::test]
async fn default_manager_is_replaced_on_setup() {
    let first = setup_hotkeys_manager(EngineConfig::default());
    first
        .declare_context(HotkeysContext::new("main"))
        .expect("declare");
    let second = setup_hotkeys_manager(EngineConfig::default());
    assert!(first.is_destroyed());
    assert!(!second.is_destroyed());
    assert!(hotkeys_manager().is_some_and(|m| Arc::ptr_eq(&m, &second)));
    assert!(!second.has_context("main"));
}
