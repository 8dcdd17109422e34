use std::sync::Arc;

use hotkeys_engine::{
    CallbackError, DispatchOutcome, HotkeyContextManager, HotkeyOptions, HotkeysContext,
    async_callback, test_support::Recorder,
};
use keyspec::KeyEvent;
use tokio::sync::Notify;

/// A callback that signals `entered` and then waits for `gate`.
fn gated(entered: &Arc<Notify>, gate: &Arc<Notify>) -> hotkeys_engine::HotkeyCallback {
    let entered = entered.clone();
    let gate = gate.clone();
    async_callback(move |_, _| {
        let entered = entered.clone();
        let gate = gate.clone();
        async move {
            entered.notify_one();
            gate.notified().await;
            Ok::<(), CallbackError>(())
        }
    })
}

#[tokio::test]
async fn awaited_hotkeys_block_every_other_hotkey() {
    let entered = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let rec = Recorder::new();

    let mut ctx = HotkeysContext::new("main");
    ctx.register(["a"], &gated(&entered, &gate), &HotkeyOptions::default());
    ctx.register(["b"], &rec.callback(), &HotkeyOptions::default());

    let manager = Arc::new(HotkeyContextManager::default());
    manager.declare_context(ctx).expect("declare");
    manager.load_context("main", false).expect("load");

    let task = tokio::spawn({
        let manager = manager.clone();
        async move { manager.dispatch(KeyEvent::down("a")).await }
    });
    entered.notified().await;
    assert!(manager.controller().is_locked_on_execution());

    let out = manager.dispatch(KeyEvent::down("b")).await.expect("dispatch");
    assert_eq!(out, DispatchOutcome::Forbidden);
    assert_eq!(rec.count(), 0);

    gate.notify_one();
    let out = task.await.expect("join").expect("dispatch");
    assert!(out.fired());
    assert!(!manager.controller().is_locked_on_execution());

    let out = manager.dispatch(KeyEvent::down("b")).await.expect("dispatch");
    assert!(out.fired());
    assert_eq!(rec.count(), 1);
}

#[tokio::test]
async fn fire_and_forget_hotkeys_do_not_reenter() {
    let entered = Arc::new(Notify::new());
    let gate = Arc::new(Notify::new());
    let rec = Recorder::new();
    let detached = HotkeyOptions::default().await_execution(false);

    let mut ctx = HotkeysContext::new("main");
    ctx.register(["a"], &gated(&entered, &gate), &detached);
    ctx.register(["b"], &rec.callback(), &HotkeyOptions::default());

    let manager = HotkeyContextManager::default();
    manager.declare_context(ctx).expect("declare");
    manager.load_context("main", false).expect("load");

    let out = manager.dispatch(KeyEvent::down("a")).await.expect("dispatch");
    assert!(out.fired());
    entered.notified().await;

    let out = manager.dispatch(KeyEvent::down("a")).await.expect("dispatch");
    assert_eq!(out, DispatchOutcome::Busy { combo: "a".into() });

    let out = manager.dispatch(KeyEvent::down("b")).await.expect("dispatch");
    assert!(out.fired());
    assert_eq!(rec.count(), 1);

    gate.notify_one();
}

#[tokio::test]
async fn callbacks_can_switch_contexts() {
    let manager = Arc::new(HotkeyContextManager::default());
    let rec = Recorder::new();

    let weak = Arc::downgrade(&manager);
    let open_dialog = async_callback(move |_, _| {
        let weak = weak.clone();
        async move {
            if let Some(manager) = weak.upgrade() {
                manager.load_context("dialog", true)?;
            }
            Ok::<(), CallbackError>(())
        }
    });
    let weak = Arc::downgrade(&manager);
    let close_dialog = async_callback(move |_, _| {
        let weak = weak.clone();
        async move {
            if let Some(manager) = weak.upgrade() {
                manager.load_previous_context()?;
            }
            Ok::<(), CallbackError>(())
        }
    });

    let mut main = HotkeysContext::new("main");
    main.register(["o"], &open_dialog, &HotkeyOptions::default());
    main.register(["x"], &rec.callback(), &HotkeyOptions::default());
    let mut dialog = HotkeysContext::new("dialog");
    dialog.register(["esc"], &close_dialog, &HotkeyOptions::default());
    manager.declare_context(main).expect("declare");
    manager.declare_context(dialog).expect("declare");
    manager.load_context("main", false).expect("load");

    manager.dispatch(KeyEvent::down("o")).await.expect("dispatch");
    assert_eq!(manager.current_context_name().as_deref(), Some("dialog"));
    assert_eq!(manager.context_stack(), vec!["main"]);

    let out = manager.dispatch(KeyEvent::down("x")).await.expect("dispatch");
    assert_eq!(out, DispatchOutcome::NoMatch);

    manager.dispatch(KeyEvent::down("Escape")).await.expect("dispatch");
    assert_eq!(manager.current_context_name().as_deref(), Some("main"));
    assert!(manager.dispatch(KeyEvent::down("x")).await.expect("dispatch").fired());
    assert_eq!(rec.count(), 1);
}

#[tokio::test]
async fn paused_controller_records_without_firing() {
    let rec = Recorder::new();
    let mut ctx = HotkeysContext::new("main");
    ctx.register(["\\d g"], &rec.callback(), &HotkeyOptions::default());
    let manager = HotkeyContextManager::default();
    manager.declare_context(ctx).expect("declare");
    manager.load_context("main", false).expect("load");

    manager.controller().pause();
    let out = manager.dispatch(KeyEvent::down("4")).await.expect("dispatch");
    assert_eq!(out, DispatchOutcome::Forbidden);
    assert_eq!(manager.controller().vim_motion_events().len(), 1);

    manager.controller().resume();
    manager.dispatch(KeyEvent::down("g")).await.expect("dispatch");
    assert_eq!(rec.count(), 1);
    assert_eq!(rec.calls()[0].motion(), Some(4));
}
