use hotkeys_engine::{
    DispatchOutcome, EngineConfig, HotkeyOptions, HotkeysContext, HotkeysController,
    test_support::{Recorder, dispatch_all, keydown, keys_at, type_keys},
};
use keyspec::{EventTarget, KeyEvent, KeyEventKind};
use proptest::prelude::*;

/// Controller bound to a context holding `combos`, all recorded by one recorder.
fn bound(combos: &[&str], options: &HotkeyOptions) -> (HotkeysController, Recorder) {
    bound_with(EngineConfig::default(), combos, options)
}

fn bound_with(
    config: EngineConfig,
    combos: &[&str],
    options: &HotkeyOptions,
) -> (HotkeysController, Recorder) {
    let rec = Recorder::new();
    let mut ctx = HotkeysContext::new("test");
    ctx.register(combos.iter().copied(), &rec.callback(), options);
    let controller = HotkeysController::new(config);
    controller.bind_context(&ctx);
    (controller, rec)
}

#[tokio::test]
async fn ctrl_shift_a_fires_only_with_both_modifiers() {
    let (c, rec) = bound(&["ctrl+shift+a"], &HotkeyOptions::default());
    dispatch_all(
        &c,
        [
            KeyEvent::down("A").with_shift(),
            KeyEvent::down("a").with_ctrl(),
            KeyEvent::down("A").with_ctrl().with_shift().with_alt(),
        ],
    )
    .await;
    assert_eq!(rec.count(), 0);

    let out = c.dispatch(KeyEvent::down("A").with_ctrl().with_shift()).await;
    assert!(out.fired());
    assert_eq!(rec.combos(), vec!["ctrl+shift+a"]);
}

#[tokio::test]
async fn sequences_fire_on_their_last_key_in_order() {
    let (c, rec) = bound(&["g g", "g t"], &HotkeyOptions::default());
    let outcomes = dispatch_all(&c, type_keys("g t g g")).await;
    let fired: Vec<_> = outcomes.iter().map(DispatchOutcome::fired).collect();
    assert_eq!(fired, vec![false, true, false, true]);
    assert_eq!(rec.combos(), vec!["g t", "g g"]);

    let (c, rec) = bound(&["a b"], &HotkeyOptions::default());
    dispatch_all(&c, type_keys("b a")).await;
    assert_eq!(rec.count(), 0);
}

#[tokio::test]
async fn numeric_motions_are_captured() {
    let (c, rec) = bound(&["\\d g"], &HotkeyOptions::default());
    dispatch_all(&c, type_keys("3 g")).await;
    dispatch_all(&c, type_keys("x 1 2 g")).await;
    dispatch_all(&c, type_keys("x g")).await;
    let motions: Vec<_> = rec.calls().iter().map(|call| call.motion()).collect();
    assert_eq!(motions, vec![Some(3), Some(12)]);
}

#[tokio::test]
async fn outcome_reports_motions() {
    let (c, _rec) = bound(&["\\d j"], &HotkeyOptions::default());
    let outcomes = dispatch_all(&c, type_keys("4 2 j")).await;
    assert_eq!(
        outcomes.last(),
        Some(&DispatchOutcome::Fired {
            combo: "\\d j".into(),
            motions: vec![42],
        })
    );
}

#[tokio::test]
async fn timed_sequences_expire() {
    let timed = HotkeyOptions::default().consider_time_in_sequence(true);
    let (c, rec) = bound(&["d d"], &timed);
    dispatch_all(&c, keys_at("d d", 0, 2000)).await;
    assert_eq!(rec.count(), 0);
    dispatch_all(&c, keys_at("d d", 10_000, 100)).await;
    assert_eq!(rec.count(), 1);

    let (c, rec) = bound(&["d d"], &HotkeyOptions::default());
    dispatch_all(&c, keys_at("d d", 0, 2000)).await;
    assert_eq!(rec.count(), 1);
}

#[tokio::test]
async fn keyup_hotkeys_only_see_keyups() {
    let up = HotkeyOptions::default().mode(KeyEventKind::KeyUp);
    let (c, rec) = bound(&["x"], &up);
    assert_eq!(c.dispatch(KeyEvent::down("x")).await, DispatchOutcome::NoMatch);
    assert!(c.dispatch(KeyEvent::up("x")).await.fired());
    assert_eq!(rec.count(), 1);
}

#[tokio::test]
async fn typing_in_text_inputs_is_ignored() {
    let (c, rec) = bound(&["a"], &HotkeyOptions::default());
    for target in [EventTarget::TextInput, EventTarget::TextArea] {
        let out = c.dispatch(keydown("a").from_target(target)).await;
        assert_eq!(out, DispatchOutcome::Ignored);
    }
    assert_eq!(rec.count(), 0);
    assert!(c.dispatch(keydown("a").from_target(EventTarget::Other)).await.fired());
}

#[tokio::test]
async fn repeats_are_blocked_or_throttled() {
    let options = HotkeyOptions::default().can_repeat(true);
    let (c, rec) = bound(&["j"], &options);
    let outcomes = dispatch_all(
        &c,
        [
            keydown("j").at(1000),
            keydown("j").repeating().at(1050),
            keydown("j").repeating().at(1200),
        ],
    )
    .await;
    assert_eq!(
        outcomes[1],
        DispatchOutcome::RepeatBlocked { combo: "j".into() }
    );
    assert_eq!(rec.count(), 2);
    assert_eq!(c.triggered_hotkeys(KeyEventKind::KeyDown).len(), 2);

    let (c, rec) = bound(&["k"], &HotkeyOptions::default());
    let out = c.dispatch(keydown("k").repeating().at(5000)).await;
    assert_eq!(out, DispatchOutcome::RepeatBlocked { combo: "k".into() });
    assert_eq!(rec.count(), 0);
}

#[tokio::test]
async fn shift_selects_between_hotkeys_on_the_same_key() {
    let (c, rec) = bound(&["a", "shift+a"], &HotkeyOptions::default());
    c.dispatch(KeyEvent::down("A").with_shift()).await;
    c.dispatch(KeyEvent::down("a")).await;
    assert_eq!(rec.combos(), vec!["shift+a", "a"]);
}

#[tokio::test]
async fn first_registered_match_wins_by_default() {
    let (c, rec) = bound(&["5", "\\d"], &HotkeyOptions::default());
    c.dispatch(keydown("5")).await;
    assert_eq!(rec.combos(), vec!["5"]);
}

#[tokio::test]
async fn specificity_precedence_picks_the_most_specific() {
    let config = EngineConfig {
        specificity_precedence: true,
        ..EngineConfig::default()
    };
    let (c, rec) = bound_with(config, &["5", "\\d"], &HotkeyOptions::default());
    c.dispatch(keydown("5")).await;
    assert_eq!(rec.combos(), vec!["\\d"]);
    assert_eq!(rec.calls()[0].motion(), Some(5));
}

#[tokio::test]
async fn modifier_keydowns_do_not_break_sequences() {
    let (c, rec) = bound(&["g shift+g"], &HotkeyOptions::default());
    dispatch_all(
        &c,
        [
            keydown("g"),
            KeyEvent::down("Shift").with_shift(),
            KeyEvent::down("G").with_shift(),
        ],
    )
    .await;
    assert_eq!(rec.combos(), vec!["g shift+g"]);
}

#[tokio::test]
async fn last_events_looks_back() {
    let (c, _rec) = bound(&["z"], &HotkeyOptions::default());
    dispatch_all(&c, type_keys("a b c")).await;
    let keys: Option<Vec<String>> = c
        .last_events(KeyEventKind::KeyDown, 2)
        .map(|events| events.into_iter().map(|e| e.key).collect());
    assert_eq!(keys, Some(vec!["c".to_string(), "b".to_string()]));
    assert_eq!(c.last_events(KeyEventKind::KeyDown, 4), None);
    assert_eq!(c.last_events(KeyEventKind::KeyUp, 1), None);
}

/// Keys drawn from a small alphabet so that overlapping sequences collide often.
fn key_strategy() -> impl Strategy<Value = String> {
    prop::sample::select(vec!["a", "b", "g", "1", "2"]).prop_map(str::to_string)
}

proptest! {
    #[test]
    fn at_most_one_hotkey_fires_per_event(keys in prop::collection::vec(key_strategy(), 1..40)) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .expect("runtime");
        rt.block_on(async {
            let combos = ["a", "g g", "a b", "\\d g", "\\d a", "b", "1 2"];
            let (c, rec) = bound(&combos, &HotkeyOptions::default());
            for key in &keys {
                let before = rec.count();
                let out = c.dispatch(keydown(key)).await;
                let after = rec.count();
                prop_assert!(after - before <= 1);
                prop_assert_eq!(after - before == 1, out.fired());
            }
            Ok(())
        })?;
    }
}
