/// Integration tests for the toast state machine, alone and inside a
/// dashboard.
///
/// Timings under test (defaults): settle 1000 ms, grace 1000 ms, dwell
/// 8000 ms and reload 9000 ms after the settle point.
mod common;

use std::rc::Rc;

use common::{Harness, RecordingToastView};
use qpep_dash::config::schema::ToastConfig;
use qpep_dash::error::DashError;
use qpep_dash::logging::EventLog;
use qpep_dash::notify::{ToastNotifier, ToastPhase};
use qpep_dash::runtime::Scheduler;
use qpep_dash::state::{Actions, Store, ToastKind};

fn notifier() -> (Scheduler, Actions, ToastNotifier, Rc<RecordingToastView>) {
    let scheduler = Scheduler::new();
    let actions = Actions::new(Store::with_defaults(EventLog::disabled()));
    let view = Rc::new(RecordingToastView::default());
    let notifier = ToastNotifier::new(
        ToastConfig::default(),
        scheduler.clone(),
        actions.clone(),
        view.clone(),
        EventLog::disabled(),
    );
    (scheduler, actions, notifier, view)
}

// ===========================================================================
// 1. Single active toast
// ===========================================================================

#[test]
fn only_one_toast_is_displayed_at_a_time() {
    let (scheduler, actions, notifier, view) = notifier();

    actions.show_message("first", "info", 2000).unwrap();
    scheduler.advance(1000);
    actions.show_message("second", "error", 2000).unwrap();
    actions.show_message("third", "error", 2000).unwrap();
    scheduler.advance(5000);

    assert_eq!(view.visible_messages(), vec!["first"]);
    assert_eq!(notifier.dropped_count(), 2);
    assert_eq!(notifier.phase(), ToastPhase::Hidden);
}

#[test]
fn message_during_grace_window_is_dropped() {
    let (scheduler, actions, notifier, view) = notifier();

    actions.show_message("first", "info", 1000).unwrap();
    // settle 1000 + timeout 1000: hidden, grace running
    scheduler.advance(2000);
    assert_eq!(notifier.phase(), ToastPhase::AutoHiding);

    scheduler.advance(500);
    actions.show_message("second", "error", 1000).unwrap();
    assert_eq!(notifier.dropped_count(), 1);
    assert_eq!(notifier.phase(), ToastPhase::AutoHiding);

    scheduler.advance(500);
    assert_eq!(notifier.phase(), ToastPhase::Hidden);
    assert!(actions.state().toast_message.is_none());

    scheduler.advance(5000);
    assert_eq!(view.visible_messages(), vec!["first"]);
    assert_eq!(notifier.phase(), ToastPhase::Hidden);
}

#[test]
fn message_while_reload_is_pending_is_dropped() {
    let (scheduler, actions, notifier, view) = notifier();

    actions.show_message("daemon gone", "error", 0).unwrap();
    scheduler.advance(9000);
    assert_eq!(notifier.phase(), ToastPhase::ReloadPending);

    actions.show_message("late", "info", 1000).unwrap();
    assert_eq!(notifier.dropped_count(), 1);
    assert_eq!(notifier.phase(), ToastPhase::ReloadPending);

    scheduler.advance(1000);
    assert_eq!(view.reloads.get(), 1);
    assert_eq!(view.visible_messages(), vec!["daemon gone"]);
}

#[test]
fn next_toast_is_accepted_after_grace() {
    let (scheduler, actions, notifier, view) = notifier();

    actions.show_message("first", "info", 1000).unwrap();
    // settle 1000 + timeout 1000 + grace 1000
    scheduler.advance(3000);
    assert_eq!(notifier.phase(), ToastPhase::Hidden);
    assert!(actions.state().toast_message.is_none());

    actions.show_message("second", "info", 1000).unwrap();
    scheduler.advance(1000);
    assert_eq!(view.visible_messages(), vec!["first", "second"]);
    assert_eq!(
        notifier.current().map(|t| t.kind),
        Some(ToastKind::Info)
    );
}

#[test]
fn same_message_again_after_clear_is_shown_again() {
    let (scheduler, actions, _notifier, view) = notifier();

    actions.show_message("retry", "error", 500).unwrap();
    scheduler.advance(2500);
    actions.show_message("retry", "error", 500).unwrap();
    scheduler.advance(1000);

    assert_eq!(view.visible_messages(), vec!["retry", "retry"]);
}

#[test]
fn timed_toast_never_reloads() {
    let (scheduler, actions, _notifier, view) = notifier();
    actions.show_message("note", "info", 1).unwrap();
    scheduler.advance(60_000);
    assert_eq!(view.reloads.get(), 0);
    assert_eq!(scheduler.pending(), 0);
}

// ===========================================================================
// 2. Persistent toast and reload
// ===========================================================================

#[test]
fn persistent_toast_timeline() {
    let (scheduler, actions, notifier, view) = notifier();
    actions.show_message("daemon gone", "error", 0).unwrap();

    scheduler.advance(999);
    assert!(!notifier.is_visible());
    scheduler.advance(1);
    assert!(notifier.is_visible());

    // dwell: hidden 8000 ms after settling
    scheduler.advance(7999);
    assert!(notifier.is_visible());
    scheduler.advance(1);
    assert!(!notifier.is_visible());
    assert_eq!(notifier.phase(), ToastPhase::ReloadPending);

    // reload: 9000 ms after settling
    scheduler.advance(999);
    assert_eq!(view.reloads.get(), 0);
    scheduler.advance(1);
    assert_eq!(view.reloads.get(), 1);
}

#[test]
fn failed_startup_disables_tabs_and_reloads() {
    let h = Harness::new();

    let err = h.dashboard.launch("port=1443").unwrap_err();
    assert!(matches!(err, DashError::UnrecoverableStartup(_)));
    assert!(!h.layout.tabs_enabled.get());
    assert!(!h.dashboard.is_launched());
    assert!(!h.dashboard.poller().is_running());

    h.scheduler.advance(1000);
    assert!(h.dashboard.toast().is_visible());
    let shown = h.toast.visible_messages();
    assert_eq!(shown.len(), 1);
    assert!(shown[0].contains("mode"));

    h.scheduler.advance(8000);
    assert!(!h.dashboard.toast().is_visible());
    h.scheduler.advance(1000);
    assert_eq!(h.toast.reloads.get(), 1);

    // Loader never went away and no table was built.
    assert_eq!(*h.layout.loader.borrow(), vec![true]);
    assert!(h.tables.created.borrow().is_empty());
}

#[test]
fn reload_builds_a_fresh_dashboard() {
    let first = Harness::new();
    first.dashboard.launch("mode=server&port=1443").unwrap();
    first.dashboard.actions().set_selected_host("10.0.0.3");
    first.dashboard.teardown();
    assert_eq!(first.scheduler.pending(), 0);
    assert_eq!(first.dashboard.store().observer_count(), 0);

    let second = Harness::new();
    let snap = second.dashboard.actions().state();
    assert_eq!(snap.port, 444);
    assert!(snap.selected_host.is_none());
    assert!(snap.show_loader);
}
