/// Toast notification state machine.
///
/// ```text
/// Hidden ──new message──▶ Showing ──settle──▶ (visible)
///                            │
///          timeout > 0       │        timeout == 0
///     ┌──────────────────────┴─────────────────────┐
///     ▼ after timeout                              ▼ after dwell
/// AutoHiding ──grace──▶ Hidden              ReloadPending ──▶ reload()
/// ```
///
/// Only one toast is displayed at a time: a message arriving while the
/// machine is not `Hidden` is dropped and logged. Every transition replaces
/// the single owned timer (the previous one is cancelled first).
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::config::schema::ToastConfig;
use crate::logging::EventLog;
use crate::runtime::{Scheduler, TimerHandle};
use crate::state::{Actions, Snapshot, Subscription, ToastKind};

const COMPONENT: &str = "toast";

/// Lifecycle phase of the notifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastPhase {
    Hidden,
    Showing,
    AutoHiding,
    ReloadPending,
}

/// What the presentation layer should currently draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToastDisplay {
    pub message: String,
    pub kind: ToastKind,
    pub visible: bool,
}

/// Presentation side of the toast.
pub trait ToastView {
    fn render(&self, toast: &ToastDisplay);
    /// Throw the whole dashboard away and start over.
    fn reload(&self);
}

struct ToastState {
    phase: ToastPhase,
    display: ToastDisplay,
    persistent: bool,
    timeout_ms: u64,
    timer: Option<TimerHandle>,
    dropped: u64,
    subscription: Option<Subscription>,
}

struct ToastInner {
    scheduler: Scheduler,
    actions: Actions,
    view: Rc<dyn ToastView>,
    log: EventLog,
    timings: ToastConfig,
    state: RefCell<ToastState>,
}

/// Handle to the toast notifier of one dashboard.
pub struct ToastNotifier {
    inner: Rc<ToastInner>,
}

impl ToastNotifier {
    /// Build the notifier and subscribe it to the store.
    pub fn new(
        timings: ToastConfig,
        scheduler: Scheduler,
        actions: Actions,
        view: Rc<dyn ToastView>,
        log: EventLog,
    ) -> Self {
        let inner = Rc::new(ToastInner {
            scheduler,
            actions: actions.clone(),
            view,
            log,
            timings,
            state: RefCell::new(ToastState {
                phase: ToastPhase::Hidden,
                display: ToastDisplay {
                    message: String::new(),
                    kind: ToastKind::Info,
                    visible: false,
                },
                persistent: false,
                timeout_ms: 0,
                timer: None,
                dropped: 0,
                subscription: None,
            }),
        });

        let weak = Rc::downgrade(&inner);
        let subscription = actions.store().subscribe(move |new, old| {
            if new.has_new_toast(old)
                && let Some(inner) = weak.upgrade()
            {
                inner.incoming(new);
            }
        });
        inner.state.borrow_mut().subscription = Some(subscription);

        Self { inner }
    }

    pub fn phase(&self) -> ToastPhase {
        self.inner.state.borrow().phase
    }

    pub fn is_visible(&self) -> bool {
        self.inner.state.borrow().display.visible
    }

    /// Current display, `None` while nothing is on screen or pending.
    pub fn current(&self) -> Option<ToastDisplay> {
        let st = self.inner.state.borrow();
        (st.phase != ToastPhase::Hidden && !st.display.message.is_empty())
            .then(|| st.display.clone())
    }

    /// Messages dropped because another toast was already up.
    pub fn dropped_count(&self) -> u64 {
        self.inner.state.borrow().dropped
    }

    /// Cancel the pending transition and leave the store.
    pub fn teardown(&self) {
        let subscription = {
            let mut st = self.inner.state.borrow_mut();
            if let Some(timer) = st.timer.take() {
                self.inner.scheduler.cancel(timer);
            }
            st.subscription.take()
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }
}

impl ToastInner {
    fn incoming(self: &Rc<Self>, snapshot: &Snapshot) {
        let message = snapshot.toast_message.clone().unwrap_or_default();
        let mut st = self.state.borrow_mut();

        if st.phase != ToastPhase::Hidden {
            st.dropped += 1;
            self.log.warn(
                COMPONENT,
                format!("notification ignored because another one is already shown: {message}"),
            );
            return;
        }

        self.log.info(
            COMPONENT,
            format!("show {} toast: {message}", snapshot.toast_type),
        );
        st.phase = ToastPhase::Showing;
        st.display = ToastDisplay {
            message,
            kind: snapshot.toast_type,
            visible: false,
        };
        st.timeout_ms = snapshot.toast_timeout_ms;
        st.persistent = snapshot.toast_timeout_ms == 0;
        self.arm(&mut st, self.timings.settle_ms, Self::settled);
    }

    /// Settle delay elapsed: make the toast visible and schedule its end.
    fn settled(self: &Rc<Self>) {
        let display = {
            let mut st = self.state.borrow_mut();
            st.display.visible = true;
            if st.persistent {
                self.arm(&mut st, self.timings.dwell_ms, Self::dwell_elapsed);
            } else {
                let timeout = st.timeout_ms;
                self.arm(&mut st, timeout, Self::auto_hide);
            }
            st.display.clone()
        };
        self.view.render(&display);
    }

    fn auto_hide(self: &Rc<Self>) {
        let display = {
            let mut st = self.state.borrow_mut();
            st.phase = ToastPhase::AutoHiding;
            st.display.visible = false;
            self.arm(&mut st, self.timings.grace_ms, Self::grace_elapsed);
            st.display.clone()
        };
        self.view.render(&display);
    }

    /// Grace period over: wipe the text and accept the next toast.
    fn grace_elapsed(self: &Rc<Self>) {
        let display = {
            let mut st = self.state.borrow_mut();
            st.phase = ToastPhase::Hidden;
            st.timer = None;
            st.display = ToastDisplay {
                message: String::new(),
                kind: ToastKind::Info,
                visible: false,
            };
            st.display.clone()
        };
        self.view.render(&display);
        self.actions.clear_message();
    }

    /// Persistent toast dwelled long enough: hide it and arm the reload.
    fn dwell_elapsed(self: &Rc<Self>) {
        let display = {
            let mut st = self.state.borrow_mut();
            st.phase = ToastPhase::ReloadPending;
            st.display = ToastDisplay {
                message: String::new(),
                kind: st.display.kind,
                visible: false,
            };
            let delay = self
                .timings
                .reload_after_ms
                .saturating_sub(self.timings.dwell_ms);
            self.arm(&mut st, delay, Self::reload);
            st.display.clone()
        };
        self.view.render(&display);
    }

    fn reload(self: &Rc<Self>) {
        self.state.borrow_mut().timer = None;
        self.log.warn(COMPONENT, "persistent error, reloading the dashboard");
        self.view.reload();
    }

    /// Replace the owned timer with one that runs `step` after `delay_ms`.
    fn arm(self: &Rc<Self>, st: &mut ToastState, delay_ms: u64, step: fn(&Rc<ToastInner>)) {
        if let Some(old) = st.timer.take() {
            self.scheduler.cancel(old);
        }
        let weak: Weak<ToastInner> = Rc::downgrade(self);
        st.timer = Some(self.scheduler.set_timeout(delay_ms, move || {
            if let Some(inner) = weak.upgrade() {
                step(&inner);
            }
        }));
    }
}
