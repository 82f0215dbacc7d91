//! Single-threaded cooperative event loop.
//!
//! Every periodic piece of the dashboard (telemetry poll, table refresh,
//! toast lifecycle, loader delay) and every fetch completion runs as a timer
//! callback on one [`Scheduler`]. Time is virtual: [`Scheduler::advance`]
//! moves the clock forward and fires whatever became due, which is what the
//! tests use; [`Scheduler::run_realtime`] ties the virtual clock to the wall
//! clock for the binary.
//!
//! Callbacks run with no internal borrow held, so they may add or cancel
//! timers (including their own).

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

/// Longest real-time sleep between two checks of the stop condition.
const MAX_IDLE_SLEEP: Duration = Duration::from_millis(50);

/// Opaque handle returned when a timer is installed; pass it to
/// [`Scheduler::cancel`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

enum Entry {
    Once(Box<dyn FnOnce()>),
    Interval {
        period: u64,
        callback: Box<dyn FnMut()>,
    },
}

struct Inner {
    epoch: DateTime<Utc>,
    now_ms: Cell<u64>,
    next_id: Cell<u64>,
    queue: RefCell<BTreeMap<(u64, u64), Entry>>,
    /// Live timers and their due time. An interval stays here while its
    /// callback runs so a cancel from inside the callback is observed.
    live: RefCell<HashMap<u64, u64>>,
}

/// Cloneable handle to the shared timer queue.
#[derive(Clone)]
pub struct Scheduler {
    inner: Rc<Inner>,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("now_ms", &self.now_ms())
            .field("pending", &self.pending())
            .finish()
    }
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    /// A scheduler whose virtual time zero is "now".
    pub fn new() -> Self {
        Self::with_epoch(Utc::now())
    }

    /// A scheduler whose virtual time zero is `epoch`.
    pub fn with_epoch(epoch: DateTime<Utc>) -> Self {
        Self {
            inner: Rc::new(Inner {
                epoch,
                now_ms: Cell::new(0),
                next_id: Cell::new(1),
                queue: RefCell::new(BTreeMap::new()),
                live: RefCell::new(HashMap::new()),
            }),
        }
    }

    /// Milliseconds elapsed since the epoch on the virtual clock.
    pub fn now_ms(&self) -> u64 {
        self.inner.now_ms.get()
    }

    /// Wall-clock time corresponding to the virtual clock.
    pub fn wall_time(&self) -> DateTime<Utc> {
        self.inner.epoch + chrono::Duration::milliseconds(self.now_ms() as i64)
    }

    /// Number of live timers.
    pub fn pending(&self) -> usize {
        self.inner.live.borrow().len()
    }

    /// Whether `handle` still refers to a live timer.
    pub fn is_live(&self, handle: TimerHandle) -> bool {
        self.inner.live.borrow().contains_key(&handle.0)
    }

    /// Run `callback` once, `delay_ms` from now.
    pub fn set_timeout(&self, delay_ms: u64, callback: impl FnOnce() + 'static) -> TimerHandle {
        self.insert(delay_ms, Entry::Once(Box::new(callback)))
    }

    /// Run `callback` every `period_ms` (first run one period from now).
    pub fn set_interval(&self, period_ms: u64, callback: impl FnMut() + 'static) -> TimerHandle {
        let period = period_ms.max(1);
        self.insert(
            period,
            Entry::Interval {
                period,
                callback: Box::new(callback),
            },
        )
    }

    /// Queue `callback` to run on the next turn of the loop.
    pub fn post(&self, callback: impl FnOnce() + 'static) -> TimerHandle {
        self.set_timeout(0, callback)
    }

    /// Cancel a timer. Cancelling a fired or already cancelled timer is a no-op.
    pub fn cancel(&self, handle: TimerHandle) {
        if let Some(due) = self.inner.live.borrow_mut().remove(&handle.0) {
            self.inner.queue.borrow_mut().remove(&(due, handle.0));
        }
    }

    /// Move the clock forward by `ms`, firing every timer that becomes due
    /// in due-time order. Timers added by callbacks fire in the same call if
    /// they fall inside the window.
    pub fn advance(&self, ms: u64) {
        let target = self.now_ms().saturating_add(ms);
        self.advance_to(target);
    }

    /// Fire every timer already due without moving the clock.
    pub fn run_pending(&self) {
        self.advance(0);
    }

    /// Due time of the earliest pending timer.
    pub fn next_due(&self) -> Option<u64> {
        self.inner.queue.borrow().keys().next().map(|(due, _)| *due)
    }

    /// Drive the loop against the wall clock until `should_stop` returns true.
    pub fn run_realtime(&self, mut should_stop: impl FnMut() -> bool) {
        let start = Instant::now();
        let offset = self.now_ms();
        loop {
            let elapsed = start.elapsed().as_millis() as u64;
            self.advance_to(offset + elapsed);
            if should_stop() {
                break;
            }

            let now = self.now_ms();
            let sleep = match self.next_due() {
                Some(due) if due > now => Duration::from_millis(due - now).min(MAX_IDLE_SLEEP),
                Some(_) => Duration::ZERO,
                None => MAX_IDLE_SLEEP,
            };
            if !sleep.is_zero() {
                std::thread::sleep(sleep);
            }
        }
    }

    // -- Internal --

    fn insert(&self, delay_ms: u64, entry: Entry) -> TimerHandle {
        let id = self.inner.next_id.get();
        self.inner.next_id.set(id + 1);
        let due = self.now_ms().saturating_add(delay_ms);
        self.inner.live.borrow_mut().insert(id, due);
        self.inner.queue.borrow_mut().insert((due, id), entry);
        TimerHandle(id)
    }

    fn advance_to(&self, target: u64) {
        loop {
            let next = {
                let mut queue = self.inner.queue.borrow_mut();
                let ready = queue
                    .first_key_value()
                    .is_some_and(|(&(due, _), _)| due <= target);
                if ready { queue.pop_first() } else { None }
            };
            let Some(((due, id), entry)) = next else {
                break;
            };

            if due > self.now_ms() {
                self.inner.now_ms.set(due);
            }

            match entry {
                Entry::Once(callback) => {
                    self.inner.live.borrow_mut().remove(&id);
                    callback();
                }
                Entry::Interval {
                    period,
                    mut callback,
                } => {
                    callback();
                    // Only reschedule if nobody cancelled it meanwhile.
                    let next_due = due + period;
                    let still_live = match self.inner.live.borrow_mut().get_mut(&id) {
                        Some(slot) => {
                            *slot = next_due;
                            true
                        }
                        None => false,
                    };
                    if still_live {
                        self.inner
                            .queue
                            .borrow_mut()
                            .insert((next_due, id), Entry::Interval { period, callback });
                    }
                }
            }
        }

        if target > self.now_ms() {
            self.inner.now_ms.set(target);
        }
    }
}

// ---------------------------------------------------------------------------
// Visibility signal
// ---------------------------------------------------------------------------

/// Whether a view is currently on screen. Owned by the presentation layer,
/// read by the pollers before each tick.
#[derive(Debug, Clone)]
pub struct Visibility(Rc<Cell<bool>>);

impl Visibility {
    pub fn new(visible: bool) -> Self {
        Self(Rc::new(Cell::new(visible)))
    }

    pub fn set(&self, visible: bool) {
        self.0.set(visible);
    }

    pub fn is_visible(&self) -> bool {
        self.0.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> Box<dyn FnOnce()>) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = log.clone();
        let make = move |name: &str| -> Box<dyn FnOnce()> {
            let sink = sink.clone();
            let name = name.to_string();
            Box::new(move || sink.borrow_mut().push(name))
        };
        (log, make)
    }

    #[test]
    fn timeouts_fire_in_due_order() {
        let scheduler = Scheduler::new();
        let (log, make) = recorder();
        scheduler.set_timeout(300, make("c"));
        scheduler.set_timeout(100, make("a"));
        scheduler.set_timeout(200, make("b"));

        scheduler.advance(150);
        assert_eq!(*log.borrow(), vec!["a"]);
        scheduler.advance(1000);
        assert_eq!(*log.borrow(), vec!["a", "b", "c"]);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn equal_due_times_keep_insertion_order() {
        let scheduler = Scheduler::new();
        let (log, make) = recorder();
        scheduler.post(make("first"));
        scheduler.post(make("second"));
        scheduler.run_pending();
        assert_eq!(*log.borrow(), vec!["first", "second"]);
    }

    #[test]
    fn cancelled_timeout_never_fires() {
        let scheduler = Scheduler::new();
        let (log, make) = recorder();
        let handle = scheduler.set_timeout(100, make("x"));
        scheduler.cancel(handle);
        scheduler.cancel(handle);
        scheduler.advance(500);
        assert!(log.borrow().is_empty());
        assert!(!scheduler.is_live(handle));
    }

    #[test]
    fn interval_repeats_until_cancelled() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        let c = count.clone();
        let handle = scheduler.set_interval(1000, move || c.set(c.get() + 1));

        scheduler.advance(3500);
        assert_eq!(count.get(), 3);
        scheduler.cancel(handle);
        scheduler.advance(5000);
        assert_eq!(count.get(), 3);
    }

    #[test]
    fn interval_can_cancel_itself() {
        let scheduler = Scheduler::new();
        let count = Rc::new(Cell::new(0));
        let own: Rc<Cell<Option<TimerHandle>>> = Rc::new(Cell::new(None));

        let c = count.clone();
        let o = own.clone();
        let s = scheduler.clone();
        let handle = scheduler.set_interval(100, move || {
            c.set(c.get() + 1);
            if c.get() == 2
                && let Some(h) = o.get()
            {
                s.cancel(h);
            }
        });
        own.set(Some(handle));

        scheduler.advance(1000);
        assert_eq!(count.get(), 2);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn callbacks_may_schedule_more_work() {
        let scheduler = Scheduler::new();
        let (log, make) = recorder();
        let s = scheduler.clone();
        let later = make("nested");
        scheduler.set_timeout(100, move || {
            s.set_timeout(50, later);
        });
        scheduler.advance(200);
        assert_eq!(*log.borrow(), vec!["nested"]);
    }

    #[test]
    fn clock_lands_on_target_and_tracks_due_times() {
        let epoch = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let scheduler = Scheduler::with_epoch(epoch);
        let seen = Rc::new(Cell::new(0));
        let s = scheduler.clone();
        let seen_in = seen.clone();
        scheduler.set_timeout(700, move || seen_in.set(s.now_ms()));

        scheduler.advance(1000);
        assert_eq!(seen.get(), 700);
        assert_eq!(scheduler.now_ms(), 1000);
        assert_eq!(scheduler.wall_time(), epoch + chrono::Duration::seconds(1));
    }

    #[test]
    fn run_realtime_stops_on_condition() {
        let scheduler = Scheduler::new();
        let fired = Rc::new(Cell::new(false));
        let f = fired.clone();
        scheduler.set_timeout(10, move || f.set(true));
        let probe = fired.clone();
        scheduler.run_realtime(move || probe.get());
        assert!(fired.get());
    }

    #[test]
    fn visibility_is_shared() {
        let vis = Visibility::new(false);
        let view_side = vis.clone();
        view_side.set(true);
        assert!(vis.is_visible());
    }
}
