/// Telemetry poller: periodic statistics fetch feeding the throughput chart.
///
/// On every tick (while the graph view is visible) one request goes to the
/// statistics endpoint derived from the current snapshot. Ticks never wait
/// for earlier requests, so completions can arrive out of order; a late
/// point is appended as-is.
///
/// Failures are reported as a single error toast per outage: the first
/// failure raises the toast and sets the failure flag, later failures only
/// log, and the next success clears the flag. A failed tick still appends a
/// zero sample so the time axis keeps moving.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::api::{self, FetchResult, Fetcher};
use crate::config::DashConfig;
use crate::logging::EventLog;
use crate::runtime::{Scheduler, TimerHandle, Visibility};
use crate::state::{Actions, Snapshot, Subscription};

use super::{ChartSink, SlidingWindow, TelemetrySample, VisibleRange};

const COMPONENT: &str = "telemetry";

struct PollerState {
    source: String,
    window: SlidingWindow<TelemetrySample>,
    failed: bool,
    timer: Option<TimerHandle>,
    chart: Option<Rc<dyn ChartSink>>,
    /// Bumped on stop; completions carrying an older value are ignored.
    generation: u64,
    subscription: Option<Subscription>,
}

struct PollerInner {
    scheduler: Scheduler,
    fetcher: Rc<dyn Fetcher>,
    actions: Actions,
    visibility: Visibility,
    log: EventLog,
    api_host: String,
    period_ms: u64,
    error_timeout_ms: u64,
    state: RefCell<PollerState>,
}

/// Handle to the poller of one dashboard.
pub struct TelemetryPoller {
    inner: Rc<PollerInner>,
}

impl TelemetryPoller {
    /// Build a poller and subscribe it to the store for URL derivation.
    /// Polling starts with [`start`](Self::start).
    pub fn new(
        config: &DashConfig,
        scheduler: Scheduler,
        fetcher: Rc<dyn Fetcher>,
        actions: Actions,
        visibility: Visibility,
        log: EventLog,
    ) -> Self {
        let source = derive_source(&config.api.host, &actions.state());
        let inner = Rc::new(PollerInner {
            scheduler,
            fetcher,
            actions: actions.clone(),
            visibility,
            log,
            api_host: config.api.host.clone(),
            period_ms: config.telemetry.poll_interval_ms,
            error_timeout_ms: config.telemetry.error_toast_timeout_ms,
            state: RefCell::new(PollerState {
                source,
                window: SlidingWindow::new(config.telemetry.window),
                failed: false,
                timer: None,
                chart: None,
                generation: 0,
                subscription: None,
            }),
        });

        let weak = Rc::downgrade(&inner);
        let subscription = actions.store().subscribe(move |new, _old| {
            if let Some(inner) = weak.upgrade() {
                inner.update_source(new);
            }
        });
        inner.state.borrow_mut().subscription = Some(subscription);

        Self { inner }
    }

    /// Attach the chart; it receives the whole buffer once, then deltas.
    pub fn attach(&self, chart: Rc<dyn ChartSink>) {
        let samples = {
            let mut st = self.inner.state.borrow_mut();
            st.chart = Some(chart.clone());
            st.window.to_vec()
        };
        chart.attach(&samples);
    }

    /// Install the poll timer, replacing any previous one.
    pub fn start(&self) {
        let weak: Weak<PollerInner> = Rc::downgrade(&self.inner);
        let mut st = self.inner.state.borrow_mut();
        if let Some(old) = st.timer.take() {
            self.inner.scheduler.cancel(old);
        }
        let timer = self.inner.scheduler.set_interval(self.inner.period_ms, move || {
            if let Some(inner) = weak.upgrade() {
                inner.tick();
            }
        });
        st.timer = Some(timer);
    }

    /// Cancel the timer and disregard requests still in flight.
    pub fn stop(&self) {
        let mut st = self.inner.state.borrow_mut();
        if let Some(timer) = st.timer.take() {
            self.inner.scheduler.cancel(timer);
        }
        st.generation += 1;
    }

    /// Stop polling and leave the store.
    pub fn teardown(&self) {
        self.stop();
        let subscription = self.inner.state.borrow_mut().subscription.take();
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
    }

    /// Run one tick immediately.
    pub fn poll_now(&self) {
        self.inner.tick();
    }

    pub fn is_running(&self) -> bool {
        self.inner.state.borrow().timer.is_some()
    }

    pub fn source(&self) -> String {
        self.inner.state.borrow().source.clone()
    }

    pub fn is_failing(&self) -> bool {
        self.inner.state.borrow().failed
    }

    pub fn samples(&self) -> Vec<TelemetrySample> {
        self.inner.state.borrow().window.to_vec()
    }

    pub fn total_samples(&self) -> u64 {
        self.inner.state.borrow().window.total_pushed()
    }
}

impl PollerInner {
    fn update_source(&self, snapshot: &Snapshot) {
        let source = derive_source(&self.api_host, snapshot);
        let mut st = self.state.borrow_mut();
        if st.source != source {
            self.log.debug(COMPONENT, format!("source -> {source}"));
            st.source = source;
        }
    }

    fn tick(self: &Rc<Self>) {
        if !self.visibility.is_visible() {
            return;
        }

        let (url, generation) = {
            let st = self.state.borrow();
            (st.source.clone(), st.generation)
        };

        let weak = Rc::downgrade(self);
        self.fetcher.fetch_json(
            &url,
            Box::new(move |result| {
                if let Some(inner) = weak.upgrade() {
                    inner.complete(generation, result);
                }
            }),
        );
    }

    fn complete(&self, generation: u64, result: FetchResult) {
        if self.state.borrow().generation != generation {
            self.log.debug(COMPONENT, "discarding completion from a stopped run");
            return;
        }

        let now = self.scheduler.wall_time();
        let sample = match result.and_then(|value| api::decode_rows(&value)) {
            Ok(rows) => {
                self.state.borrow_mut().failed = false;
                TelemetrySample::from_rows(&rows, now)
            }
            Err(err) => {
                let first = {
                    let mut st = self.state.borrow_mut();
                    !std::mem::replace(&mut st.failed, true)
                };
                if first {
                    self.log.warn(COMPONENT, format!("statistics poll failed: {err}"));
                    self.actions.report_error(err.to_string(), self.error_timeout_ms);
                } else {
                    self.log.debug(COMPONENT, format!("statistics poll still failing: {err}"));
                }
                TelemetrySample::zero(now)
            }
        };

        self.record(sample);
    }

    fn record(&self, sample: TelemetrySample) {
        let (chart, range) = {
            let mut st = self.state.borrow_mut();
            st.window.push(sample);
            let range = VisibleRange::trailing(st.window.total_pushed(), st.window.capacity());
            (st.chart.clone(), range)
        };
        if let Some(chart) = chart {
            chart.append(&[sample]);
            chart.set_visible_range(range);
        }
    }
}

/// Statistics URL for the current snapshot; the selected host is appended
/// in server mode only.
pub fn derive_source(api_host: &str, snapshot: &Snapshot) -> String {
    api::statistics_data_url(
        api_host,
        snapshot.mode,
        snapshot.port,
        snapshot.effective_host(),
    )
}
