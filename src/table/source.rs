/// Polled table source.
///
/// Keeps at most one live table instance and one refresh timer per source
/// component. Switching to a new source while shown tears the old table
/// down completely (timer cancelled, widget destroyed) before the new one
/// is created, so two pollers never race on the same display target.
///
/// Refreshes are single-flight: a refresh requested while a request is
/// still outstanding is skipped. Completions belonging to a previous source
/// are ignored.
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::api::{self, FetchResult, Fetcher, StatsRow};
use crate::logging::EventLog;
use crate::runtime::{Scheduler, TimerHandle};
use crate::state::Actions;

use super::{TableWidget, TableWidgetFactory};

const COMPONENT: &str = "table";

struct TableState {
    /// Source of the live table, if any.
    live_source: Option<String>,
    shown: bool,
    table: Option<Rc<dyn TableWidget>>,
    timer: Option<TimerHandle>,
    failed: bool,
    in_flight: bool,
    generation: u64,
    rows: Vec<StatsRow>,
    selected: Option<i64>,
    instances: u64,
}

struct TableInner {
    table_id: String,
    selectable: bool,
    period_ms: u64,
    error_timeout_ms: u64,
    scheduler: Scheduler,
    fetcher: Rc<dyn Fetcher>,
    actions: Actions,
    factory: Rc<dyn TableWidgetFactory>,
    log: EventLog,
    state: RefCell<TableState>,
}

/// Widget-side trigger for an on-demand refresh.
#[derive(Clone)]
pub struct RefreshHandle {
    inner: Weak<TableInner>,
}

impl RefreshHandle {
    /// Request fresh rows. Returns `false` when the request was skipped.
    pub fn refresh(&self) -> bool {
        self.inner.upgrade().is_some_and(|inner| inner.refresh())
    }

    /// Report a click on row `id`.
    pub fn select(&self, id: i64) -> bool {
        self.inner
            .upgrade()
            .is_some_and(|inner| inner.select_row(id))
    }
}

/// Options of a [`PolledTableSource`].
#[derive(Debug, Clone)]
pub struct TableOptions {
    pub table_id: String,
    /// Clicking a row selects the host it names.
    pub selectable: bool,
    pub period_ms: u64,
    pub error_timeout_ms: u64,
}

pub struct PolledTableSource {
    inner: Rc<TableInner>,
}

impl PolledTableSource {
    pub fn new(
        options: TableOptions,
        scheduler: Scheduler,
        fetcher: Rc<dyn Fetcher>,
        actions: Actions,
        factory: Rc<dyn TableWidgetFactory>,
        log: EventLog,
    ) -> Self {
        Self {
            inner: Rc::new(TableInner {
                table_id: options.table_id,
                selectable: options.selectable,
                period_ms: options.period_ms.max(1),
                error_timeout_ms: options.error_timeout_ms,
                scheduler,
                fetcher,
                actions,
                factory,
                log,
                state: RefCell::new(TableState {
                    live_source: None,
                    shown: false,
                    table: None,
                    timer: None,
                    failed: false,
                    in_flight: false,
                    generation: 0,
                    rows: Vec::new(),
                    selected: None,
                    instances: 0,
                }),
            }),
        }
    }

    /// Point the table at `source` and say whether its view is active.
    ///
    /// - no source: the table is torn down;
    /// - shown with a new source: the table is rebuilt and polled;
    /// - shown with the same source: polling resumes if it was paused;
    /// - not shown: polling pauses, the table stays.
    pub fn configure(&self, source: Option<&str>, shown: bool) {
        self.inner.configure(source, shown);
    }

    /// The widget's fetch callback, callable directly.
    pub fn refresh(&self) -> bool {
        self.inner.refresh()
    }

    pub fn select_row(&self, id: i64) -> bool {
        self.inner.select_row(id)
    }

    /// Cancel the timer and destroy the table.
    pub fn teardown(&self) {
        self.inner.teardown();
    }

    pub fn table_id(&self) -> &str {
        &self.inner.table_id
    }

    pub fn source(&self) -> Option<String> {
        self.inner.state.borrow().live_source.clone()
    }

    pub fn is_shown(&self) -> bool {
        self.inner.state.borrow().shown
    }

    pub fn is_polling(&self) -> bool {
        self.inner.state.borrow().timer.is_some()
    }

    pub fn has_table(&self) -> bool {
        self.inner.state.borrow().table.is_some()
    }

    pub fn is_failing(&self) -> bool {
        self.inner.state.borrow().failed
    }

    pub fn rows(&self) -> Vec<StatsRow> {
        self.inner.state.borrow().rows.clone()
    }

    pub fn selected(&self) -> Option<i64> {
        self.inner.state.borrow().selected
    }

    /// Table instances created so far.
    pub fn instances_created(&self) -> u64 {
        self.inner.state.borrow().instances
    }
}

impl TableInner {
    fn configure(self: &Rc<Self>, source: Option<&str>, shown: bool) {
        let Some(source) = source else {
            self.teardown();
            self.state.borrow_mut().shown = shown;
            return;
        };

        let changed = {
            let mut st = self.state.borrow_mut();
            st.shown = shown;
            if !shown {
                if let Some(timer) = st.timer.take() {
                    self.scheduler.cancel(timer);
                }
                return;
            }
            st.live_source.as_deref() != Some(source)
        };

        if changed {
            self.reinitialize(source);
        } else if self.state.borrow().timer.is_none() {
            self.start_timer();
            self.refresh();
        }
    }

    fn reinitialize(self: &Rc<Self>, source: &str) {
        self.teardown();

        self.log.info(
            COMPONENT,
            format!("{}: initializing against {source}", self.table_id),
        );
        let table = self.factory.create(
            &self.table_id,
            RefreshHandle {
                inner: Rc::downgrade(self),
            },
        );
        {
            let mut st = self.state.borrow_mut();
            st.live_source = Some(source.to_string());
            st.table = Some(table);
            st.instances += 1;
        }

        self.start_timer();
        self.refresh();
    }

    fn start_timer(self: &Rc<Self>) {
        let weak = Rc::downgrade(self);
        let mut st = self.state.borrow_mut();
        if let Some(old) = st.timer.take() {
            self.scheduler.cancel(old);
        }
        st.timer = Some(self.scheduler.set_interval(self.period_ms, move || {
            if let Some(inner) = weak.upgrade() {
                inner.refresh();
            }
        }));
    }

    fn refresh(self: &Rc<Self>) -> bool {
        let (url, generation) = {
            let mut st = self.state.borrow_mut();
            if st.table.is_none() {
                return false;
            }
            let Some(url) = st.live_source.clone() else {
                return false;
            };
            if st.in_flight {
                self.log.debug(
                    COMPONENT,
                    format!("{}: refresh skipped, request in flight", self.table_id),
                );
                return false;
            }
            st.in_flight = true;
            (url, st.generation)
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
        true
    }

    fn complete(&self, generation: u64, result: FetchResult) {
        {
            let mut st = self.state.borrow_mut();
            if st.generation != generation {
                return;
            }
            st.in_flight = false;
        }

        match result.and_then(|value| api::decode_rows(&value)) {
            Ok(rows) => {
                let (table, selected) = {
                    let mut st = self.state.borrow_mut();
                    st.failed = false;
                    if st.selected.is_some_and(|id| !rows.iter().any(|r| r.id == id)) {
                        st.selected = None;
                    }
                    st.rows = rows.clone();
                    (st.table.clone(), st.selected)
                };
                if let Some(table) = table {
                    table.render(&rows);
                    if selected.is_some() {
                        table.mark_selected(selected);
                    }
                }
            }
            Err(err) => {
                let first = {
                    let mut st = self.state.borrow_mut();
                    !std::mem::replace(&mut st.failed, true)
                };
                if first {
                    self.log.warn(
                        COMPONENT,
                        format!("{}: refresh failed: {err}", self.table_id),
                    );
                    self.actions.report_error(err.to_string(), self.error_timeout_ms);
                }
            }
        }
    }

    fn select_row(&self, id: i64) -> bool {
        if !self.selectable {
            return false;
        }
        let (table, value) = {
            let mut st = self.state.borrow_mut();
            let Some(value) = st.rows.iter().find(|r| r.id == id).map(|r| r.value.clone()) else {
                return false;
            };
            st.selected = Some(id);
            (st.table.clone(), value)
        };

        if let Some(table) = table {
            table.mark_selected(Some(id));
        }
        self.log
            .info(COMPONENT, format!("{}: selected host {value}", self.table_id));
        self.actions.set_selected_host(&value);
        true
    }

    fn teardown(&self) {
        let table = {
            let mut st = self.state.borrow_mut();
            if let Some(timer) = st.timer.take() {
                self.scheduler.cancel(timer);
            }
            st.generation += 1;
            st.in_flight = false;
            st.live_source = None;
            st.rows.clear();
            st.selected = None;
            st.table.take()
        };
        if let Some(table) = table {
            table.destroy();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Store;
    use std::cell::Cell;

    struct NeverFetcher {
        calls: Cell<u32>,
    }

    impl Fetcher for NeverFetcher {
        fn fetch_json(&self, _url: &str, _on_done: crate::api::FetchCallback) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    struct NullWidget;

    impl TableWidget for NullWidget {
        fn render(&self, _rows: &[StatsRow]) {}
        fn mark_selected(&self, _id: Option<i64>) {}
        fn destroy(&self) {}
    }

    struct NullFactory;

    impl TableWidgetFactory for NullFactory {
        fn create(&self, _table_id: &str, _refresh: RefreshHandle) -> Rc<dyn TableWidget> {
            Rc::new(NullWidget)
        }
    }

    fn source(fetcher: Rc<NeverFetcher>, scheduler: &Scheduler) -> PolledTableSource {
        PolledTableSource::new(
            TableOptions {
                table_id: "hosts".to_string(),
                selectable: true,
                period_ms: 3000,
                error_timeout_ms: 1000,
            },
            scheduler.clone(),
            fetcher,
            Actions::new(Store::with_defaults(EventLog::disabled())),
            Rc::new(NullFactory),
            EventLog::disabled(),
        )
    }

    #[test]
    fn hung_request_blocks_further_refreshes() {
        let scheduler = Scheduler::new();
        let fetcher = Rc::new(NeverFetcher { calls: Cell::new(0) });
        let table = source(fetcher.clone(), &scheduler);

        table.configure(Some("http://x/hosts"), true);
        assert_eq!(fetcher.calls.get(), 1);

        scheduler.advance(9000);
        assert!(!table.refresh());
        assert_eq!(fetcher.calls.get(), 1);
    }

    #[test]
    fn new_source_resets_single_flight_guard() {
        let scheduler = Scheduler::new();
        let fetcher = Rc::new(NeverFetcher { calls: Cell::new(0) });
        let table = source(fetcher.clone(), &scheduler);

        table.configure(Some("http://x/a"), true);
        table.configure(Some("http://x/b"), true);
        assert_eq!(fetcher.calls.get(), 2);
        assert_eq!(table.instances_created(), 2);
        assert_eq!(scheduler.pending(), 1);
    }

    #[test]
    fn missing_source_tears_down() {
        let scheduler = Scheduler::new();
        let fetcher = Rc::new(NeverFetcher { calls: Cell::new(0) });
        let table = source(fetcher, &scheduler);

        table.configure(Some("http://x/a"), true);
        table.configure(None, true);
        assert!(!table.has_table());
        assert!(!table.is_polling());
        assert_eq!(scheduler.pending(), 0);
    }
}
