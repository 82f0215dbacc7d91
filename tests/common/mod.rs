//! Shared fakes for the integration tests: a scripted fetcher answering on
//! the virtual clock and recording presenters.
#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use qpep_dash::api::{FetchCallback, FetchResult, Fetcher, StatsRow};
use qpep_dash::dashboard::{Collaborators, Dashboard, LayoutView, View};
use qpep_dash::config::DashConfig;
use qpep_dash::error::FetchError;
use qpep_dash::logging::{EventLog, Level};
use qpep_dash::notify::{ToastDisplay, ToastView};
use qpep_dash::runtime::Scheduler;
use qpep_dash::table::{RefreshHandle, TableWidget, TableWidgetFactory};
use qpep_dash::telemetry::{ChartSink, TelemetrySample, VisibleRange};
use serde_json::{Value, json};

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Answers each URL with a scripted result after `latency_ms` of virtual
/// time. One-shot replies queued with [`ScriptedFetcher::queue_reply`] are
/// used first, each with its own latency. Unknown URLs answer `404`.
pub struct ScriptedFetcher {
    scheduler: Scheduler,
    latency_ms: Cell<u64>,
    routes: RefCell<HashMap<String, FetchResult>>,
    queued: RefCell<HashMap<String, VecDeque<(u64, FetchResult)>>>,
    requests: RefCell<Vec<String>>,
}

impl ScriptedFetcher {
    pub fn new(scheduler: &Scheduler) -> Rc<Self> {
        Rc::new(Self {
            scheduler: scheduler.clone(),
            latency_ms: Cell::new(0),
            routes: RefCell::new(HashMap::new()),
            queued: RefCell::new(HashMap::new()),
            requests: RefCell::new(Vec::new()),
        })
    }

    pub fn set_latency(&self, ms: u64) {
        self.latency_ms.set(ms);
    }

    pub fn respond(&self, url: &str, result: FetchResult) {
        self.routes.borrow_mut().insert(url.to_string(), result);
    }

    pub fn respond_json(&self, url: &str, body: Value) {
        self.respond(url, Ok(body));
    }

    /// Answer the next request for `url` with `body` after `latency_ms`.
    pub fn queue_reply(&self, url: &str, latency_ms: u64, body: Value) {
        self.queued
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back((latency_ms, Ok(body)));
    }

    pub fn fail(&self, url: &str, status: u16) {
        self.respond(url, Err(FetchError::Status(status)));
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.borrow().clone()
    }

    pub fn count(&self, url: &str) -> usize {
        self.requests.borrow().iter().filter(|u| *u == url).count()
    }
}

impl Fetcher for ScriptedFetcher {
    fn fetch_json(&self, url: &str, on_done: FetchCallback) {
        self.requests.borrow_mut().push(url.to_string());
        let queued = self
            .queued
            .borrow_mut()
            .get_mut(url)
            .and_then(|replies| replies.pop_front());
        let (latency, result) = queued.unwrap_or_else(|| {
            let result = self
                .routes
                .borrow()
                .get(url)
                .cloned()
                .unwrap_or(Err(FetchError::Status(404)));
            (self.latency_ms.get(), result)
        });
        self.scheduler.set_timeout(latency, move || on_done(result));
    }
}

/// `{ data: [...] }` payload with the two speed attributes.
pub fn speed_payload(upload: &str, download: &str) -> Value {
    json!({
        "data": [
            { "id": 1, "attribute": "Current Upload Speed", "value": upload },
            { "id": 2, "attribute": "Current Download Speed", "value": download },
            { "id": 3, "attribute": "Total Connections", "value": 4 }
        ]
    })
}

pub fn hosts_payload(hosts: &[&str]) -> Value {
    let rows: Vec<Value> = hosts
        .iter()
        .enumerate()
        .map(|(i, host)| json!({ "id": i as i64 + 1, "attribute": "Address", "value": host }))
        .collect();
    Value::Array(rows)
}

// ---------------------------------------------------------------------------
// Presenters
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingChart {
    pub attached: RefCell<Vec<usize>>,
    pub points: RefCell<Vec<TelemetrySample>>,
    pub ranges: RefCell<Vec<VisibleRange>>,
}

impl ChartSink for RecordingChart {
    fn attach(&self, samples: &[TelemetrySample]) {
        self.attached.borrow_mut().push(samples.len());
    }

    fn append(&self, samples: &[TelemetrySample]) {
        self.points.borrow_mut().extend_from_slice(samples);
    }

    fn set_visible_range(&self, range: VisibleRange) {
        self.ranges.borrow_mut().push(range);
    }
}

#[derive(Default)]
pub struct RecordingToastView {
    pub frames: RefCell<Vec<ToastDisplay>>,
    pub reloads: Cell<u32>,
}

impl RecordingToastView {
    pub fn visible_messages(&self) -> Vec<String> {
        self.frames
            .borrow()
            .iter()
            .filter(|f| f.visible)
            .map(|f| f.message.clone())
            .collect()
    }
}

impl ToastView for RecordingToastView {
    fn render(&self, toast: &ToastDisplay) {
        self.frames.borrow_mut().push(toast.clone());
    }

    fn reload(&self) {
        self.reloads.set(self.reloads.get() + 1);
    }
}

#[derive(Default)]
pub struct RecordingTable {
    pub renders: RefCell<Vec<Vec<StatsRow>>>,
    pub selected: Cell<Option<i64>>,
    pub destroyed: Cell<bool>,
}

impl TableWidget for RecordingTable {
    fn render(&self, rows: &[StatsRow]) {
        self.renders.borrow_mut().push(rows.to_vec());
    }

    fn mark_selected(&self, id: Option<i64>) {
        self.selected.set(id);
    }

    fn destroy(&self) {
        self.destroyed.set(true);
    }
}

/// Keeps every table it creates, with its refresh handle.
#[derive(Default)]
pub struct RecordingTables {
    pub created: RefCell<Vec<(String, Rc<RecordingTable>, RefreshHandle)>>,
}

impl RecordingTables {
    pub fn instances(&self, table_id: &str) -> Vec<Rc<RecordingTable>> {
        self.created
            .borrow()
            .iter()
            .filter(|(id, _, _)| id == table_id)
            .map(|(_, table, _)| table.clone())
            .collect()
    }

    pub fn latest(&self, table_id: &str) -> Option<Rc<RecordingTable>> {
        self.instances(table_id).pop()
    }

    pub fn live_count(&self, table_id: &str) -> usize {
        self.instances(table_id)
            .iter()
            .filter(|t| !t.destroyed.get())
            .count()
    }

    pub fn handle(&self, table_id: &str) -> Option<RefreshHandle> {
        self.created
            .borrow()
            .iter()
            .rev()
            .find(|(id, _, _)| id == table_id)
            .map(|(_, _, handle)| handle.clone())
    }
}

impl TableWidgetFactory for RecordingTables {
    fn create(&self, table_id: &str, refresh: RefreshHandle) -> Rc<dyn TableWidget> {
        let table = Rc::new(RecordingTable::default());
        self.created
            .borrow_mut()
            .push((table_id.to_string(), table.clone(), refresh));
        table
    }
}

pub struct RecordingLayout {
    pub loader: RefCell<Vec<bool>>,
    pub tabs_enabled: Cell<bool>,
    pub tabs: RefCell<Vec<View>>,
}

impl Default for RecordingLayout {
    fn default() -> Self {
        Self {
            loader: RefCell::new(Vec::new()),
            tabs_enabled: Cell::new(true),
            tabs: RefCell::new(Vec::new()),
        }
    }
}

impl LayoutView for RecordingLayout {
    fn set_loader_visible(&self, visible: bool) {
        self.loader.borrow_mut().push(visible);
    }

    fn set_tabs_enabled(&self, enabled: bool) {
        self.tabs_enabled.set(enabled);
    }

    fn select_tab(&self, view: View) {
        self.tabs.borrow_mut().push(view);
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

/// A dashboard wired to fakes, plus handles on every fake.
pub struct Harness {
    pub scheduler: Scheduler,
    pub fetcher: Rc<ScriptedFetcher>,
    pub chart: Rc<RecordingChart>,
    pub toast: Rc<RecordingToastView>,
    pub tables: Rc<RecordingTables>,
    pub layout: Rc<RecordingLayout>,
    pub log: EventLog,
    pub dashboard: Dashboard,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(&DashConfig::default())
    }

    pub fn with_config(config: &DashConfig) -> Self {
        let scheduler = Scheduler::new();
        let fetcher = ScriptedFetcher::new(&scheduler);
        let chart = Rc::new(RecordingChart::default());
        let toast = Rc::new(RecordingToastView::default());
        let tables = Rc::new(RecordingTables::default());
        let layout = Rc::new(RecordingLayout::default());
        let log = EventLog::memory(Level::Debug);

        let dashboard = Dashboard::new(
            config,
            Collaborators {
                scheduler: scheduler.clone(),
                fetcher: fetcher.clone(),
                chart: chart.clone(),
                toast_view: toast.clone(),
                tables: tables.clone(),
                layout: layout.clone(),
                log: log.clone(),
            },
        );

        Self {
            scheduler,
            fetcher,
            chart,
            toast,
            tables,
            layout,
            log,
            dashboard,
        }
    }
}
