//! Dashboard composition root.
//!
//! Builds one store and wires every component to it: the toast notifier, the
//! telemetry poller feeding the chart and the three statistics tables
//! (hosts, info, data). Presentation is injected through [`Collaborators`].
//!
//! A reload is a fresh `Dashboard`: [`Dashboard::teardown`] clears every
//! timer and subscription so the next instance starts from defaults.

use std::cell::RefCell;
use std::rc::Rc;

use crate::api::{self, Fetcher};
use crate::config::DashConfig;
use crate::error::DashError;
use crate::logging::EventLog;
use crate::notify::{ToastNotifier, ToastView};
use crate::runtime::{Scheduler, TimerHandle, Visibility};
use crate::startup::{self, LaunchQuery};
use crate::state::{Actions, Mode, Snapshot, Store, Subscription};
use crate::table::source::TableOptions;
use crate::table::{PolledTableSource, TableWidgetFactory};
use crate::telemetry::{ChartSink, TelemetryPoller};

const COMPONENT: &str = "dashboard";

pub const HOSTS_TABLE: &str = "hosts";
pub const INFO_TABLE: &str = "info";
pub const DATA_TABLE: &str = "data";

/// The two tabs of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Graph,
    Statistics,
}

impl View {
    pub fn parse(val: &str) -> Option<Self> {
        match val.trim().to_ascii_lowercase().as_str() {
            "graph" => Some(Self::Graph),
            "stats" | "statistics" => Some(Self::Statistics),
            _ => None,
        }
    }
}

/// Page chrome owned by the presentation layer.
pub trait LayoutView {
    fn set_loader_visible(&self, visible: bool);
    fn set_tabs_enabled(&self, enabled: bool);
    fn select_tab(&self, view: View);
}

/// Everything the dashboard needs from the outside world.
pub struct Collaborators {
    pub scheduler: Scheduler,
    pub fetcher: Rc<dyn Fetcher>,
    pub chart: Rc<dyn ChartSink>,
    pub toast_view: Rc<dyn ToastView>,
    pub tables: Rc<dyn TableWidgetFactory>,
    pub layout: Rc<dyn LayoutView>,
    pub log: EventLog,
}

/// Sources of the statistics tables for one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSources {
    /// Host list, server mode only.
    pub hosts: Option<String>,
    pub info: String,
    pub data: String,
}

impl TableSources {
    pub fn derive(api_host: &str, snapshot: &Snapshot) -> Self {
        let host = snapshot.effective_host();
        Self {
            hosts: (snapshot.mode == Mode::Server)
                .then(|| api::statistics_hosts_url(api_host, snapshot.port)),
            info: api::statistics_info_url(api_host, snapshot.mode, snapshot.port, host),
            data: api::statistics_data_url(api_host, snapshot.mode, snapshot.port, host),
        }
    }
}

struct DashState {
    view: Option<View>,
    launched: bool,
    loader_timer: Option<TimerHandle>,
    subscription: Option<Subscription>,
}

struct DashInner {
    api_host: String,
    hide_delay_ms: u64,
    scheduler: Scheduler,
    actions: Actions,
    layout: Rc<dyn LayoutView>,
    log: EventLog,
    graph_visible: Visibility,
    poller: TelemetryPoller,
    toast: ToastNotifier,
    hosts: PolledTableSource,
    info: PolledTableSource,
    data: PolledTableSource,
    state: RefCell<DashState>,
}

pub struct Dashboard {
    inner: Rc<DashInner>,
}

impl Dashboard {
    pub fn new(config: &DashConfig, parts: Collaborators) -> Self {
        let Collaborators {
            scheduler,
            fetcher,
            chart,
            toast_view,
            tables,
            layout,
            log,
        } = parts;

        let store = Store::with_defaults(log.clone());
        let actions = Actions::new(store);
        let graph_visible = Visibility::new(false);

        let toast = ToastNotifier::new(
            config.toast.clone(),
            scheduler.clone(),
            actions.clone(),
            toast_view,
            log.clone(),
        );
        let poller = TelemetryPoller::new(
            config,
            scheduler.clone(),
            fetcher.clone(),
            actions.clone(),
            graph_visible.clone(),
            log.clone(),
        );
        poller.attach(chart);

        let table = |table_id: &str, selectable: bool| {
            PolledTableSource::new(
                TableOptions {
                    table_id: table_id.to_string(),
                    selectable,
                    period_ms: config.table.poll_interval_ms,
                    error_timeout_ms: config.table.error_toast_timeout_ms,
                },
                scheduler.clone(),
                fetcher.clone(),
                actions.clone(),
                tables.clone(),
                log.clone(),
            )
        };

        let inner = Rc::new(DashInner {
            api_host: config.api.host.clone(),
            hide_delay_ms: config.loader.hide_delay_ms,
            hosts: table(HOSTS_TABLE, true),
            info: table(INFO_TABLE, false),
            data: table(DATA_TABLE, false),
            scheduler,
            actions: actions.clone(),
            layout,
            log,
            graph_visible,
            poller,
            toast,
            state: RefCell::new(DashState {
                view: None,
                launched: false,
                loader_timer: None,
                subscription: None,
            }),
        });

        let weak = Rc::downgrade(&inner);
        let subscription = actions.store().subscribe(move |new, old| {
            if let Some(inner) = weak.upgrade() {
                inner.state_changed(new, old);
            }
        });
        inner.state.borrow_mut().subscription = Some(subscription);
        inner.layout.set_loader_visible(actions.state().show_loader);

        Self { inner }
    }

    /// Apply the navigation query and start polling.
    ///
    /// On failure the tabs are disabled; the persistent error toast raised by
    /// the startup sequence eventually asks the view for a reload.
    pub fn launch(&self, query: &str) -> Result<LaunchQuery, DashError> {
        let inner = &self.inner;
        match startup::launch(&inner.actions, query, &inner.log) {
            Ok(parsed) => {
                inner.state.borrow_mut().launched = true;
                inner.poller.start();
                inner.reconfigure_tables(&inner.actions.state());
                Ok(parsed)
            }
            Err(err) => {
                inner.layout.set_tabs_enabled(false);
                Err(err)
            }
        }
    }

    /// Switch tabs. Only the active view polls.
    pub fn select_view(&self, view: View) {
        self.inner.select_view(view);
    }

    pub fn view(&self) -> Option<View> {
        self.inner.state.borrow().view
    }

    pub fn is_launched(&self) -> bool {
        self.inner.state.borrow().launched
    }

    pub fn actions(&self) -> &Actions {
        &self.inner.actions
    }

    pub fn store(&self) -> &Store {
        self.inner.actions.store()
    }

    pub fn poller(&self) -> &TelemetryPoller {
        &self.inner.poller
    }

    pub fn toast(&self) -> &ToastNotifier {
        &self.inner.toast
    }

    pub fn hosts_table(&self) -> &PolledTableSource {
        &self.inner.hosts
    }

    pub fn info_table(&self) -> &PolledTableSource {
        &self.inner.info
    }

    pub fn data_table(&self) -> &PolledTableSource {
        &self.inner.data
    }

    /// Synchronously drop every timer and subscription this dashboard owns.
    pub fn teardown(&self) {
        let inner = &self.inner;
        let subscription = {
            let mut st = inner.state.borrow_mut();
            if let Some(timer) = st.loader_timer.take() {
                inner.scheduler.cancel(timer);
            }
            st.launched = false;
            st.subscription.take()
        };
        if let Some(subscription) = subscription {
            subscription.unsubscribe();
        }
        inner.poller.teardown();
        inner.toast.teardown();
        for table in [&inner.hosts, &inner.info, &inner.data] {
            table.teardown();
        }
        inner.log.info(COMPONENT, "torn down");
    }
}

impl DashInner {
    fn state_changed(self: &Rc<Self>, new: &Snapshot, old: &Snapshot) {
        if new.show_loader != old.show_loader {
            self.loader_changed(new.show_loader);
        }
        if self.state.borrow().launched {
            self.reconfigure_tables(new);
        }
    }

    /// Show at once; hide after the delay, opening the statistics tab when
    /// no tab is active yet.
    fn loader_changed(self: &Rc<Self>, show: bool) {
        let mut st = self.state.borrow_mut();
        if let Some(timer) = st.loader_timer.take() {
            self.scheduler.cancel(timer);
        }
        if show {
            drop(st);
            self.layout.set_loader_visible(true);
            return;
        }

        let weak = Rc::downgrade(self);
        st.loader_timer = Some(self.scheduler.set_timeout(self.hide_delay_ms, move || {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            let no_tab = {
                let mut st = inner.state.borrow_mut();
                st.loader_timer = None;
                st.view.is_none()
            };
            if no_tab {
                inner.select_view(View::Statistics);
            }
            inner.layout.set_loader_visible(false);
        }));
    }

    fn select_view(&self, view: View) {
        let launched = {
            let mut st = self.state.borrow_mut();
            st.view = Some(view);
            st.launched
        };
        self.graph_visible.set(view == View::Graph);
        self.layout.select_tab(view);
        self.log.debug(COMPONENT, format!("view -> {view:?}"));
        if launched {
            self.reconfigure_tables(&self.actions.state());
        }
    }

    fn reconfigure_tables(&self, snapshot: &Snapshot) {
        let shown = self.state.borrow().view == Some(View::Statistics);
        let sources = TableSources::derive(&self.api_host, snapshot);
        self.hosts.configure(sources.hosts.as_deref(), shown);
        self.info.configure(Some(&sources.info), shown);
        self.data.configure(Some(&sources.data), shown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_parse_accepts_short_names() {
        assert_eq!(View::parse("graph"), Some(View::Graph));
        assert_eq!(View::parse("Stats"), Some(View::Statistics));
        assert_eq!(View::parse("statistics"), Some(View::Statistics));
        assert_eq!(View::parse("map"), None);
    }

    #[test]
    fn client_mode_has_no_hosts_table() {
        let snap = Snapshot::default();
        let sources = TableSources::derive("127.0.0.1", &snap);
        assert!(sources.hosts.is_none());
        assert_eq!(
            sources.info,
            "http://127.0.0.1:444/api/v1/client/statistics/info"
        );
    }

    #[test]
    fn server_mode_tables_follow_selected_host() {
        let snap = Snapshot {
            mode: Mode::Server,
            port: 1443,
            selected_host: Some("10.0.0.2".to_string()),
            ..Snapshot::default()
        };
        let sources = TableSources::derive("127.0.0.1", &snap);
        assert_eq!(
            sources.hosts.as_deref(),
            Some("http://127.0.0.1:1443/api/v1/server/statistics/hosts")
        );
        assert_eq!(
            sources.data,
            "http://127.0.0.1:1443/api/v1/server/statistics/data/10.0.0.2"
        );
    }
}
