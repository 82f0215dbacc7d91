//! Terminal presenters for `qpep-dash watch`.
//!
//! Each presenter implements one of the dashboard's view traits and prints
//! colored lines to stdout. Formatting lives in free functions so it can be
//! tested without capturing output.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use colored::Colorize;

use crate::api::StatsRow;
use crate::dashboard::{LayoutView, View};
use crate::notify::{ToastDisplay, ToastView};
use crate::state::ToastKind;
use crate::table::{RefreshHandle, TableWidget, TableWidgetFactory};
use crate::telemetry::{ChartSink, TelemetrySample, VisibleRange};

const SPARK_TICKS: [char; 8] = ['▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

// ---------------------------------------------------------------------------
// Chart
// ---------------------------------------------------------------------------

/// Throughput chart: one line per point with a sparkline of the upload rate
/// over the visible range.
pub struct TerminalChart {
    points: RefCell<VecDeque<TelemetrySample>>,
    width: usize,
}

impl TerminalChart {
    pub fn new(width: usize) -> Self {
        Self {
            points: RefCell::new(VecDeque::new()),
            width: width.max(1),
        }
    }
}

impl ChartSink for TerminalChart {
    fn attach(&self, samples: &[TelemetrySample]) {
        let mut points = self.points.borrow_mut();
        points.clear();
        points.extend(samples.iter().copied());
    }

    fn append(&self, samples: &[TelemetrySample]) {
        let mut points = self.points.borrow_mut();
        points.extend(samples.iter().copied());
        while points.len() > self.width {
            points.pop_front();
        }
        let uploads: Vec<u64> = points.iter().map(|p| p.upload).collect();
        if let Some(latest) = samples.last() {
            println!("{}", format_sample_line(latest, &sparkline(&uploads)));
        }
    }

    fn set_visible_range(&self, _range: VisibleRange) {
        // The sparkline already scrolls with the buffer.
    }
}

/// `12:00:01  ▲ 120 Kb/s  ▼ 80 Kb/s  ▁▃█`
pub fn format_sample_line(sample: &TelemetrySample, spark: &str) -> String {
    format!(
        "{}  {} {:>12}  {} {:>12}  {}",
        sample.timestamp.format("%H:%M:%S").to_string().dimmed(),
        "▲".green(),
        format_rate(sample.upload),
        "▼".blue(),
        format_rate(sample.download),
        spark.cyan(),
    )
}

/// Human readable rate, input in Kb/s.
pub fn format_rate(kbps: u64) -> String {
    match kbps {
        0..=999 => format!("{kbps} Kb/s"),
        1_000..=999_999 => format!("{:.1} Mb/s", kbps as f64 / 1_000.0),
        _ => format!("{:.1} Gb/s", kbps as f64 / 1_000_000.0),
    }
}

/// Scale `values` onto eight block characters relative to their maximum.
pub fn sparkline(values: &[u64]) -> String {
    let max = values.iter().copied().max().unwrap_or(0);
    values
        .iter()
        .map(|&v| {
            if max == 0 {
                SPARK_TICKS[0]
            } else {
                let idx = (v as u128 * (SPARK_TICKS.len() as u128 - 1) / max as u128) as usize;
                SPARK_TICKS[idx]
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Toast
// ---------------------------------------------------------------------------

/// Prints toasts and records reload requests for the watch loop.
#[derive(Default)]
pub struct TerminalToast {
    reload: Cell<bool>,
}

impl TerminalToast {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reload_requested(&self) -> bool {
        self.reload.get()
    }
}

impl ToastView for TerminalToast {
    fn render(&self, toast: &ToastDisplay) {
        if toast.visible {
            println!("{}", format_toast(toast));
        }
    }

    fn reload(&self) {
        self.reload.set(true);
    }
}

pub fn format_toast(toast: &ToastDisplay) -> String {
    match toast.kind {
        ToastKind::Error => format!("{} {}", "✗".red().bold(), toast.message.red()),
        ToastKind::Info => format!("{} {}", "ℹ".cyan().bold(), toast.message),
    }
}

// ---------------------------------------------------------------------------
// Tables
// ---------------------------------------------------------------------------

/// Creates one [`TerminalTable`] per table instance.
#[derive(Default)]
pub struct TerminalTables;

impl TerminalTables {
    pub fn new() -> Self {
        Self
    }
}

impl TableWidgetFactory for TerminalTables {
    fn create(&self, table_id: &str, _refresh: RefreshHandle) -> Rc<dyn TableWidget> {
        Rc::new(TerminalTable {
            table_id: table_id.to_string(),
            selected: Cell::new(None),
            last: RefCell::new(Vec::new()),
        })
    }
}

pub struct TerminalTable {
    table_id: String,
    selected: Cell<Option<i64>>,
    last: RefCell<Vec<StatsRow>>,
}

impl TableWidget for TerminalTable {
    fn render(&self, rows: &[StatsRow]) {
        // Unchanged polls stay quiet.
        if *self.last.borrow() == rows {
            return;
        }
        *self.last.borrow_mut() = rows.to_vec();
        println!("{}", format_table(&self.table_id, rows, self.selected.get()));
    }

    fn mark_selected(&self, id: Option<i64>) {
        self.selected.set(id);
    }

    fn destroy(&self) {
        self.last.borrow_mut().clear();
    }
}

/// Two-column attribute/value table; the selected row is marked with `>`.
pub fn format_table(title: &str, rows: &[StatsRow], selected: Option<i64>) -> String {
    let width = rows
        .iter()
        .map(|r| r.attribute.chars().count())
        .max()
        .unwrap_or(0)
        .max("Attribute".len());

    let mut out = String::new();
    out.push_str(&format!("{}\n", title.to_uppercase().bold().cyan()));
    out.push_str(&format!(
        "  {}  {}\n",
        format!("{:<width$}", "Attribute").bold(),
        "Value".bold()
    ));
    for row in rows {
        let marker = if selected == Some(row.id) { ">" } else { " " };
        out.push_str(&format!(
            "{} {:<width$}  {}\n",
            marker.yellow(),
            row.attribute,
            row.value
        ));
    }
    if rows.is_empty() {
        out.push_str(&format!("  {}\n", "(no rows)".dimmed()));
    }
    out
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct TerminalLayout;

impl TerminalLayout {
    pub fn new() -> Self {
        Self
    }
}

impl LayoutView for TerminalLayout {
    fn set_loader_visible(&self, visible: bool) {
        if visible {
            println!("{}", "Loading...".dimmed());
        }
    }

    fn set_tabs_enabled(&self, enabled: bool) {
        if !enabled {
            println!("{}", "Dashboard unavailable: tabs disabled".yellow());
        }
    }

    fn select_tab(&self, view: View) {
        let title = match view {
            View::Graph => "Status graph",
            View::Statistics => "Statistics",
        };
        println!("{}", format!("== {title} ==").bold());
    }
}
