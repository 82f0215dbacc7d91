//! Polled statistics tables.
//!
//! The table widget itself is a presentation concern; this module owns the
//! polling, the single-flight guard and the one-live-instance rule.

pub mod source;

use crate::api::StatsRow;

pub use source::{PolledTableSource, RefreshHandle};

/// A rendered table instance.
pub trait TableWidget {
    /// Replace every row.
    fn render(&self, rows: &[StatsRow]);
    /// Highlight the row with `id`, or clear the highlight.
    fn mark_selected(&self, id: Option<i64>);
    /// Remove the table from the screen. No other call follows.
    fn destroy(&self);
}

/// Creates table instances bound to a display target.
pub trait TableWidgetFactory {
    /// `refresh` is the widget's on-demand fetch trigger.
    fn create(&self, table_id: &str, refresh: RefreshHandle) -> std::rc::Rc<dyn TableWidget>;
}
