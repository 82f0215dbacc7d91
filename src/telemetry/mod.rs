//! Live throughput telemetry: sample decoding, the bounded sample window and
//! the poller that feeds the chart.

pub mod poller;
pub mod sample;
pub mod window;

pub use poller::TelemetryPoller;
pub use sample::TelemetrySample;
pub use window::SlidingWindow;

/// Visible x-axis range of the chart, in point indices. `start` goes
/// negative while fewer than a window's worth of points exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VisibleRange {
    pub start: i64,
    pub end: i64,
}

impl VisibleRange {
    /// Range showing the last `width` of `total` points.
    pub fn trailing(total: u64, width: usize) -> Self {
        let end = total as i64;
        Self {
            start: end - width as i64,
            end,
        }
    }
}

/// Push-style chart renderer.
pub trait ChartSink {
    /// Hand over the full buffer once, when the chart is first attached.
    fn attach(&self, samples: &[TelemetrySample]);
    /// Append newly produced points.
    fn append(&self, samples: &[TelemetrySample]);
    fn set_visible_range(&self, range: VisibleRange);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_range_moves_one_slot_per_point() {
        assert_eq!(VisibleRange::trailing(1, 60), VisibleRange { start: -59, end: 1 });
        assert_eq!(VisibleRange::trailing(61, 60), VisibleRange { start: 1, end: 61 });
    }
}
