/// One timestamped observation of a derived series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point<T> {
    pub timestamp_ms: u64,
    pub value: T,
}

impl<T> Point<T> {
    pub fn new(timestamp_ms: u64, value: T) -> Self {
        Self {
            timestamp_ms,
            value,
        }
    }
}

/// Fully defined series (bar closes, spread).
pub type Series = Vec<Point<f64>>;

/// Rolling-statistic series; `None` marks points without enough history
/// or with a degenerate (zero-variance) window.
pub type SparseSeries = Vec<Point<Option<f64>>>;

/// Latest point that carries a defined value.
pub fn latest_defined(series: &[Point<Option<f64>>]) -> Option<Point<f64>> {
    series
        .iter()
        .rev()
        .find_map(|p| p.value.map(|v| Point::new(p.timestamp_ms, v)))
}
