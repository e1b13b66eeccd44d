pub mod memory;
pub mod sqlite;

pub use memory::MemoryTickStore;
pub use sqlite::SqliteTickStore;

use crate::error::AppError;
use crate::model::tick::Tick;

/// Durable append + range query over trade ticks.
///
/// Appends may be re-delivered; implementations must keep query results free
/// of duplicates for the same `(symbol, trade_id)`.
pub trait TickStore: Send + Sync {
    /// Persist a batch, returning the number of newly stored rows.
    fn append_ticks(&self, batch: &[Tick]) -> Result<usize, AppError>;

    /// Ticks for `symbols` with `timestamp_ms >= since_ms`, ascending by
    /// timestamp, equal timestamps in arrival order.
    fn query_ticks_since(&self, symbols: &[String], since_ms: u64) -> Result<Vec<Tick>, AppError>;

    fn query_ticks(&self, symbols: &[String], lookback_ms: u64) -> Result<Vec<Tick>, AppError> {
        let now_ms = chrono::Utc::now().timestamp_millis().max(0) as u64;
        self.query_ticks_since(symbols, now_ms.saturating_sub(lookback_ms))
    }
}
