use std::collections::HashSet;
use std::sync::Mutex;

use super::TickStore;
use crate::error::AppError;
use crate::model::tick::Tick;

#[derive(Debug, Default)]
struct MemoryState {
    rows: Vec<Tick>,
    seen: HashSet<(String, u64)>,
}

/// In-process tick store with the same dedupe and ordering contract as the
/// SQLite store.
#[derive(Debug, Default)]
pub struct MemoryTickStore {
    state: Mutex<MemoryState>,
}

impl MemoryTickStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TickStore for MemoryTickStore {
    fn append_ticks(&self, batch: &[Tick]) -> Result<usize, AppError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::Persistence("memory store lock poisoned".to_string()))?;
        let mut inserted = 0;
        for tick in batch {
            if state.seen.insert((tick.symbol.clone(), tick.trade_id)) {
                state.rows.push(tick.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    fn query_ticks_since(&self, symbols: &[String], since_ms: u64) -> Result<Vec<Tick>, AppError> {
        let state = self
            .state
            .lock()
            .map_err(|_| AppError::Persistence("memory store lock poisoned".to_string()))?;
        let mut out: Vec<Tick> = state
            .rows
            .iter()
            .filter(|t| t.timestamp_ms >= since_ms && symbols.iter().any(|s| s == &t.symbol))
            .cloned()
            .collect();
        // Stable: equal timestamps keep insertion order.
        out.sort_by_key(|t| t.timestamp_ms);
        Ok(out)
    }
}
