use std::sync::Mutex;

use crate::error::AppError;
use crate::model::tick::Tick;

/// Push interface the feed delivers trades through.
pub trait TickSink: Send + Sync {
    fn on_tick(&self, tick: Tick);
}

/// Ticks awaiting persistence, shared between the feed and the flush task.
///
/// `append` and `drain` take the same lock, and `drain` swaps the whole vector
/// out in one step, so every tick lands in exactly one drained batch.
#[derive(Debug, Default)]
pub struct TickBuffer {
    ticks: Mutex<Vec<Tick>>,
}

impl TickBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            ticks: Mutex::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn append(&self, tick: Tick) -> Result<(), AppError> {
        let mut guard = self
            .ticks
            .lock()
            .map_err(|_| AppError::Persistence("tick buffer lock poisoned".to_string()))?;
        guard.push(tick);
        Ok(())
    }

    /// Take everything buffered so far, in append order, leaving the buffer empty.
    pub fn drain(&self) -> Result<Vec<Tick>, AppError> {
        let mut guard = self
            .ticks
            .lock()
            .map_err(|_| AppError::Persistence("tick buffer lock poisoned".to_string()))?;
        let capacity = guard.capacity();
        Ok(std::mem::replace(&mut *guard, Vec::with_capacity(capacity)))
    }

    pub fn len(&self) -> usize {
        self.ticks.lock().map(|g| g.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TickSink for TickBuffer {
    fn on_tick(&self, tick: Tick) {
        if !tick.is_well_formed() {
            tracing::debug!(symbol = %tick.symbol, price = tick.price, qty = tick.qty, "Dropping ill-formed tick");
            return;
        }
        if let Err(e) = self.append(tick) {
            tracing::warn!(error = %e, "Failed to buffer tick");
        }
    }
}
