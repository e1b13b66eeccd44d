use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::MissedTickBehavior;

use super::tick_buffer::TickBuffer;
use crate::store::TickStore;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOutcome {
    /// Nothing was buffered.
    Idle,
    Written { drained: usize, inserted: usize },
    /// The store rejected the batch; the drained ticks are not re-buffered.
    Failed { dropped: usize },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FlushStats {
    pub cycles: u64,
    pub batches_written: u64,
    pub ticks_written: u64,
    pub failures: u64,
    pub ticks_dropped: u64,
}

/// Periodically drains the tick buffer into the store as one batch per cycle.
pub struct FlushScheduler<S: TickStore + 'static> {
    buffer: Arc<TickBuffer>,
    store: Arc<S>,
    interval: Duration,
    stats: FlushStats,
}

impl<S: TickStore + 'static> FlushScheduler<S> {
    pub fn new(buffer: Arc<TickBuffer>, store: Arc<S>, interval: Duration) -> Self {
        assert!(!interval.is_zero(), "flush interval must be > 0");
        Self {
            buffer,
            store,
            interval,
            stats: FlushStats::default(),
        }
    }

    pub fn stats(&self) -> FlushStats {
        self.stats
    }

    /// Drain once and hand the batch to the store on the blocking pool.
    pub async fn flush_once(&mut self) -> FlushOutcome {
        self.stats.cycles += 1;
        let batch = match self.buffer.drain() {
            Ok(batch) => batch,
            Err(e) => {
                tracing::warn!(error = %e, "Tick buffer drain failed");
                self.stats.failures += 1;
                return FlushOutcome::Failed { dropped: 0 };
            }
        };
        if batch.is_empty() {
            return FlushOutcome::Idle;
        }

        let drained = batch.len();
        let store = Arc::clone(&self.store);
        let result = tokio::task::spawn_blocking(move || store.append_ticks(&batch)).await;

        match result {
            Ok(Ok(inserted)) => {
                self.stats.batches_written += 1;
                self.stats.ticks_written += inserted as u64;
                tracing::debug!(drained, inserted, "Flushed ticks to store");
                FlushOutcome::Written { drained, inserted }
            }
            Ok(Err(e)) => {
                self.record_failure(drained);
                tracing::warn!(error = %e, dropped = drained, "Tick batch insert failed");
                FlushOutcome::Failed { dropped: drained }
            }
            Err(e) => {
                self.record_failure(drained);
                tracing::warn!(error = %e, dropped = drained, "Tick batch insert task aborted");
                FlushOutcome::Failed { dropped: drained }
            }
        }
    }

    fn record_failure(&mut self, dropped: usize) {
        self.stats.failures += 1;
        self.stats.ticks_dropped += dropped as u64;
    }

    /// Flush on every interval until `shutdown` fires, then flush one last time.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> FlushStats {
        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.flush_once().await;
                }
                _ = shutdown.changed() => {
                    break;
                }
            }
        }

        let outcome = self.flush_once().await;
        tracing::info!(?outcome, stats = ?self.stats, "Flush scheduler stopped");
        self.stats
    }
}
