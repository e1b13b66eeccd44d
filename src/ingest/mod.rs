pub mod flush;
pub mod tick_buffer;

pub use flush::{FlushOutcome, FlushScheduler, FlushStats, DEFAULT_FLUSH_INTERVAL};
pub use tick_buffer::{TickBuffer, TickSink};
