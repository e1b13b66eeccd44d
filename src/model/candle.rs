/// OHLCV aggregate for one symbol over one time bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Bar {
    pub symbol: String,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub bucket_start_ms: u64,
    pub bucket_end_ms: u64,
}

/// Aggregates trade ticks into a single bar over a time bucket.
#[derive(Debug, Clone)]
pub struct BarBuilder {
    symbol: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    bucket_start_ms: u64,
    bucket_end_ms: u64,
}

/// Start of the bucket containing `timestamp_ms`.
pub fn bucket_start(timestamp_ms: u64, interval_ms: u64) -> u64 {
    timestamp_ms - (timestamp_ms % interval_ms)
}

impl BarBuilder {
    /// Start a new bar. The bucket is aligned to the interval.
    pub fn new(symbol: &str, price: f64, qty: f64, timestamp_ms: u64, interval_ms: u64) -> Self {
        assert!(interval_ms > 0, "interval_ms must be > 0");
        let bucket_start_ms = bucket_start(timestamp_ms, interval_ms);
        Self {
            symbol: symbol.to_string(),
            open: price,
            high: price,
            low: price,
            close: price,
            volume: qty,
            bucket_start_ms,
            bucket_end_ms: bucket_start_ms + interval_ms,
        }
    }

    /// Fold another trade into the bar.
    pub fn update(&mut self, price: f64, qty: f64) {
        self.high = self.high.max(price);
        self.low = self.low.min(price);
        self.close = price;
        self.volume += qty;
    }

    /// Check if a timestamp belongs to this bar's time bucket.
    pub fn contains(&self, timestamp_ms: u64) -> bool {
        timestamp_ms >= self.bucket_start_ms && timestamp_ms < self.bucket_end_ms
    }

    pub fn finish(self) -> Bar {
        Bar {
            symbol: self.symbol,
            open: self.open,
            high: self.high,
            low: self.low,
            close: self.close,
            volume: self.volume,
            bucket_start_ms: self.bucket_start_ms,
            bucket_end_ms: self.bucket_end_ms,
        }
    }
}
