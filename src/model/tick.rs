/// A single trade print as delivered by the feed.
#[derive(Debug, Clone, PartialEq)]
pub struct Tick {
    pub symbol: String,
    pub price: f64,
    pub qty: f64,
    pub timestamp_ms: u64,
    pub trade_id: u64,
}

impl Tick {
    pub fn new(symbol: &str, price: f64, qty: f64, timestamp_ms: u64, trade_id: u64) -> Self {
        Self {
            symbol: symbol.to_string(),
            price,
            qty,
            timestamp_ms,
            trade_id,
        }
    }

    /// Ticks with an empty symbol, a non-positive/non-finite price or a negative
    /// quantity are dropped at the feed boundary.
    pub fn is_well_formed(&self) -> bool {
        !self.symbol.trim().is_empty()
            && self.price.is_finite()
            && self.price > 0.0
            && self.qty.is_finite()
            && self.qty >= 0.0
    }
}
