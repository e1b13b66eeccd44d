use std::collections::BTreeMap;

use crate::model::candle::{Bar, BarBuilder};
use crate::model::series::{Point, Series};
use crate::model::tick::Tick;

/// Resample ticks into fixed-interval OHLCV bars, one ascending series per symbol.
///
/// Buckets are `floor(ts / timeframe) * timeframe`. Empty buckets produce no bar.
/// Ticks sharing a timestamp keep their input order, so the first one opens
/// the bar and the last one closes it.
pub fn resample_ticks(ticks: &[Tick], timeframe_ms: u64) -> BTreeMap<String, Vec<Bar>> {
    assert!(timeframe_ms > 0, "timeframe_ms must be > 0");

    let mut by_symbol: BTreeMap<&str, Vec<&Tick>> = BTreeMap::new();
    for tick in ticks {
        by_symbol.entry(tick.symbol.as_str()).or_default().push(tick);
    }

    let mut out = BTreeMap::new();
    for (symbol, mut symbol_ticks) in by_symbol {
        // Stable sort keeps arrival order for equal timestamps.
        symbol_ticks.sort_by_key(|t| t.timestamp_ms);

        let mut bars = Vec::new();
        let mut current: Option<BarBuilder> = None;
        for tick in symbol_ticks {
            match current.as_mut() {
                Some(builder) if builder.contains(tick.timestamp_ms) => {
                    builder.update(tick.price, tick.qty);
                }
                _ => {
                    if let Some(done) = current.take() {
                        bars.push(done.finish());
                    }
                    current = Some(BarBuilder::new(
                        symbol,
                        tick.price,
                        tick.qty,
                        tick.timestamp_ms,
                        timeframe_ms,
                    ));
                }
            }
        }
        if let Some(done) = current {
            bars.push(done.finish());
        }
        out.insert(symbol.to_string(), bars);
    }
    out
}

/// Close prices keyed by bucket start.
pub fn closes(bars: &[Bar]) -> Series {
    bars.iter()
        .map(|b| Point::new(b.bucket_start_ms, b.close))
        .collect()
}
