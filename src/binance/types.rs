use serde::Deserialize;

use crate::model::tick::Tick;

/// Deserialize Binance string-encoded numbers to f64.
pub fn string_to_f64<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.parse::<f64>().map_err(serde::de::Error::custom)
}

/// Binance trade stream event (symbol@trade).
#[derive(Debug, Deserialize)]
pub struct BinanceTradeEvent {
    #[serde(rename = "e")]
    pub event_type: String,
    #[serde(rename = "E")]
    pub event_time: u64,
    #[serde(rename = "T")]
    pub trade_time: u64,
    #[serde(rename = "s")]
    pub symbol: String,
    #[serde(rename = "t")]
    pub trade_id: u64,
    #[serde(rename = "p", deserialize_with = "string_to_f64")]
    pub price: f64,
    #[serde(rename = "q", deserialize_with = "string_to_f64")]
    pub qty: f64,
    #[serde(rename = "m")]
    pub is_buyer_maker: bool,
}

impl BinanceTradeEvent {
    /// Ticks are stamped with the matching-engine trade time, not the event time.
    pub fn into_tick(self) -> Tick {
        Tick {
            symbol: self.symbol,
            price: self.price,
            qty: self.qty,
            timestamp_ms: self.trade_time,
            trade_id: self.trade_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_futures_trade_payload() {
        let raw = r#"{"e":"trade","E":1700000000123,"T":1700000000120,"s":"BTCUSDT","t":42,"p":"37000.10","q":"0.005","X":"MARKET","m":true}"#;
        let event: BinanceTradeEvent = serde_json::from_str(raw).unwrap();
        assert_eq!(event.event_type, "trade");
        let tick = event.into_tick();
        assert_eq!(tick.symbol, "BTCUSDT");
        assert_eq!(tick.timestamp_ms, 1_700_000_000_120);
        assert_eq!(tick.trade_id, 42);
        assert!((tick.price - 37000.10).abs() < 1e-9);
        assert!((tick.qty - 0.005).abs() < 1e-12);
    }

    #[test]
    fn rejects_non_numeric_price() {
        let raw = r#"{"e":"trade","E":1,"T":1,"s":"BTCUSDT","t":1,"p":"abc","q":"1","m":false}"#;
        assert!(serde_json::from_str::<BinanceTradeEvent>(raw).is_err());
    }
}
