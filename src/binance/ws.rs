use anyhow::Result;
use futures_util::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_tungstenite::tungstenite;

use super::types::BinanceTradeEvent;
use crate::error::AppError;
use crate::ingest::TickSink;
use crate::model::tick::Tick;

/// Exponential backoff for reconnection.
struct ExponentialBackoff {
    current: Duration,
    initial: Duration,
    max: Duration,
    factor: f64,
}

impl ExponentialBackoff {
    fn new(initial: Duration, max: Duration, factor: f64) -> Self {
        Self {
            current: initial,
            initial,
            max,
            factor,
        }
    }

    fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = Duration::from_secs_f64(
            (self.current.as_secs_f64() * self.factor).min(self.max.as_secs_f64()),
        );
        delay
    }

    fn reset(&mut self) {
        self.current = self.initial;
    }
}

/// Raw trade-stream client for a fixed set of symbols.
#[derive(Debug, Clone)]
pub struct BinanceWsClient {
    url: String,
}

/// `<base>/<sym>@trade/<sym>@trade...` with lower-cased symbols.
pub fn trade_stream_url(ws_base_url: &str, symbols: &[String]) -> String {
    let streams = symbols
        .iter()
        .map(|s| format!("{}@trade", s.trim().to_ascii_lowercase()))
        .collect::<Vec<_>>()
        .join("/");
    format!("{}/{}", ws_base_url.trim_end_matches('/'), streams)
}

impl BinanceWsClient {
    pub fn new(ws_base_url: &str, symbols: &[String]) -> Self {
        Self {
            url: trade_stream_url(ws_base_url, symbols),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Decode one trade frame.
    pub fn parse_trade(text: &str) -> Result<Tick, AppError> {
        let event: BinanceTradeEvent = serde_json::from_str(text)?;
        Ok(event.into_tick())
    }

    /// Parse one text frame and hand the tick to `sink`.
    /// Malformed frames are logged and dropped. Returns whether a tick was delivered.
    pub fn on_message(text: &str, sink: &dyn TickSink) -> bool {
        match Self::parse_trade(text) {
            Ok(tick) => {
                sink.on_tick(tick);
                true
            }
            Err(e) => {
                tracing::debug!(error = %e, "Failed to parse WS message");
                false
            }
        }
    }

    /// Connect and run the WebSocket loop with automatic reconnection until
    /// `shutdown` fires.
    pub async fn connect_and_run(
        &self,
        sink: Arc<dyn TickSink>,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<()> {
        let mut backoff = ExponentialBackoff::new(
            Duration::from_secs(1),
            Duration::from_secs(60),
            2.0,
        );
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            match self.connect_once(sink.as_ref(), &mut shutdown, &mut backoff).await {
                Ok(()) => {
                    tracing::info!(url = %self.url, "WebSocket closed on shutdown");
                    break;
                }
                Err(e) => {
                    let delay = backoff.next_delay();
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        "WebSocket disconnected, reconnecting"
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => continue,
                        _ = shutdown.changed() => {
                            tracing::info!("Shutdown during reconnect");
                            break;
                        }
                    }
                }
            }
        }
        Ok(())
    }

    async fn connect_once(
        &self,
        sink: &dyn TickSink,
        shutdown: &mut watch::Receiver<bool>,
        backoff: &mut ExponentialBackoff,
    ) -> Result<(), AppError> {
        tracing::info!(url = %self.url, "Connecting to trade stream");

        let (ws_stream, _resp) = tokio_tungstenite::connect_async(&self.url)
            .await
            .map_err(|e| AppError::WebSocket(format!("connect failed: {}", e)))?;

        tracing::info!(url = %self.url, "WebSocket connected");
        backoff.reset();

        let (_write, mut read) = ws_stream.split();

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(tungstenite::Message::Text(text))) => {
                            Self::on_message(&text, sink);
                        }
                        Some(Ok(tungstenite::Message::Ping(_))) => {
                            // tokio-tungstenite handles pong automatically
                        }
                        Some(Ok(tungstenite::Message::Close(frame))) => {
                            return Err(AppError::WebSocket(format!("closed by server: {:?}", frame)));
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => {
                            return Err(AppError::WebSocket(format!("read error: {}", e)));
                        }
                        None => {
                            return Err(AppError::WebSocket("stream ended".to_string()));
                        }
                    }
                }
                _ = shutdown.changed() => {
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::TickBuffer;

    #[test]
    fn stream_url_joins_lowercase_trade_streams() {
        let symbols = vec!["BTCUSDT".to_string(), "EthUsdt".to_string()];
        assert_eq!(
            trade_stream_url("wss://fstream.binance.com/ws/", &symbols),
            "wss://fstream.binance.com/ws/btcusdt@trade/ethusdt@trade"
        );
        let client = BinanceWsClient::new("wss://fstream.binance.com/ws", &symbols);
        assert!(client.url().ends_with("/btcusdt@trade/ethusdt@trade"));
    }

    #[test]
    fn backoff_doubles_then_caps_and_resets() {
        let mut b = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(5), 2.0);
        assert_eq!(b.next_delay(), Duration::from_secs(1));
        assert_eq!(b.next_delay(), Duration::from_secs(2));
        assert_eq!(b.next_delay(), Duration::from_secs(4));
        assert_eq!(b.next_delay(), Duration::from_secs(5));
        assert_eq!(b.next_delay(), Duration::from_secs(5));
        b.reset();
        assert_eq!(b.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn on_message_buffers_valid_and_drops_malformed() {
        let buffer = TickBuffer::new();
        let good = r#"{"e":"trade","E":2,"T":1,"s":"ETHUSDT","t":7,"p":"2000.5","q":"1.25","m":false}"#;
        assert!(BinanceWsClient::on_message(good, &buffer));
        assert!(!BinanceWsClient::on_message("not json", &buffer));
        assert!(!BinanceWsClient::on_message(r#"{"result":null,"id":1}"#, &buffer));

        let drained = buffer.drain().unwrap();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].symbol, "ETHUSDT");
        assert_eq!(drained[0].timestamp_ms, 1);
    }

    #[test]
    fn parse_trade_reports_json_errors() {
        let err = BinanceWsClient::parse_trade("not json").unwrap_err();
        assert!(matches!(err, AppError::Json(_)));

        let tick = BinanceWsClient::parse_trade(
            r#"{"e":"trade","E":2,"T":1,"s":"BTCUSDT","t":9,"p":"100.0","q":"0.5","m":true}"#,
        )
        .unwrap();
        assert_eq!(tick.trade_id, 9);
    }

    #[tokio::test]
    async fn connect_failure_is_a_websocket_error() {
        let client = BinanceWsClient::new("ws://127.0.0.1:1", &["BTCUSDT".to_string()]);
        let buffer = TickBuffer::new();
        let (_tx, mut rx) = watch::channel(false);
        let mut backoff =
            ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(60), 2.0);

        let err = client
            .connect_once(&buffer, &mut rx, &mut backoff)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::WebSocket(_)));
        assert!(err.to_string().starts_with("WebSocket error: connect failed"));
    }
}
