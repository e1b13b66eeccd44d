use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::alert::AlertPolicy;
use crate::error::AppError;
use crate::pipeline::RefreshRequest;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub binance: BinanceConfig,
    pub storage: StorageConfig,
    pub analytics: AnalyticsConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BinanceConfig {
    pub ws_base_url: String,
    pub symbols: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    pub db_path: String,
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AnalyticsConfig {
    pub timeframe: String,
    pub window: usize,
    pub lookback: String,
    pub alert_threshold: f64,
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    #[serde(default)]
    pub alert_policy: AlertPolicy,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    #[serde(default)]
    pub json: bool,
    #[serde(default)]
    pub file: Option<String>,
}

fn default_flush_interval_ms() -> u64 {
    5_000
}

fn default_refresh_interval_ms() -> u64 {
    1_000
}

/// Parse an interval string (e.g. "1s", "1m", "1h", "1d", "1w", "1M") into milliseconds.
pub fn parse_interval_ms(s: &str) -> Result<u64> {
    let split = match s.char_indices().last() {
        Some((idx, _)) if idx > 0 => idx,
        _ => bail!("invalid interval '{}': expected format like '1m'", s),
    };

    let (num_str, suffix) = s.split_at(split);
    let n: u64 = num_str.parse().with_context(|| {
        format!(
            "invalid interval '{}': quantity must be a positive integer",
            s
        )
    })?;
    if n == 0 {
        bail!("invalid interval '{}': quantity must be > 0", s);
    }

    let unit_ms = match suffix {
        "s" => 1_000,
        "m" => 60_000,
        "h" => 3_600_000,
        "d" => 86_400_000,
        "w" => 7 * 86_400_000,
        "M" => 30 * 86_400_000,
        _ => bail!(
            "invalid interval '{}': unsupported suffix '{}', expected one of s/m/h/d/w/M",
            s,
            suffix
        ),
    };

    n.checked_mul(unit_ms)
        .with_context(|| format!("invalid interval '{}': value is too large", s))
}

impl BinanceConfig {
    /// Upper-cased, trimmed symbols with blanks and duplicates removed, order kept.
    pub fn tradable_symbols(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for sym in &self.symbols {
            let s = sym.trim().to_ascii_uppercase();
            if !s.is_empty() && !out.iter().any(|v| v == &s) {
                out.push(s);
            }
        }
        out
    }
}

impl StorageConfig {
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }
}

impl AnalyticsConfig {
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_millis(self.refresh_interval_ms)
    }
}

fn config_path() -> PathBuf {
    std::env::var("PQ_CONFIG_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config/default.toml"))
}

impl Config {
    pub fn load() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::load_from_path(&config_path())
    }

    pub fn load_from_path(path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Config = toml::from_str(&config_str)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.storage.flush_interval_ms == 0 {
            bail!("storage.flush_interval_ms must be > 0");
        }
        if self.analytics.refresh_interval_ms == 0 {
            bail!("analytics.refresh_interval_ms must be > 0");
        }
        self.refresh_request()
            .context("analytics section is invalid")?;
        Ok(())
    }

    /// Build the validated refresh parameters for the configured pair.
    pub fn refresh_request(&self) -> Result<RefreshRequest, AppError> {
        let timeframe_ms = parse_interval_ms(&self.analytics.timeframe)
            .map_err(|e| AppError::Config(format!("analytics.timeframe: {:#}", e)))?;
        let lookback_ms = parse_interval_ms(&self.analytics.lookback)
            .map_err(|e| AppError::Config(format!("analytics.lookback: {:#}", e)))?;
        let req = RefreshRequest {
            symbols: self.binance.tradable_symbols(),
            timeframe_ms,
            window: self.analytics.window,
            lookback_ms,
            alert_threshold: self.analytics.alert_threshold,
        };
        req.validate()?;
        Ok(req)
    }
}
