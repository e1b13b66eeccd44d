use std::sync::Arc;

use crate::alert::{self, AlertHistory};
use crate::analytics::{
    align_closes, closes, hedge_ratio, resample_ticks, rolling_correlation, rolling_zscore, spread,
};
use crate::error::AppError;
use crate::model::alert::{AlertEvent, AlertSignal};
use crate::model::candle::Bar;
use crate::model::series::{latest_defined, Series, SparseSeries};
use crate::model::tick::Tick;
use crate::store::TickStore;

/// Parameters of one analytics refresh over a symbol pair.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshRequest {
    /// `[A, B]`; the hedge ratio regresses A on B.
    pub symbols: Vec<String>,
    pub timeframe_ms: u64,
    pub window: usize,
    pub lookback_ms: u64,
    pub alert_threshold: f64,
}

impl RefreshRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.symbols.len() != 2 {
            return Err(AppError::Config(format!(
                "pair analytics needs exactly 2 symbols, got {}",
                self.symbols.len()
            )));
        }
        if self.symbols.iter().any(|s| s.trim().is_empty()) {
            return Err(AppError::Config("symbol must not be empty".to_string()));
        }
        if self.symbols[0] == self.symbols[1] {
            return Err(AppError::Config(format!(
                "pair symbols must differ, got {} twice",
                self.symbols[0]
            )));
        }
        if self.timeframe_ms == 0 {
            return Err(AppError::Config("timeframe must be > 0".to_string()));
        }
        if self.window < 2 {
            return Err(AppError::Config(format!(
                "rolling window must be >= 2, got {}",
                self.window
            )));
        }
        if self.lookback_ms == 0 {
            return Err(AppError::Config("lookback must be > 0".to_string()));
        }
        if !self.alert_threshold.is_finite() || self.alert_threshold <= 0.0 {
            return Err(AppError::Config(format!(
                "alert threshold must be a positive number, got {}",
                self.alert_threshold
            )));
        }
        Ok(())
    }

    pub fn leg_a(&self) -> &str {
        &self.symbols[0]
    }

    pub fn leg_b(&self) -> &str {
        &self.symbols[1]
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// No ticks inside the lookback.
    WaitingForData,
    /// At least one leg has no bars for the timeframe.
    InsufficientBars,
    /// Bars exist but no z-score point is defined yet.
    WarmingUp,
    Ready,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnalyticsSummary {
    pub beta: Option<f64>,
    pub latest_zscore: Option<f64>,
    pub latest_correlation: Option<f64>,
}

/// Everything one refresh computes, for the presentation layer to consume.
#[derive(Debug, Clone, PartialEq)]
pub struct RefreshReport {
    pub status: RefreshStatus,
    pub bars_a: Vec<Bar>,
    pub bars_b: Vec<Bar>,
    pub beta: Option<f64>,
    pub spread: Series,
    pub zscore: SparseSeries,
    pub correlation: SparseSeries,
    /// Breach seen on this refresh, before the history's dedupe policy.
    pub signal: Option<AlertSignal>,
    /// Event appended to the alert history by this refresh.
    pub alert: Option<AlertEvent>,
}

impl RefreshReport {
    pub fn summary(&self) -> AnalyticsSummary {
        AnalyticsSummary {
            beta: self.beta,
            latest_zscore: latest_defined(&self.zscore).map(|p| p.value),
            latest_correlation: latest_defined(&self.correlation).map(|p| p.value),
        }
    }
}

/// Resample, regress, and score a tick set. Does not touch alert history.
/// An invalid request is rejected before any computation.
pub fn analyze_ticks(ticks: &[Tick], req: &RefreshRequest) -> Result<RefreshReport, AppError> {
    req.validate()?;
    let mut bars = resample_ticks(ticks, req.timeframe_ms);
    let bars_a = bars.remove(req.leg_a()).unwrap_or_default();
    let bars_b = bars.remove(req.leg_b()).unwrap_or_default();

    let pairs = align_closes(&closes(&bars_a), &closes(&bars_b));
    let beta = hedge_ratio(&pairs);
    let spread = beta.map(|b| spread(&pairs, b)).unwrap_or_default();
    let zscore = rolling_zscore(&spread, req.window);
    let correlation = rolling_correlation(&pairs, req.window);
    let signal = alert::evaluate(&zscore, req.alert_threshold);

    let status = if ticks.is_empty() {
        RefreshStatus::WaitingForData
    } else if bars_a.is_empty() || bars_b.is_empty() {
        RefreshStatus::InsufficientBars
    } else if latest_defined(&zscore).is_none() {
        RefreshStatus::WarmingUp
    } else {
        RefreshStatus::Ready
    };

    Ok(RefreshReport {
        status,
        bars_a,
        bars_b,
        beta,
        spread,
        zscore,
        correlation,
        signal,
        alert: None,
    })
}

/// On-demand analytics over the tick store for one symbol pair.
pub struct PairAnalytics<S: TickStore> {
    store: Arc<S>,
    history: Arc<AlertHistory>,
}

impl<S: TickStore> PairAnalytics<S> {
    pub fn new(store: Arc<S>, history: Arc<AlertHistory>) -> Self {
        Self { store, history }
    }

    pub fn history(&self) -> &AlertHistory {
        &self.history
    }

    /// Query the lookback from the store, compute every series, and record
    /// any breach in the alert history.
    pub fn refresh(&self, req: &RefreshRequest) -> Result<RefreshReport, AppError> {
        req.validate()?;
        let ticks = self.store.query_ticks(&req.symbols, req.lookback_ms)?;
        let mut report = analyze_ticks(&ticks, req)?;
        report.alert = self.history.record(report.signal)?;

        tracing::debug!(
            ticks = ticks.len(),
            bars_a = report.bars_a.len(),
            bars_b = report.bars_b.len(),
            beta = ?report.beta,
            status = ?report.status,
            "Refresh computed"
        );
        if let Some(event) = &report.alert {
            tracing::warn!(timestamp_ms = event.timestamp_ms, zscore = event.zscore, "{}", event.message);
        }
        Ok(report)
    }
}
