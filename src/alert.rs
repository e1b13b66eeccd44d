use std::sync::Mutex;

use serde::Deserialize;

use crate::error::AppError;
use crate::model::alert::{AlertDirection, AlertEvent, AlertSignal};
use crate::model::series::{latest_defined, Point};

/// Check the latest defined z-score against `±threshold`.
///
/// Returns `None` when no point is defined yet or the value sits inside the band.
pub fn evaluate(zscore: &[Point<Option<f64>>], threshold: f64) -> Option<AlertSignal> {
    let latest = latest_defined(zscore)?;
    let direction = if latest.value >= threshold {
        AlertDirection::Above
    } else if latest.value <= -threshold {
        AlertDirection::Below
    } else {
        return None;
    };
    Some(AlertSignal {
        direction,
        zscore: latest.value,
        timestamp_ms: latest.timestamp_ms,
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPolicy {
    /// Record an event on every refresh that observes a breach.
    #[default]
    EveryRefresh,
    /// Record once when a breach starts or flips side; re-arm after a refresh
    /// without a breach.
    OncePerBreach,
}

#[derive(Debug, Default)]
struct HistoryState {
    events: Vec<AlertEvent>,
    active: Option<AlertDirection>,
}

/// Append-only alert log for the session.
#[derive(Debug)]
pub struct AlertHistory {
    policy: AlertPolicy,
    state: Mutex<HistoryState>,
}

impl Default for AlertHistory {
    fn default() -> Self {
        Self::new(AlertPolicy::default())
    }
}

impl AlertHistory {
    pub fn new(policy: AlertPolicy) -> Self {
        Self {
            policy,
            state: Mutex::new(HistoryState::default()),
        }
    }

    /// Feed one refresh's evaluation. Appends at most one event and returns it.
    pub fn record(&self, signal: Option<AlertSignal>) -> Result<Option<AlertEvent>, AppError> {
        let mut state = self
            .state
            .lock()
            .map_err(|_| AppError::Persistence("alert history lock poisoned".to_string()))?;

        let Some(signal) = signal else {
            state.active = None;
            return Ok(None);
        };

        let emit = match self.policy {
            AlertPolicy::EveryRefresh => true,
            AlertPolicy::OncePerBreach => state.active != Some(signal.direction),
        };
        state.active = Some(signal.direction);
        if !emit {
            return Ok(None);
        }

        let event = AlertEvent::from(signal);
        state.events.push(event.clone());
        Ok(Some(event))
    }

    pub fn snapshot(&self) -> Result<Vec<AlertEvent>, AppError> {
        let state = self
            .state
            .lock()
            .map_err(|_| AppError::Persistence("alert history lock poisoned".to_string()))?;
        Ok(state.events.clone())
    }

    pub fn len(&self) -> usize {
        self.state.lock().map(|s| s.events.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
