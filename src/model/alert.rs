use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertDirection {
    Above,
    Below,
}

impl fmt::Display for AlertDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Above => write!(f, "ABOVE"),
            Self::Below => write!(f, "BELOW"),
        }
    }
}

/// Threshold breach observed on the latest defined z-score.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlertSignal {
    pub direction: AlertDirection,
    pub zscore: f64,
    pub timestamp_ms: u64,
}

impl AlertSignal {
    pub fn message(&self) -> String {
        format!("Z-Score {} threshold: {:.2}", self.direction, self.zscore)
    }
}

/// Entry of the session alert log. Never mutated once recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertEvent {
    pub timestamp_ms: u64,
    pub direction: AlertDirection,
    pub zscore: f64,
    pub message: String,
}

impl From<AlertSignal> for AlertEvent {
    fn from(signal: AlertSignal) -> Self {
        Self {
            timestamp_ms: signal.timestamp_ms,
            direction: signal.direction,
            zscore: signal.zscore,
            message: signal.message(),
        }
    }
}
