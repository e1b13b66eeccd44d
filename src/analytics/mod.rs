pub mod hedge;
pub mod resample;
pub mod rolling;

pub use hedge::{align_closes, hedge_ratio, spread, AlignedPair};
pub use resample::{closes, resample_ticks};
pub use rolling::{rolling_correlation, rolling_zscore};
