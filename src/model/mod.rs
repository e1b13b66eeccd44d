pub mod alert;
pub mod candle;
pub mod series;
pub mod tick;
