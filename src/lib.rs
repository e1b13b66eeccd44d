pub mod alert;
pub mod analytics;
pub mod binance;
pub mod config;
pub mod error;
pub mod ingest;
pub mod model;
pub mod pipeline;
pub mod store;
