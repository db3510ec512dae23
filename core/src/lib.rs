//! MarketWatch core: synthetic market generation with injected pricing
//! scenarios, plus the analytics consumed by the dashboard runner.

pub mod anomaly;
pub mod config;
pub mod error;
pub mod generator;
pub mod insights;
pub mod isolation_forest;
pub mod rng;
pub mod scenario;
pub mod session;
pub mod stats;
pub mod summary;
pub mod table;
pub mod types;
pub mod views;
