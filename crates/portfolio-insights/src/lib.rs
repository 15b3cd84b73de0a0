pub mod client;
pub mod config;
pub mod error;
pub mod reporting;
pub mod telemetry;
