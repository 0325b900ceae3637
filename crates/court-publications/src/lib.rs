pub mod config;
pub mod error;
pub mod publication;
pub mod telemetry;
