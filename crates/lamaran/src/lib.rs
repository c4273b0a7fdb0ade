pub mod config;
pub mod error;
pub mod google;
pub mod submission;
pub mod telemetry;
