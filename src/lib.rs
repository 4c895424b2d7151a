//! gateguard: request interceptor service
//!
//! Exposes the CLI, HTTP surface and service wiring for integration testing.

pub mod cli;
pub mod config;
pub mod hook;
pub mod metrics;
pub mod server;
pub mod service;

pub use config::{ConfigError, GuardConfig};
pub use service::GuardService;
