//! HTTP service for the swap coordinator.
//!
//! Exposes the public API (`/health`, `/quote`, `/swap`, `/swap/{id}`,
//! `/metrics`) over the lifecycle engine and owns environment-based
//! configuration for the binary.

/// API endpoint handlers.
pub mod apis;
/// Environment-based configuration.
pub mod config;
/// Router, shared state, and server startup.
pub mod server;

pub use config::{Config, ConfigError};
pub use server::{router, start_server, AppState};
