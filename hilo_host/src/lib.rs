//! # Hi-Lo host
//!
//! Owns the authoritative round and serves it over HTTP and WebSocket.
//!
//! - [`api`]: Axum router (`/ws`, `/status`, `/health`, `/cmd/*`)
//! - [`host`]: Start/stop lifecycle
//! - [`config`]: Environment and CLI configuration
//! - [`logging`], [`metrics`]: Ambient observability

pub mod api;
pub mod config;
pub mod host;
pub mod logging;
pub mod metrics;

pub use config::{ConfigError, ConfigOverrides, HostConfig};
pub use host::HostServer;
