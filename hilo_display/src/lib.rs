//! # Hi-Lo display client
//!
//! Keeps a live copy of the host's round and forwards player commands.
//!
//! - [`websocket_client`]: Persistent WebSocket connection ([`DisplayClient`])
//! - [`api_client`]: `/status` and `/cmd/*` over HTTP ([`StatusClient`])
//! - [`commands`]: Text command parser for the prompt
//! - [`input`]: Stdin lines read on their own thread
//! - [`render`]: Plain-text rendering of a round
//! - [`config`]: Environment and CLI configuration

pub mod api_client;
pub mod commands;
pub mod config;
pub mod input;
pub mod render;
pub mod websocket_client;

pub use api_client::StatusClient;
pub use config::{ConfigError, ConfigOverrides, DisplayConfig, ReconnectPolicy};
pub use websocket_client::DisplayClient;
