//! Wire protocol shared by the host and display clients.
//!
//! Messages are JSON text frames carried over a WebSocket, tagged by a
//! `type` field. The host pushes `state` messages; clients send `hello`
//! once and `cmd` messages as players act.

/// Protocol error types.
pub mod errors;

/// Message types exchanged between host and display clients.
pub mod messages;

/// Encoding, decoding and frame size limits.
pub mod utils;
