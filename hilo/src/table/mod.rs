//! The table: one round engine behind an async actor.
//!
//! This module implements:
//! - TableActor: single writer of round state, with its own finish-timeout ticker
//! - TableHandle: cloneable mpsc sender with oneshot replies
//! - Subscriber fan-out: every new snapshot is pushed to bounded channels
//!
//! ## Example
//!
//! ```no_run
//! use hilo::round::Command;
//! use hilo::table::{TableActor, TableConfig};
//!
//! #[tokio::main]
//! async fn main() {
//!     let handle = TableActor::spawn(TableConfig::default());
//!     let mut subscription = handle.subscribe().await.unwrap();
//!
//!     handle.apply(Command::Arm { table_id: 1, box_id: 1 }).await.unwrap();
//!     let armed = subscription.receiver.recv().await;
//!     println!("{armed:?}");
//! }
//! ```

pub mod actor;
pub mod config;
pub mod messages;

pub use actor::{Subscription, TableActor, TableHandle};
pub use config::TableConfig;
pub use messages::{ApplyOutcome, SubscriberId, TableError, TableMessage, TableStats};
