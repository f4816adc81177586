//! Table actor message types.

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::round::{Command, RoundError, RoundState, Stage};

/// Identifies one subscriber channel, usually one WebSocket connection.
pub type SubscriberId = Uuid;

/// Messages that can be sent to a TableActor
#[derive(Debug)]
pub enum TableMessage {
    /// Apply a player command. With `round_id` set, the command is dropped
    /// unless it matches the current round.
    Apply {
        command: Command,
        round_id: Option<Uuid>,
        response: oneshot::Sender<ApplyOutcome>,
    },

    /// Get current round snapshot
    GetState {
        response: oneshot::Sender<RoundState>,
    },

    /// Get table counters
    GetStats {
        response: oneshot::Sender<TableStats>,
    },

    /// Register for state pushes; replies with the current snapshot
    Subscribe {
        subscriber_id: SubscriberId,
        sender: mpsc::Sender<RoundState>,
        response: oneshot::Sender<RoundState>,
    },

    /// Stop state pushes
    Unsubscribe { subscriber_id: SubscriberId },

    /// Run the finish timeout now instead of waiting for the ticker
    Tick,

    /// Stop the actor. Every subscriber channel is closed.
    Close { response: oneshot::Sender<()> },
}

/// What happened to an applied command. Every variant carries the snapshot
/// that is current after the command was handled.
#[derive(Debug, Clone, PartialEq)]
pub enum ApplyOutcome {
    /// The command changed the round
    Applied(RoundState),

    /// A guard rejected the command; the round is unchanged
    Rejected {
        reason: RoundError,
        state: RoundState,
    },

    /// The command targeted a round that is no longer current
    Stale { state: RoundState },
}

impl ApplyOutcome {
    /// Check if the command changed the round
    pub fn is_applied(&self) -> bool {
        matches!(self, ApplyOutcome::Applied(_))
    }

    pub fn state(&self) -> &RoundState {
        match self {
            ApplyOutcome::Applied(state)
            | ApplyOutcome::Rejected { state, .. }
            | ApplyOutcome::Stale { state } => state,
        }
    }

    pub fn into_state(self) -> RoundState {
        match self {
            ApplyOutcome::Applied(state)
            | ApplyOutcome::Rejected { state, .. }
            | ApplyOutcome::Stale { state } => state,
        }
    }
}

/// Table counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableStats {
    /// Registered subscriber channels
    pub subscribers: usize,

    /// Current stage
    pub stage: Stage,

    /// Current round id
    pub round_id: Uuid,

    /// State deliveries skipped because a subscriber channel was full
    pub dropped_deliveries: u64,

    /// Rounds that reached FINISH since the table started
    pub rounds_finished: u64,
}

/// Errors returned by a [`TableHandle`](super::TableHandle)
#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
pub enum TableError {
    /// The actor has stopped
    #[error("table is closed")]
    Closed,
}
