//! # Hi-Lo
//!
//! A single-table Hi-Lo card game: the host owns the only copy of the round,
//! display clients mirror it over WebSocket.
//!
//! A round deals five cards. The player stakes a bank, then makes four
//! sequential guesses whether the next card ranks higher (HI) or lower (LO)
//! than the current one. Each correct guess multiplies the bank by a fixed
//! factor for the current rank; a wrong guess ends the round with nothing.
//!
//! ## Core Modules
//!
//! - [`round`]: Cards, multiplier table and the round state machine
//! - [`net`]: JSON wire protocol shared by host and display clients
//! - [`table`]: Async actor owning the engine, with state fan-out and ticker
//!
//! ## Example
//!
//! ```
//! use hilo::{Command, RoundEngine, RoundRules, Stage};
//!
//! let mut engine = RoundEngine::new(RoundRules::default(), 0);
//! engine.apply(&Command::Arm { table_id: 1, box_id: 1 }, 10).unwrap();
//! let state = engine.apply(&Command::BuyIn { amount: 100 }, 20).unwrap();
//! assert_eq!(state.stage, Stage::Choosing);
//! assert_eq!(state.cards.len(), 5);
//! ```

/// Round engine: entities, payouts and the state machine.
pub mod round;
pub use round::{
    Card, Command, Multiplier, RoundEngine, RoundError, RoundRules, RoundState, Side, Stage,
    constants,
};

/// Wire protocol for host/display communication.
pub mod net;
pub use net::{
    errors::ProtocolError,
    messages::{Role, WsMessage},
    utils,
};

/// Table actor.
pub mod table;
pub use table::{TableActor, TableConfig, TableHandle};
