//! Hi-Lo round engine.
//!
//! This module provides the authoritative game rules:
//! - Card, deck and dealer model
//! - The fixed multiplier table and comparison resolution
//! - A pure state machine over immutable [`RoundState`] snapshots
//! - Time-based reset of finished rounds

pub mod constants;
pub mod entities;
pub mod payouts;

mod state_machine;

pub use entities::{
    Camera, Card, CardParseError, Chips, Command, Dealer, Deck, Millis, Multiplier, RoundState,
    ShuffledDealer, Side, Stage, Suit, Value,
};
pub use payouts::{Odds, odds_for};
pub use state_machine::{RoundEngine, RoundError, RoundRules, expire, transition};
