//! Fixed parameters of a Hi-Lo round.

/// Number of cards drawn at buy-in.
pub const HAND_SIZE: usize = 5;

/// Number of sequential comparisons in a round (one per adjacent pair).
pub const COMPARISONS: usize = HAND_SIZE - 1;

/// Index of the last comparison pair.
pub const LAST_COMPARE_INDEX: u8 = (COMPARISONS - 1) as u8;

/// Cards in a standard deck.
pub const DECK_SIZE: usize = 52;

/// Cards of each rank in a standard deck.
pub const SUITS_PER_RANK: usize = 4;

/// Lowest card value (deuce).
pub const MIN_VALUE: u8 = 2;

/// Highest card value (ace plays high).
pub const MAX_VALUE: u8 = 14;

/// Per-comparison return in basis points. Four comparisons compound to
/// roughly 95% of the stake.
pub const STEP_RETURN_BPS: u64 = 9873;

/// How long a finished round stays on screen before the tick resets it.
pub const DEFAULT_FINISH_TIMEOUT_MS: i64 = 10_000;

pub const RESULT_GET_READY: &str = "GET READY";
pub const RESULT_LOSS: &str = "BETTER LUCK NEXT TIME!";
