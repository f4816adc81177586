//! Multiplier table and comparison resolution.
//!
//! Each entry is the fair payout for the side, scaled by
//! [`STEP_RETURN_BPS`](super::constants::STEP_RETURN_BPS) and rounded to
//! hundredths, so four sequential comparisons return about 95% of the stake.
//! A zero entry marks a side that cannot win (nothing ranks above an ace or
//! below a deuce).

use std::cmp::Ordering;

use super::constants::{DECK_SIZE, MAX_VALUE, MIN_VALUE, STEP_RETURN_BPS, SUITS_PER_RANK};
use super::entities::{Card, Multiplier, Side, Value};

/// HI multipliers in hundredths, indexed by `value - 2`.
const HI_TABLE: [u32; 13] = [105, 114, 126, 140, 157, 180, 210, 252, 315, 420, 629, 1259, 0];

/// LO multipliers in hundredths, indexed by `value - 2`.
const LO_TABLE: [u32; 13] = [0, 1259, 629, 420, 315, 252, 210, 180, 157, 140, 126, 114, 105];

/// Multipliers offered for one comparison.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Odds {
    pub hi: Multiplier,
    pub lo: Multiplier,
    pub tie: Multiplier,
}

fn table_index(value: Value) -> Option<usize> {
    (MIN_VALUE..=MAX_VALUE)
        .contains(&value)
        .then(|| usize::from(value - MIN_VALUE))
}

/// HI multiplier for a current card of `value`.
#[must_use]
pub fn hi_multiplier(value: Value) -> Multiplier {
    table_index(value).map_or(Multiplier::ZERO, |i| Multiplier::from_hundredths(HI_TABLE[i]))
}

/// LO multiplier for a current card of `value`.
#[must_use]
pub fn lo_multiplier(value: Value) -> Multiplier {
    table_index(value).map_or(Multiplier::ZERO, |i| Multiplier::from_hundredths(LO_TABLE[i]))
}

/// TIE multiplier for the comparison at `compare_index`, derived from how
/// many cards of the current rank are already face up.
#[must_use]
pub fn tie_multiplier(cards: &[Card], compare_index: usize) -> Multiplier {
    let Some(current) = cards.get(compare_index) else {
        return Multiplier::ZERO;
    };
    let seen = compare_index + 1;
    let same_rank_seen = cards[..seen]
        .iter()
        .filter(|c| c.value() == current.value())
        .count();
    let same_rank_unseen = SUITS_PER_RANK.saturating_sub(same_rank_seen);
    if same_rank_unseen == 0 {
        return Multiplier::ZERO;
    }
    let unseen = (DECK_SIZE - seen) as u64;
    let hundredths = unseen * STEP_RETURN_BPS / (same_rank_unseen as u64 * 100);
    Multiplier::from_hundredths(u32::try_from(hundredths).unwrap_or(u32::MAX))
}

/// Odds for the comparison at `compare_index`. A pure function of the cards;
/// the HI/LO entries depend only on the current card's rank.
#[must_use]
pub fn odds_for(cards: &[Card], compare_index: usize, tie_enabled: bool) -> Odds {
    let Some(current) = cards.get(compare_index) else {
        return Odds::default();
    };
    Odds {
        hi: hi_multiplier(current.value()),
        lo: lo_multiplier(current.value()),
        tie: if tie_enabled {
            tie_multiplier(cards, compare_index)
        } else {
            Multiplier::ZERO
        },
    }
}

/// Whether `side` wins when `next` is revealed after `current`. For HI and
/// LO an equal rank loses.
#[must_use]
pub fn side_wins(side: Side, current: Card, next: Card) -> bool {
    match (side, next.value().cmp(&current.value())) {
        (Side::Hi, Ordering::Greater) => true,
        (Side::Lo, Ordering::Less) => true,
        (Side::Tie, Ordering::Equal) => true,
        _ => false,
    }
}
