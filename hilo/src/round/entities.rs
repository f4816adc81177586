use rand::{Rng, SeedableRng, rngs::StdRng, seq::SliceRandom};
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};
use thiserror::Error;
use uuid::Uuid;

use super::constants::{DECK_SIZE, HAND_SIZE, MAX_VALUE, MIN_VALUE};

/// Type alias for whole chips. Banks only ever grow by a floored multiple,
/// so fractional chips never exist.
pub type Chips = u64;

/// Milliseconds since the Unix epoch.
pub type Millis = i64;

/// Placeholder for card values. 2 through 10 are pips, then J=11, Q=12,
/// K=13 and A=14 (aces play high).
pub type Value = u8;

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum Suit {
    Club,
    Spade,
    Diamond,
    Heart,
}

impl Suit {
    pub const ALL: [Suit; 4] = [Suit::Club, Suit::Spade, Suit::Diamond, Suit::Heart];

    fn from_char(c: char) -> Option<Self> {
        match c {
            '♣' | 'c' | 'C' => Some(Self::Club),
            '♠' | 's' | 'S' => Some(Self::Spade),
            '♦' | 'd' | 'D' => Some(Self::Diamond),
            '♥' | 'h' | 'H' => Some(Self::Heart),
            _ => None,
        }
    }
}

impl fmt::Display for Suit {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let repr = match self {
            Self::Club => "♣",
            Self::Spade => "♠",
            Self::Diamond => "♦",
            Self::Heart => "♥",
        };
        write!(f, "{repr}")
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum CardParseError {
    #[error("empty card")]
    Empty,
    #[error("unknown suit in {0:?}")]
    UnknownSuit(String),
    #[error("unknown rank in {0:?}")]
    UnknownRank(String),
}

/// A playing card. Serialized as rank followed by suit glyph, e.g. `10♣`.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub struct Card(pub Value, pub Suit);

impl Card {
    #[must_use]
    pub const fn value(&self) -> Value {
        self.0
    }

    #[must_use]
    pub const fn suit(&self) -> Suit {
        self.1
    }
}

impl fmt::Display for Card {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let value = match self.0 {
            11 => "J",
            12 => "Q",
            13 => "K",
            14 => "A",
            v => &v.to_string(),
        };
        write!(f, "{value}{}", self.1)
    }
}

impl FromStr for Card {
    type Err = CardParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let suit_char = s.chars().last().ok_or(CardParseError::Empty)?;
        let suit =
            Suit::from_char(suit_char).ok_or_else(|| CardParseError::UnknownSuit(s.to_string()))?;
        let rank = &s[..s.len() - suit_char.len_utf8()];
        let value = match rank.to_ascii_uppercase().as_str() {
            "J" => 11,
            "Q" => 12,
            "K" => 13,
            "A" => 14,
            pip => match pip.parse::<Value>() {
                Ok(v) if (MIN_VALUE..=10).contains(&v) => v,
                _ => return Err(CardParseError::UnknownRank(s.to_string())),
            },
        };
        Ok(Card(value, suit))
    }
}

impl TryFrom<String> for Card {
    type Error = CardParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Card> for String {
    fn from(card: Card) -> Self {
        card.to_string()
    }
}

/// A 52-card deck dealt without replacement. Reshuffled for every round.
#[derive(Debug)]
pub struct Deck {
    cards: [Card; DECK_SIZE],
    pub deck_idx: usize,
}

impl Deck {
    /// Deals the next card, or `None` once the deck is exhausted.
    pub fn deal_card(&mut self) -> Option<Card> {
        let card = self.cards.get(self.deck_idx).copied()?;
        self.deck_idx += 1;
        Some(card)
    }

    pub fn shuffle<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        self.cards.shuffle(rng);
        self.deck_idx = 0;
    }

    #[must_use]
    pub fn cards(&self) -> &[Card] {
        &self.cards
    }
}

impl Default for Deck {
    fn default() -> Self {
        let mut cards: [Card; DECK_SIZE] = [Card(MIN_VALUE, Suit::Club); DECK_SIZE];
        for (i, value) in (MIN_VALUE..=MAX_VALUE).enumerate() {
            for (j, suit) in Suit::ALL.into_iter().enumerate() {
                cards[4 * i + j] = Card(value, suit);
            }
        }
        Self { cards, deck_idx: 0 }
    }
}

/// Source of the five cards revealed over a round.
pub trait Dealer: Send {
    fn deal(&mut self) -> [Card; HAND_SIZE];
}

/// Fixed draws for tests and replays: any closure producing a hand.
impl<F> Dealer for F
where
    F: FnMut() -> [Card; HAND_SIZE] + Send,
{
    fn deal(&mut self) -> [Card; HAND_SIZE] {
        self()
    }
}

/// Default dealer: shuffles a fresh deck for every round.
#[derive(Debug)]
pub struct ShuffledDealer {
    deck: Deck,
    rng: StdRng,
}

impl ShuffledDealer {
    #[must_use]
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Deterministic dealer, handy for benchmarks and reproducible sessions.
    #[must_use]
    pub fn seeded(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            deck: Deck::default(),
            rng,
        }
    }
}

impl Default for ShuffledDealer {
    fn default() -> Self {
        Self::new()
    }
}

impl Dealer for ShuffledDealer {
    fn deal(&mut self) -> [Card; HAND_SIZE] {
        self.deck.shuffle(&mut self.rng);
        let top = &self.deck.cards()[..HAND_SIZE];
        let mut hand = [top[0]; HAND_SIZE];
        hand.copy_from_slice(top);
        self.deck.deck_idx = HAND_SIZE;
        hand
    }
}

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Stage {
    Idle,
    Armed,
    Choosing,
    Confirming,
    Finish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Idle => "IDLE",
            Self::Armed => "ARMED",
            Self::Choosing => "CHOOSING",
            Self::Confirming => "CONFIRMING",
            Self::Finish => "FINISH",
        };
        write!(f, "{repr}")
    }
}

/// Side picked for the active comparison.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Side {
    Hi,
    Lo,
    Tie,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let repr = match self {
            Self::Hi => "HI",
            Self::Lo => "LO",
            Self::Tie => "TIE",
        };
        write!(f, "{repr}")
    }
}

/// Rendering hint: zoom onto the active pair while a choice awaits
/// confirmation.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Camera {
    #[default]
    Wide,
    Compare,
}

/// Payout factor in hundredths (`180` is x1.80). Zero marks a side that
/// cannot win and must not be chosen. Carried on the wire as a decimal.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, Ord, PartialEq, PartialOrd, Deserialize, Serialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Multiplier(u32);

impl Multiplier {
    pub const ZERO: Multiplier = Multiplier(0);

    #[must_use]
    pub const fn from_hundredths(hundredths: u32) -> Self {
        Self(hundredths)
    }

    #[must_use]
    pub const fn hundredths(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    /// `floor(bank * self)`, computed exactly.
    #[must_use]
    pub fn apply(self, bank: Chips) -> Chips {
        let scaled = u128::from(bank) * u128::from(self.0) / 100;
        Chips::try_from(scaled).unwrap_or(Chips::MAX)
    }
}

impl fmt::Display for Multiplier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl From<Multiplier> for f64 {
    fn from(value: Multiplier) -> Self {
        f64::from(value.0) / 100.0
    }
}

impl TryFrom<f64> for Multiplier {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        let hundredths = (value * 100.0).round();
        if !hundredths.is_finite() || hundredths < 0.0 || hundredths > f64::from(u32::MAX) {
            return Err(format!("invalid multiplier {value}"));
        }
        Ok(Self(hundredths as u32))
    }
}

/// Player commands. Commands carry no identity; they always apply to the
/// current round.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Command {
    Reset,
    Arm { table_id: u32, box_id: u32 },
    #[serde(rename = "buyin")]
    BuyIn { amount: i64 },
    Choose { side: Side },
    Confirm,
}

impl Command {
    /// Upper-case command name, as used in logs and metrics labels.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Reset => "RESET",
            Self::Arm { .. } => "ARM",
            Self::BuyIn { .. } => "BUY_IN",
            Self::Choose { .. } => "CHOOSE",
            Self::Confirm => "CONFIRM",
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reset => write!(f, "reset"),
            Self::Arm { table_id, box_id } => write!(f, "arm table {table_id} box {box_id}"),
            Self::BuyIn { amount } => write!(f, "buy in {amount}"),
            Self::Choose { side } => write!(f, "choose {side}"),
            Self::Confirm => write!(f, "confirm"),
        }
    }
}

/// The authoritative round snapshot. Never mutated in place: every
/// transition produces a new value.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoundState {
    pub round_id: Uuid,
    pub stage: Stage,
    pub stage_started_at_ms: Millis,
    #[serde(default)]
    pub table_id: Option<u32>,
    #[serde(default)]
    pub box_id: Option<u32>,
    #[serde(default)]
    pub bank: Chips,
    #[serde(default)]
    pub step_index: u8,
    #[serde(default)]
    pub compare_index: u8,
    #[serde(default)]
    pub cards: Vec<Card>,
    #[serde(default)]
    pub camera: Camera,
    #[serde(default)]
    pub choice: Option<Side>,
    #[serde(default)]
    pub result_text: Option<String>,
    #[serde(rename = "hiX", default)]
    pub hi_x: Multiplier,
    #[serde(rename = "loX", default)]
    pub lo_x: Multiplier,
    #[serde(rename = "tieX", default)]
    pub tie_x: Multiplier,
}

impl RoundState {
    /// A fresh idle round with a new id.
    #[must_use]
    pub fn idle(now: Millis) -> Self {
        Self {
            round_id: Uuid::new_v4(),
            stage: Stage::Idle,
            stage_started_at_ms: now,
            table_id: None,
            box_id: None,
            bank: 0,
            step_index: 0,
            compare_index: 0,
            cards: Vec::new(),
            camera: Camera::Wide,
            choice: None,
            result_text: None,
            hi_x: Multiplier::ZERO,
            lo_x: Multiplier::ZERO,
            tie_x: Multiplier::ZERO,
        }
    }

    /// Multiplier currently offered for `side`.
    #[must_use]
    pub fn multiplier(&self, side: Side) -> Multiplier {
        match side {
            Side::Hi => self.hi_x,
            Side::Lo => self.lo_x,
            Side::Tie => self.tie_x,
        }
    }

    /// The active comparison pair, if cards are on the table.
    #[must_use]
    pub fn active_pair(&self) -> Option<(Card, Card)> {
        let i = usize::from(self.compare_index);
        Some((*self.cards.get(i)?, *self.cards.get(i + 1)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_card_display_and_parse() {
        let ten = Card(10, Suit::Club);
        assert_eq!(ten.to_string(), "10♣");
        assert_eq!("10♣".parse::<Card>().unwrap(), ten);
        assert_eq!("K♦".parse::<Card>().unwrap(), Card(13, Suit::Diamond));
        assert_eq!("as".parse::<Card>().unwrap(), Card(14, Suit::Spade));
        assert_eq!("7h".parse::<Card>().unwrap(), Card(7, Suit::Heart));
    }

    #[test]
    fn test_card_parse_errors() {
        assert_eq!("".parse::<Card>(), Err(CardParseError::Empty));
        assert!(matches!(
            "7x".parse::<Card>(),
            Err(CardParseError::UnknownSuit(_))
        ));
        assert!(matches!(
            "1♠".parse::<Card>(),
            Err(CardParseError::UnknownRank(_))
        ));
        assert!(matches!(
            "11♠".parse::<Card>(),
            Err(CardParseError::UnknownRank(_))
        ));
    }

    #[test]
    fn test_deck_is_complete() {
        let deck = Deck::default();
        let unique: HashSet<Card> = deck.cards().iter().copied().collect();
        assert_eq!(unique.len(), DECK_SIZE);
        assert!(
            deck.cards()
                .iter()
                .all(|c| (MIN_VALUE..=MAX_VALUE).contains(&c.value()))
        );
    }

    #[test]
    fn test_deck_deals_until_exhausted() {
        let mut deck = Deck::default();
        for _ in 0..DECK_SIZE {
            assert!(deck.deal_card().is_some());
        }
        assert!(deck.deal_card().is_none());
    }

    #[test]
    fn test_shuffled_dealer_deals_distinct_cards() {
        let mut dealer = ShuffledDealer::seeded(7);
        for _ in 0..100 {
            let hand = dealer.deal();
            let unique: HashSet<Card> = hand.iter().copied().collect();
            assert_eq!(unique.len(), HAND_SIZE);
        }
    }

    #[test]
    fn test_multiplier_apply_floors_exactly() {
        assert_eq!(Multiplier::from_hundredths(180).apply(100), 180);
        assert_eq!(Multiplier::from_hundredths(114).apply(180), 205);
        // 1.14 * 100 is 113.99999999999999 in binary floating point
        assert_eq!(Multiplier::from_hundredths(114).apply(100), 114);
        assert_eq!(Multiplier::ZERO.apply(100), 0);
    }

    #[test]
    fn test_multiplier_wire_form() {
        let json = serde_json::to_string(&Multiplier::from_hundredths(1259)).unwrap();
        assert_eq!(json, "12.59");
        let back: Multiplier = serde_json::from_str(&json).unwrap();
        assert_eq!(back.hundredths(), 1259);
        assert!(serde_json::from_str::<Multiplier>("-1.0").is_err());
    }

    #[test]
    fn test_command_wire_tags() {
        let arm = serde_json::to_value(Command::Arm {
            table_id: 1,
            box_id: 3,
        })
        .unwrap();
        assert_eq!(arm, serde_json::json!({"type": "arm", "tableId": 1, "boxId": 3}));

        let buy_in = serde_json::to_value(Command::BuyIn { amount: 100 }).unwrap();
        assert_eq!(buy_in, serde_json::json!({"type": "buyin", "amount": 100}));

        let confirm: Command = serde_json::from_str(r#"{"type":"confirm"}"#).unwrap();
        assert_eq!(confirm, Command::Confirm);

        let choose: Command = serde_json::from_str(r#"{"type":"choose","side":"HI"}"#).unwrap();
        assert_eq!(choose, Command::Choose { side: Side::Hi });
    }

    #[test]
    fn test_round_state_field_names() {
        let state = RoundState::idle(1_000);
        let value = serde_json::to_value(&state).unwrap();
        for field in [
            "roundId",
            "stage",
            "stageStartedAtMs",
            "tableId",
            "boxId",
            "bank",
            "stepIndex",
            "compareIndex",
            "cards",
            "camera",
            "choice",
            "resultText",
            "hiX",
            "loX",
            "tieX",
        ] {
            assert!(value.get(field).is_some(), "missing field {field}");
        }
        assert_eq!(value["stage"], "IDLE");
        assert!(value["choice"].is_null());
    }
}
