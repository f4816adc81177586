//! Hi-Lo round state machine.
//!
//! [`transition`] is a pure function from the current snapshot and a command
//! to the next snapshot. Every guard failure is reported as a [`RoundError`]
//! and leaves the caller's state untouched; [`RoundEngine`] wraps the
//! function and only ever replaces its state with a successful result.

use std::fmt;

use thiserror::Error;

use super::constants::{
    DEFAULT_FINISH_TIMEOUT_MS, HAND_SIZE, LAST_COMPARE_INDEX, RESULT_GET_READY, RESULT_LOSS,
};
use super::entities::{
    Camera, Chips, Command, Dealer, Millis, RoundState, ShuffledDealer, Side, Stage,
};
use super::payouts::{Odds, odds_for, side_wins};

/// Reasons a command was not applied. These never reach the sender; they
/// exist so the owner of the engine can log why a command was ignored.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum RoundError {
    #[error("{command} not allowed while {stage}")]
    WrongStage { stage: Stage, command: &'static str },
    #[error("table and box are not armed")]
    NotArmed,
    #[error("no cards on the table")]
    NoCards,
    #[error("{side} pays nothing on this pair")]
    ForbiddenSide { side: Side },
    #[error("no side chosen")]
    NoChoice,
    #[error("no comparison pair left at index {0}")]
    NoPairLeft(u8),
}

/// Rule knobs for a table.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RoundRules {
    /// Time a finished round stays up before the tick resets it.
    pub finish_timeout_ms: Millis,
    /// Offer TIE as a third side.
    pub tie_enabled: bool,
}

impl Default for RoundRules {
    fn default() -> Self {
        Self {
            finish_timeout_ms: DEFAULT_FINISH_TIMEOUT_MS,
            tie_enabled: false,
        }
    }
}

fn with_odds(state: RoundState, odds: Odds) -> RoundState {
    RoundState {
        hi_x: odds.hi,
        lo_x: odds.lo,
        tie_x: odds.tie,
        ..state
    }
}

/// Computes the state that follows `command`.
///
/// # Errors
///
/// Returns the guard that rejected the command. The input state is never
/// modified.
pub fn transition(
    state: &RoundState,
    command: &Command,
    now: Millis,
    dealer: &mut dyn Dealer,
    rules: &RoundRules,
) -> Result<RoundState, RoundError> {
    let wrong_stage = || RoundError::WrongStage {
        stage: state.stage,
        command: command.kind(),
    };

    match (state.stage, command) {
        (Stage::Idle | Stage::Finish, Command::Reset) => Ok(RoundState::idle(now)),

        (Stage::Idle, Command::Arm { table_id, box_id }) => Ok(RoundState {
            stage: Stage::Armed,
            stage_started_at_ms: now,
            table_id: Some(*table_id),
            box_id: Some(*box_id),
            bank: 0,
            result_text: Some(RESULT_GET_READY.to_string()),
            ..RoundState::idle_with_id(state.round_id, now)
        }),

        (Stage::Armed, Command::BuyIn { amount }) => {
            if state.table_id.is_none() || state.box_id.is_none() {
                return Err(RoundError::NotArmed);
            }
            let cards = dealer.deal().to_vec();
            let odds = odds_for(&cards, 0, rules.tie_enabled);
            Ok(with_odds(
                RoundState {
                    stage: Stage::Choosing,
                    stage_started_at_ms: now,
                    bank: u64::try_from(*amount).unwrap_or(0),
                    step_index: 0,
                    compare_index: 0,
                    cards,
                    camera: Camera::Wide,
                    choice: None,
                    result_text: None,
                    ..state.clone()
                },
                odds,
            ))
        }

        (Stage::Choosing | Stage::Confirming, Command::Choose { side }) => {
            choose(state, *side, now)
        }

        (Stage::Confirming, Command::Confirm) => confirm(state, now, rules),

        _ => Err(wrong_stage()),
    }
}

fn choose(state: &RoundState, side: Side, now: Millis) -> Result<RoundState, RoundError> {
    if state.cards.len() != HAND_SIZE {
        return Err(RoundError::NoCards);
    }
    if state.multiplier(side).is_zero() {
        return Err(RoundError::ForbiddenSide { side });
    }
    Ok(RoundState {
        stage: Stage::Confirming,
        stage_started_at_ms: now,
        choice: Some(side),
        camera: Camera::Compare,
        result_text: None,
        ..state.clone()
    })
}

fn confirm(state: &RoundState, now: Millis, rules: &RoundRules) -> Result<RoundState, RoundError> {
    let side = state.choice.ok_or(RoundError::NoChoice)?;
    let index = state.compare_index;
    if index > LAST_COMPARE_INDEX {
        return Err(RoundError::NoPairLeft(index));
    }
    let (current, next) = state.active_pair().ok_or(RoundError::NoPairLeft(index))?;
    let multiplier = state.multiplier(side);
    if multiplier.is_zero() {
        return Err(RoundError::ForbiddenSide { side });
    }

    let finished = |bank: Chips, result_text: String| {
        with_odds(
            RoundState {
                stage: Stage::Finish,
                stage_started_at_ms: now,
                bank,
                camera: Camera::Wide,
                choice: None,
                result_text: Some(result_text),
                ..state.clone()
            },
            Odds::default(),
        )
    };

    if !side_wins(side, current, next) {
        return Ok(finished(0, RESULT_LOSS.to_string()));
    }

    let bank = multiplier.apply(state.bank);
    // A win worth nothing (zero buy-in) ends the round like a loss.
    if bank == 0 {
        return Ok(finished(0, RESULT_LOSS.to_string()));
    }
    if index == LAST_COMPARE_INDEX {
        return Ok(finished(bank, format!("CONGRATULATIONS! YOU WON {bank}")));
    }

    let next_index = index + 1;
    let odds = odds_for(&state.cards, usize::from(next_index), rules.tie_enabled);
    Ok(with_odds(
        RoundState {
            stage: Stage::Choosing,
            stage_started_at_ms: now,
            bank,
            step_index: next_index,
            compare_index: next_index,
            camera: Camera::Wide,
            choice: None,
            result_text: None,
            ..state.clone()
        },
        odds,
    ))
}

/// Time-based transition: a finished round returns to a fresh IDLE once
/// `finish_timeout_ms` has elapsed. `None` means nothing to do.
#[must_use]
pub fn expire(state: &RoundState, now: Millis, rules: &RoundRules) -> Option<RoundState> {
    let elapsed = now.saturating_sub(state.stage_started_at_ms);
    (state.stage == Stage::Finish && elapsed >= rules.finish_timeout_ms)
        .then(|| RoundState::idle(now))
}

impl RoundState {
    fn idle_with_id(round_id: uuid::Uuid, now: Millis) -> Self {
        Self {
            round_id,
            ..Self::idle(now)
        }
    }
}

/// Owner of the current round. Holds the only live copy of the state and
/// hands out snapshots.
pub struct RoundEngine {
    state: RoundState,
    rules: RoundRules,
    dealer: Box<dyn Dealer>,
}

impl fmt::Debug for RoundEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoundEngine")
            .field("state", &self.state)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl RoundEngine {
    /// Engine with a shuffling dealer, starting in IDLE.
    #[must_use]
    pub fn new(rules: RoundRules, now: Millis) -> Self {
        Self::with_dealer(rules, ShuffledDealer::new(), now)
    }

    #[must_use]
    pub fn with_dealer(rules: RoundRules, dealer: impl Dealer + 'static, now: Millis) -> Self {
        Self {
            state: RoundState::idle(now),
            rules,
            dealer: Box::new(dealer),
        }
    }

    #[must_use]
    pub fn state(&self) -> &RoundState {
        &self.state
    }

    #[must_use]
    pub fn snapshot(&self) -> RoundState {
        self.state.clone()
    }

    #[must_use]
    pub fn rules(&self) -> &RoundRules {
        &self.rules
    }

    /// Applies `command` to the current round.
    ///
    /// # Errors
    ///
    /// Returns why the command was rejected; the current state is unchanged.
    pub fn apply(&mut self, command: &Command, now: Millis) -> Result<&RoundState, RoundError> {
        self.state = transition(&self.state, command, now, self.dealer.as_mut(), &self.rules)?;
        Ok(&self.state)
    }

    /// Runs the finish timeout. Returns whether the state changed.
    pub fn tick(&mut self, now: Millis) -> bool {
        match expire(&self.state, now, &self.rules) {
            Some(next) => {
                self.state = next;
                true
            }
            None => false,
        }
    }
}
