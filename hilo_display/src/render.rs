//! Plain-text rendering of a round, for terminals and logs.

use hilo::{RoundState, Stage, round::Camera};
use std::fmt;

/// Wraps a snapshot so it can be printed with `{}`.
///
/// Cards after the active one stay face down until the round finishes.
/// The active pair is bracketed while the camera is zoomed in.
pub struct Render<'a>(pub &'a RoundState);

impl fmt::Display for Render<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.0;
        let rule = "═".repeat(48);

        writeln!(f, "{rule}")?;
        writeln!(f, "HI-LO  {}  round {}", state.stage, state.round_id)?;
        writeln!(f, "{rule}")?;

        match (state.table_id, state.box_id) {
            (Some(table_id), Some(box_id)) => writeln!(f, "Table {table_id}  Box {box_id}")?,
            _ => writeln!(f, "No box armed")?,
        }
        writeln!(f, "Bank: {}", state.bank)?;

        if !state.cards.is_empty() {
            let active = usize::from(state.compare_index);
            let zoomed = state.camera == Camera::Compare;
            let mut row = Vec::with_capacity(state.cards.len());
            for (i, card) in state.cards.iter().enumerate() {
                let face = if state.stage == Stage::Finish || i <= active {
                    card.to_string()
                } else {
                    "??".to_string()
                };
                if zoomed && (i == active || i == active + 1) {
                    row.push(format!("[{face}]"));
                } else {
                    row.push(face);
                }
            }
            writeln!(f, "Cards: {}", row.join(" "))?;
        }

        if matches!(state.stage, Stage::Choosing | Stage::Confirming) {
            write!(f, "HI x{}  LO x{}", state.hi_x, state.lo_x)?;
            if !state.tie_x.is_zero() {
                write!(f, "  TIE x{}", state.tie_x)?;
            }
            writeln!(f)?;
        }

        if let Some(side) = state.choice {
            writeln!(f, "Choice: {side}")?;
        }

        if let Some(text) = &state.result_text {
            writeln!(f, "{text}")?;
        }

        write!(f, "{rule}")
    }
}
