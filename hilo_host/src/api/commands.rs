//! Pull endpoints and manual command routes.
//!
//! `/status` returns the current round. The `/cmd/*` routes apply a command
//! exactly as if it had arrived over the WebSocket and answer with whatever
//! state is current afterwards; rejected commands are not errors.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use hilo::{
    Command, RoundState, Side, Stage,
    table::{ApplyOutcome, TableError, TableHandle},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use super::{AppState, request_id::RequestId};
use crate::metrics;

/// Forward a command to the table and record the outcome.
pub(crate) async fn dispatch(
    table: &TableHandle,
    command: Command,
    round_id: Option<Uuid>,
) -> Result<ApplyOutcome, TableError> {
    let kind = command.kind();
    let outcome = table.apply_for_round(command, round_id).await?;
    match &outcome {
        ApplyOutcome::Applied(state) => {
            metrics::commands_total(kind, "applied");
            if state.stage == Stage::Finish {
                metrics::rounds_finished_total();
            }
        }
        ApplyOutcome::Rejected { reason, .. } => {
            metrics::commands_total(kind, "rejected");
            tracing::debug!(command = kind, %reason, "Command rejected");
        }
        ApplyOutcome::Stale { .. } => {
            metrics::commands_total(kind, "stale");
            tracing::debug!(command = kind, round_id = ?round_id, "Command for stale round dropped");
        }
    }
    Ok(outcome)
}

fn table_closed() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "error": "table is closed" })),
    )
        .into_response()
}

async fn respond(state: &AppState, request_id: RequestId, command: Command) -> Response {
    tracing::info!(request_id = %request_id.as_str(), command = %command, "HTTP command");
    match dispatch(&state.table, command, None).await {
        Ok(outcome) => Json(outcome.into_state()).into_response(),
        Err(_) => table_closed(),
    }
}

/// Current round snapshot.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/status
/// # {"roundId":"...","stage":"IDLE","stageStartedAtMs":1700000000000,...}
/// ```
pub async fn status(State(state): State<AppState>) -> Response {
    match state.table.state().await {
        Ok(snapshot) => Json::<RoundState>(snapshot).into_response(),
        Err(_) => table_closed(),
    }
}

pub async fn reset(State(state): State<AppState>, request_id: RequestId) -> Response {
    respond(&state, request_id, Command::Reset).await
}

#[derive(Debug, Deserialize)]
pub struct ArmQuery {
    table: Option<u32>,
    #[serde(rename = "box")]
    box_id: Option<u32>,
}

/// `GET /cmd/arm?table=1&box=3`; both default to 1.
pub async fn arm(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(query): Query<ArmQuery>,
) -> Response {
    let command = Command::Arm {
        table_id: query.table.unwrap_or(1),
        box_id: query.box_id.unwrap_or(1),
    };
    respond(&state, request_id, command).await
}

#[derive(Debug, Deserialize)]
pub struct BuyInQuery {
    amount: Option<i64>,
}

/// `GET /cmd/buyin?amount=100`; amount defaults to 100.
pub async fn buy_in(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(query): Query<BuyInQuery>,
) -> Response {
    let command = Command::BuyIn {
        amount: query.amount.unwrap_or(100),
    };
    respond(&state, request_id, command).await
}

#[derive(Debug, Deserialize)]
pub struct ChooseQuery {
    side: Option<String>,
}

/// HI and LO by name, case-insensitive; anything else, including nothing,
/// picks TIE.
fn parse_side(side: Option<&str>) -> Side {
    match side {
        Some(s) if s.eq_ignore_ascii_case("HI") => Side::Hi,
        Some(s) if s.eq_ignore_ascii_case("LO") => Side::Lo,
        _ => Side::Tie,
    }
}

/// `GET /cmd/choose?side=HI`
pub async fn choose(
    State(state): State<AppState>,
    request_id: RequestId,
    Query(query): Query<ChooseQuery>,
) -> Response {
    let command = Command::Choose {
        side: parse_side(query.side.as_deref()),
    };
    respond(&state, request_id, command).await
}

pub async fn confirm(State(state): State<AppState>, request_id: RequestId) -> Response {
    respond(&state, request_id, Command::Confirm).await
}
