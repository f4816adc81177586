//! WebSocket handler for live round updates.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws`
//! 2. The connection subscribes to the table and immediately receives the
//!    current state
//! 3. Two tasks run until either side ends:
//!    - Send task: pushes every new state the table publishes
//!    - Receive task: decodes client frames and forwards commands
//! 4. On disconnect the subscription is removed
//!
//! Client frames that fail to decode, `state` frames, and binary frames
//! are dropped; the connection stays open. Nothing is ever sent back in
//! reply to a command other than the resulting state broadcast.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:8080/ws');
//!
//! ws.onmessage = (event) => {
//!   const msg = JSON.parse(event.data);
//!   if (msg.type === "state") render(msg.state);
//! };
//!
//! ws.send(JSON.stringify({ type: "hello", role: "DISPLAY", deviceId: "tablet-1" }));
//! ws.send(JSON.stringify({ type: "cmd", cmd: { type: "choose", side: "HI" } }));
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use hilo::{
    RoundState, WsMessage,
    net::utils::{MAX_MESSAGE_SIZE, decode, encode},
    table::{SubscriberId, Subscription, TableHandle},
};

use super::{AppState, commands::dispatch};
use crate::metrics;

/// Frames above this close the connection outright; frames between
/// [`MAX_MESSAGE_SIZE`] and this are read and then dropped.
const HARD_FRAME_LIMIT: usize = 16 * MAX_MESSAGE_SIZE;

/// Upgrade HTTP connection to WebSocket.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.max_message_size(HARD_FRAME_LIMIT)
        .max_frame_size(HARD_FRAME_LIMIT)
        .on_upgrade(move |socket| handle_socket(socket, state))
}

async fn send_state(
    sender: &mut SplitSink<WebSocket, Message>,
    state: RoundState,
) -> Result<(), axum::Error> {
    let text = match encode(&WsMessage::state(state)) {
        Ok(text) => text,
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode state");
            return Ok(());
        }
    };
    sender.send(Message::Text(text.into())).await?;
    metrics::websocket_messages_sent();
    Ok(())
}

/// Handle one inbound text frame.
async fn handle_text(table: &TableHandle, connection: SubscriberId, text: &str) {
    metrics::websocket_messages_received();
    match decode(text) {
        Ok(WsMessage::Hello {
            role,
            device_id,
            table_id,
        }) => {
            tracing::info!(
                connection = %connection,
                role = %role,
                device_id = %device_id,
                table_id = ?table_id,
                "Client hello"
            );
        }
        Ok(WsMessage::Cmd { round_id, cmd }) => {
            tracing::debug!(connection = %connection, command = %cmd, "Command received");
            if dispatch(table, cmd, round_id).await.is_err() {
                tracing::debug!(connection = %connection, "Table closed while forwarding command");
            }
        }
        Ok(WsMessage::State { .. }) => {
            tracing::debug!(connection = %connection, "Ignoring state sent by client");
        }
        Err(e) => {
            metrics::websocket_messages_malformed();
            tracing::warn!(connection = %connection, error = %e, "Dropping malformed frame");
        }
    }
}

/// Handle an established WebSocket connection.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let Subscription {
        id,
        initial,
        mut receiver,
    } = match state.table.subscribe().await {
        Ok(subscription) => subscription,
        Err(e) => {
            tracing::warn!(error = %e, "Refusing WebSocket: table unavailable");
            return;
        }
    };

    let (mut sender, mut inbound) = socket.split();
    metrics::websocket_connection_opened();
    tracing::info!(connection = %id, "WebSocket connected");

    let mut send_task = tokio::spawn(async move {
        if send_state(&mut sender, initial).await.is_err() {
            return;
        }
        while let Some(state) = receiver.recv().await {
            if send_state(&mut sender, state).await.is_err() {
                return;
            }
        }
        // The table stopped; tell the client before dropping the socket.
        let _ = sender.send(Message::Close(None)).await;
    });

    let table = state.table.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(message) = inbound.next().await {
            match message {
                Ok(Message::Text(text)) => handle_text(&table, id, text.as_str()).await,
                Ok(Message::Close(_)) => break,
                Ok(Message::Binary(_)) => {
                    metrics::websocket_messages_malformed();
                    tracing::debug!(connection = %id, "Dropping binary frame");
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(connection = %id, error = %e, "WebSocket error");
                    break;
                }
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let _ = state.table.unsubscribe(id).await;
    metrics::websocket_connection_closed();
    tracing::info!(connection = %id, "WebSocket disconnected");
}
