//! HTTP/WebSocket API for the Hi-Lo host.
//!
//! # Endpoints Overview
//!
//! ```text
//! GET /ws                        - WebSocket: state pushes, hello and cmd frames
//! GET /status                    - Current round JSON
//! GET /health                    - Liveness and table counters
//! GET /cmd/reset                 - RESET
//! GET /cmd/arm?table=1&box=1     - ARM (both default to 1)
//! GET /cmd/buyin?amount=100      - BUY_IN (amount defaults to 100)
//! GET /cmd/choose?side=HI        - CHOOSE (HI, LO, anything else is TIE)
//! GET /cmd/confirm               - CONFIRM
//! ```
//!
//! The `/cmd/*` routes exist for manual testing from a browser or `curl`.
//!
//! # CORS
//!
//! CORS is permissive: displays are typically served from another origin
//! on the same LAN.

pub mod commands;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::get,
};
use hilo::table::TableHandle;
use serde_json::json;
use tower_http::cors::CorsLayer;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the single table actor
    pub table: TableHandle,
}

/// Create the complete API router with all endpoints and middleware.
///
/// # Example
///
/// ```rust,no_run
/// # use hilo_host::api::{create_router, AppState};
/// # use hilo::{TableActor, TableConfig};
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let table = TableActor::spawn(TableConfig::default());
/// let app = create_router(AppState { table });
/// let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
/// axum::serve(listener, app).await?;
/// # Ok(())
/// # }
/// ```
pub fn create_router(state: AppState) -> Router {
    let command_routes = Router::new()
        .route("/reset", get(commands::reset))
        .route("/arm", get(commands::arm))
        .route("/buyin", get(commands::buy_in))
        .route("/choose", get(commands::choose))
        .route("/confirm", get(commands::confirm));

    Router::new()
        .route("/health", get(health_check))
        .route("/status", get(commands::status))
        .route("/ws", get(websocket::websocket_handler))
        .nest("/cmd", command_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring.
///
/// Returns `200 OK` while the table actor answers, `503 Service Unavailable`
/// once it has stopped.
///
/// # Example
///
/// ```bash
/// curl http://localhost:8080/health
/// # {"status":"healthy","version":"0.1.0","subscribers":2,"stage":"CHOOSING",...}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.table.stats().await {
        Ok(stats) => {
            crate::metrics::table_stats(&stats);
            let response = json!({
                "status": "healthy",
                "version": env!("CARGO_PKG_VERSION"),
                "subscribers": stats.subscribers,
                "stage": stats.stage,
                "roundId": stats.round_id,
                "roundsFinished": stats.rounds_finished,
                "droppedDeliveries": stats.dropped_deliveries,
                "timestamp": chrono::Utc::now().to_rfc3339(),
            });
            (StatusCode::OK, Json(response))
        }
        Err(_) => {
            let response = json!({
                "status": "unhealthy",
                "version": env!("CARGO_PKG_VERSION"),
                "timestamp": chrono::Utc::now().to_rfc3339(),
            });
            (StatusCode::SERVICE_UNAVAILABLE, Json(response))
        }
    }
}
