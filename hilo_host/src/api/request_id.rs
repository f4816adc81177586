//! Per-request ids, access logging and HTTP metrics.
//!
//! Every request carries an id: the caller's `x-request-id` when it looks
//! sane, a fresh UUID otherwise. The id is echoed on the response and is
//! available to handlers through the [`RequestId`] extractor, so a `/cmd/*`
//! call can be matched to the table log lines it caused.

use std::{convert::Infallible, fmt, time::Instant};

use axum::{
    extract::{FromRequestParts, Request},
    http::{HeaderMap, HeaderValue, request::Parts},
    middleware::Next,
    response::Response,
};
use uuid::Uuid;

use crate::{logging, metrics};

/// Header name for request ID
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Longest caller-supplied id that is kept as is.
const MAX_REQUEST_ID_LEN: usize = 128;

/// Id of the request being served.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequestId(String);

impl RequestId {
    /// Reuse the caller's id when it is short printable ASCII, otherwise
    /// mint a new one.
    pub fn from_headers(headers: &HeaderMap) -> Self {
        headers
            .get(REQUEST_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .filter(|id| {
                !id.is_empty()
                    && id.len() <= MAX_REQUEST_ID_LEN
                    && id.bytes().all(|b| b.is_ascii_graphic())
            })
            .map(|id| Self(id.to_string()))
            .unwrap_or_else(Self::generate)
    }

    fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Handlers outside [`request_id_middleware`] get a fresh id instead of a
/// rejection.
impl<S> FromRequestParts<S> for RequestId
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts
            .extensions
            .get::<RequestId>()
            .cloned()
            .unwrap_or_else(RequestId::generate))
    }
}

/// Tag the request with an id, echo it on the response, and record the
/// request in the access log and HTTP metrics.
///
/// # Example
///
/// ```no_run
/// use axum::{Router, routing::get, middleware};
/// use hilo_host::api::request_id::request_id_middleware;
///
/// let app: Router = Router::new()
///     .route("/status", get(|| async { "IDLE" }))
///     .layer(middleware::from_fn(request_id_middleware));
/// ```
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = RequestId::from_headers(request.headers());
    request.extensions_mut().insert(id.clone());

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let started = Instant::now();

    let mut response = next.run(request).await;
    if let Ok(value) = HeaderValue::from_str(id.as_str()) {
        response.headers_mut().insert(REQUEST_ID_HEADER, value);
    }

    let status = response.status();
    // WebSocket upgrades answer 101 and live on; only the handshake is logged.
    tracing::info!(request_id = %id, method = %method, path = %path, status = %status, "HTTP request");
    metrics::http_requests_total(method.as_str(), &path, status.as_u16());
    logging::log_performance(&path, started.elapsed().as_millis() as u64);

    response
}
