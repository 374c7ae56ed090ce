//! API middleware — request logging.

use std::time::Instant;

use axum::{
    body::Body,
    extract::{MatchedPath, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};

/// Coarse outcome bucket for a response status.
pub fn status_class(status: StatusCode) -> &'static str {
    match status.as_u16() {
        200..=299 => "ok",
        400..=499 => "client_error",
        500..=599 => "server_error",
        _ => "other",
    }
}

/// Logs one line per request, keyed by the matched route rather than the raw
/// URI. Server errors are logged at `warn`.
pub async fn logging_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let route = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "<unmatched>".to_string());
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status();
    let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;
    if status.is_server_error() {
        warn!(%method, %route, status = status.as_u16(), class = status_class(status), elapsed_ms, "Request failed");
    } else {
        info!(%method, %route, status = status.as_u16(), class = status_class(status), elapsed_ms, "Request handled");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_class() {
        assert_eq!(status_class(StatusCode::OK), "ok");
        assert_eq!(status_class(StatusCode::BAD_REQUEST), "client_error");
        assert_eq!(status_class(StatusCode::INTERNAL_SERVER_ERROR), "server_error");
        assert_eq!(status_class(StatusCode::SWITCHING_PROTOCOLS), "other");
    }
}
