use std::time::Instant;

use axum::{
    extract::{Query, Request},
    http::StatusCode,
    middleware::Next,
    response::Response,
};
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use crate::http::sse::{SessionQuery, SESSION_HEADER};

pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

/// Session id a side-channel submission is addressed to, from the query or header.
fn submission_session(request: &Request) -> Option<String> {
    let from_query = Query::<SessionQuery>::try_from_uri(request.uri())
        .ok()
        .and_then(|Query(query)| query.session);

    from_query.or_else(|| {
        request
            .headers()
            .get(SESSION_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
    })
}

pub async fn request_logging_middleware(request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let session = submission_session(&request).unwrap_or_default();
    let started_at = Instant::now();

    let response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = started_at.elapsed().as_millis();

    info!(
        method = %method,
        path = %path,
        status = status.as_u16(),
        duration_ms = elapsed_ms,
        "request summary"
    );

    match status {
        StatusCode::NOT_FOUND if path == "/sse" => {
            warn!(method = %method, session = %session, "submission for unknown session");
        }
        StatusCode::BAD_REQUEST if path == "/sse" => {
            warn!(method = %method, session = %session, "submission body rejected");
        }
        _ => {}
    }

    response
}
