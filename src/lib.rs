use std::{sync::Arc, time::Duration};

use axum::{middleware, routing::get, Router};

pub mod config;
pub mod domain;
pub mod errors;
pub mod http;
pub mod logging;
pub mod mcp;
pub mod session;
pub mod sleeper_client;

#[cfg(test)]
mod test_support;

use session::SessionRegistry;
use sleeper_client::LeagueProvider;

#[derive(Clone)]
pub struct AppState {
    pub default_league_id: Arc<str>,
    pub provider: Arc<dyn LeagueProvider>,
    pub sessions: Arc<SessionRegistry>,
    pub heartbeat_interval: Duration,
}

impl AppState {
    pub fn new(
        default_league_id: String,
        provider: Arc<dyn LeagueProvider>,
        heartbeat_interval: Duration,
    ) -> Self {
        Self {
            default_league_id: Arc::<str>::from(default_league_id),
            provider,
            sessions: Arc::new(SessionRegistry::new()),
            heartbeat_interval,
        }
    }
}

pub fn build_app(state: AppState) -> Router {
    Router::new()
        .route("/health", get(http::handlers::health))
        .route("/.well-known/mcp", get(http::handlers::discovery))
        .route("/mcp", get(http::websocket::mcp_websocket))
        .route(
            "/sse",
            get(http::sse::open_stream)
                .post(http::sse::submit)
                .options(http::sse::preflight),
        )
        .layer(middleware::from_fn(logging::request_logging_middleware))
        .with_state(state)
}
