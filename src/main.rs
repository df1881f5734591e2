use std::sync::Arc;

use sleeper_mcp::{
    build_app, config::Config, logging, sleeper_client::HttpSleeperClient, AppState,
};
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    let config = Config::from_env()?;

    let provider = Arc::new(HttpSleeperClient::new(config.sleeper_api_base.clone())?);
    let bind_socket = config.bind_socket()?;
    let state = AppState::new(
        config.default_league_id.clone(),
        provider,
        config.heartbeat_interval,
    );
    let app = build_app(state);
    let listener = tokio::net::TcpListener::bind(bind_socket).await?;

    info!(
        bind_addr = %config.bind_addr,
        bind_port = config.bind_port,
        sleeper_api_base = %config.sleeper_api_base,
        "server starting"
    );

    axum::serve(listener, app.into_make_service()).await?;
    Ok(())
}
