//! Metadata endpoints: liveness and MCP discovery

use axum::Json;
use serde::Serialize;

use crate::domain::tools::build_tools_list;
use crate::mcp::server::SUPPORTED_PROTOCOL_VERSION;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Where and how a client can open a session.
#[derive(Debug, Serialize)]
pub struct DiscoveryResponse {
    pub name: &'static str,
    pub version: &'static str,
    pub protocol_version: &'static str,
    pub mcp_endpoint: &'static str,
    pub websocket_subprotocol: &'static str,
    pub sse_endpoint: &'static str,
    pub tools: Vec<String>,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse { status: "ok" })
}

pub async fn discovery() -> Json<DiscoveryResponse> {
    Json(DiscoveryResponse {
        name: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        protocol_version: SUPPORTED_PROTOCOL_VERSION,
        mcp_endpoint: "/mcp",
        websocket_subprotocol: super::websocket::WS_SUBPROTOCOL,
        sse_endpoint: "/sse",
        tools: build_tools_list().into_iter().map(|tool| tool.name).collect(),
    })
}
