//! The central Model Context Protocol engine
//!
//! Routes a parsed request envelope to its method handler (`initialize`,
//! `tools/list`, `tools/call`, `ping`) and formats the response envelope.
//! Every handler runs behind a guard that turns failures and panics into
//! `-32000` errors so a misbehaving call never tears down its session.

use std::{any::Any, panic::AssertUnwindSafe};

use chrono::{SecondsFormat, Utc};
use futures::FutureExt;
use rust_mcp_sdk::schema::{
    Implementation, InitializeResult, ListToolsResult, ProtocolVersion, ServerCapabilities,
    ServerCapabilitiesPrompts, ServerCapabilitiesResources, ServerCapabilitiesTools,
};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::tools::{build_tools_list, handle_tools_call};
use crate::mcp::rpc::{
    json_rpc_error, json_rpc_result, notification, RequestEnvelope, INTERNAL_ERROR,
    METHOD_NOT_FOUND,
};
use crate::{errors::AppError, AppState};

pub const SUPPORTED_PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Error)]
enum DispatchError {
    #[error("Method not found: {0}")]
    MethodNotFound(String),
    #[error(transparent)]
    App(#[from] AppError),
    #[error("{0}")]
    Panicked(String),
}

impl DispatchError {
    fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound(_) => METHOD_NOT_FOUND,
            Self::App(_) | Self::Panicked(_) => INTERNAL_ERROR,
        }
    }
}

/// Informational notification pushed when a session opens.
pub fn ready_notification() -> Value {
    notification("notifications/ready", json!({ "now": now_rfc3339() }))
}

/// Handles one request; returns the response envelope, or `None` for notifications.
pub async fn handle_json_rpc_request(state: &AppState, request: RequestEnvelope) -> Option<Value> {
    let is_notification = request.is_notification();
    let RequestEnvelope {
        id, method, params, ..
    } = request;
    let params = match params {
        Some(Value::Object(params)) => params,
        _ => Map::new(),
    };

    let outcome = AssertUnwindSafe(dispatch_method(state, &method, &params))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| Err(DispatchError::Panicked(panic_message(panic.as_ref()))));

    match &outcome {
        Ok(_) => info!(method = %method, is_notification, outcome = "success", "mcp action audited"),
        Err(err) => warn!(
            method = %method,
            is_notification,
            outcome = "failure",
            error = %err,
            "mcp action audited"
        ),
    }

    let Some(id) = id else {
        debug!(method = %method, "notification handled without reply");
        return None;
    };

    Some(match outcome {
        Ok(result) => json_rpc_result(id, result),
        Err(err) => json_rpc_error(id, err.code(), &err.to_string()),
    })
}

async fn dispatch_method(
    state: &AppState,
    method: &str,
    params: &Map<String, Value>,
) -> Result<Value, DispatchError> {
    match method {
        "initialize" => Ok(initialize_result(params)?),
        "tools/list" => Ok(tools_list_result()?),
        "tools/call" => Ok(handle_tools_call(state, params).await?),
        "ping" => Ok(json!({
            "pong": "ok",
            "at": now_rfc3339(),
        })),
        other => Err(DispatchError::MethodNotFound(other.to_string())),
    }
}

fn initialize_result(params: &Map<String, Value>) -> Result<Value, AppError> {
    if let Some(offered) = params.get("protocolVersion").and_then(Value::as_str) {
        if offered != SUPPORTED_PROTOCOL_VERSION {
            debug!(offered = %offered, "client offered a different protocol version");
        }
    }

    let initialize_result = InitializeResult {
        server_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            title: None,
            description: None,
            icons: vec![],
            website_url: None,
        },
        capabilities: ServerCapabilities {
            tools: Some(ServerCapabilitiesTools { list_changed: None }),
            resources: Some(ServerCapabilitiesResources {
                subscribe: None,
                list_changed: None,
            }),
            prompts: Some(ServerCapabilitiesPrompts { list_changed: None }),
            ..Default::default()
        },
        protocol_version: ProtocolVersion::V2024_11_05.into(),
        instructions: None,
        meta: None,
    };

    serde_json::to_value(initialize_result)
        .map_err(|err| AppError::internal(format!("failed to serialize initialize result: {err}")))
}

fn tools_list_result() -> Result<Value, AppError> {
    serde_json::to_value(ListToolsResult {
        meta: None,
        next_cursor: None,
        tools: build_tools_list(),
    })
    .map_err(|err| AppError::internal(format!("failed to serialize tools list: {err}")))
}

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "Internal error".to_string()
    }
}
