//! Tools exposed via Model Context Protocol
//!
//! Provides `league_info`, `matchups` and `player_search`, each backed by the
//! `LeagueProvider` upstream. Validation problems and unknown tool names are
//! tool-level failures (`isError: true`); provider failures propagate as
//! `AppError` so the dispatcher reports them as protocol errors.

use rust_mcp_sdk::{
    macros,
    schema::{CallToolResult, ContentBlock, TextContent, Tool},
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::domain::utils::{
    coerce_number, coerce_string, normalize_query, normalize_search_limit, normalize_week,
    search_players, week_value,
};
use crate::{errors::AppError, AppState};

#[macros::mcp_tool(
    name = "league_info",
    description = "Get basic Sleeper league info (name, season, total rosters)."
)]
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, macros::JsonSchema)]
pub struct LeagueInfoTool {
    /// Sleeper league id
    #[serde(rename = "leagueId")]
    pub league_id: Option<String>,
}

#[macros::mcp_tool(
    name = "matchups",
    description = "Get matchups for a given league and week."
)]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, macros::JsonSchema)]
pub struct MatchupsTool {
    /// Sleeper league id
    #[serde(rename = "leagueId")]
    pub league_id: Option<String>,
    /// NFL week (1-18)
    pub week: f64,
}

#[macros::mcp_tool(
    name = "player_search",
    description = "Search NFL players by substring. Returns basic info and optional PPR projection if available."
)]
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, macros::JsonSchema)]
pub struct PlayerSearchTool {
    /// Substring of player name
    pub query: String,
    /// Max results (default 20)
    pub limit: Option<f64>,
}

/// A `tools/call` request resolved to its typed arguments.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolCall {
    LeagueInfo(LeagueInfoTool),
    Matchups(MatchupsTool),
    PlayerSearch(PlayerSearchTool),
    Unknown(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolFailure {
    #[error("Invalid 'week' value")]
    InvalidWeek,
    #[error("Missing 'query'")]
    MissingQuery,
    #[error("Unknown tool: {0}")]
    UnknownTool(String),
}

impl ToolCall {
    pub fn parse(name: &str, arguments: &Map<String, Value>) -> Result<Self, ToolFailure> {
        let league_id = arguments.get("leagueId").and_then(coerce_string);

        let call = match name {
            "league_info" => Self::LeagueInfo(LeagueInfoTool { league_id }),
            "matchups" => Self::Matchups(MatchupsTool {
                league_id,
                week: normalize_week(arguments.get("week")).ok_or(ToolFailure::InvalidWeek)?,
            }),
            "player_search" => Self::PlayerSearch(PlayerSearchTool {
                query: normalize_query(arguments.get("query")).ok_or(ToolFailure::MissingQuery)?,
                limit: coerce_number(arguments.get("limit")),
            }),
            other => Self::Unknown(other.to_string()),
        };

        Ok(call)
    }
}

/// Fixed tool catalog, in a stable order.
pub fn build_tools_list() -> Vec<Tool> {
    vec![
        LeagueInfoTool::tool(),
        MatchupsTool::tool(),
        PlayerSearchTool::tool(),
    ]
}

pub async fn call_tool(
    state: &AppState,
    name: &str,
    arguments: &Map<String, Value>,
) -> Result<CallToolResult, AppError> {
    let call = match ToolCall::parse(name, arguments) {
        Ok(call) => call,
        Err(failure) => {
            debug!(tool = %name, failure = %failure, "tool arguments rejected");
            return Ok(tool_failure(&failure));
        }
    };

    let payload = match call {
        ToolCall::LeagueInfo(tool) => league_info(state, tool).await?,
        ToolCall::Matchups(tool) => matchups(state, tool).await?,
        ToolCall::PlayerSearch(tool) => player_search(state, tool).await?,
        ToolCall::Unknown(name) => return Ok(tool_failure(&ToolFailure::UnknownTool(name))),
    };

    Ok(tool_success(payload))
}

/// Extracts `name`/`arguments` from `tools/call` params and runs the tool.
pub async fn handle_tools_call(
    state: &AppState,
    params: &Map<String, Value>,
) -> Result<Value, AppError> {
    let name = params
        .get("name")
        .and_then(coerce_string)
        .unwrap_or_default();
    let arguments = match params.get("arguments") {
        Some(Value::Object(arguments)) => arguments.clone(),
        _ => Map::new(),
    };

    let result = call_tool(state, &name, &arguments).await?;
    serde_json::to_value(result)
        .map_err(|err| AppError::internal(format!("failed to serialize tool result: {err}")))
}

async fn league_info(state: &AppState, tool: LeagueInfoTool) -> Result<Map<String, Value>, AppError> {
    let league_id = tool
        .league_id
        .unwrap_or_else(|| state.default_league_id.to_string());
    let league = state
        .provider
        .fetch_league(&league_id)
        .await?
        .unwrap_or_default();

    Ok(Map::from_iter([
        ("leagueId".to_string(), json!(league_id)),
        ("name".to_string(), json!(league.name)),
        ("season".to_string(), json!(league.season)),
        ("totalRosters".to_string(), json!(league.total_rosters)),
    ]))
}

async fn matchups(state: &AppState, tool: MatchupsTool) -> Result<Map<String, Value>, AppError> {
    let league_id = tool
        .league_id
        .unwrap_or_else(|| state.default_league_id.to_string());
    let data = state
        .provider
        .fetch_matchups(&league_id, &tool.week.to_string())
        .await?;

    Ok(Map::from_iter([
        ("leagueId".to_string(), json!(league_id)),
        ("week".to_string(), week_value(tool.week)),
        ("matchups".to_string(), data),
    ]))
}

async fn player_search(
    state: &AppState,
    tool: PlayerSearchTool,
) -> Result<Map<String, Value>, AppError> {
    let limit = normalize_search_limit(tool.limit);
    let players = state.provider.fetch_players().await?;
    let results = search_players(&players, &tool.query, limit);

    Ok(Map::from_iter([
        ("query".to_string(), json!(tool.query)),
        ("results".to_string(), json!(results)),
    ]))
}

fn tool_success(payload: Map<String, Value>) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(
            Value::Object(payload.clone()).to_string(),
            None,
            None,
        ))],
        is_error: Some(false),
        meta: None,
        structured_content: Some(payload),
    }
}

fn tool_failure(failure: &ToolFailure) -> CallToolResult {
    CallToolResult {
        content: vec![ContentBlock::from(TextContent::new(
            failure.to_string(),
            None,
            None,
        ))],
        is_error: Some(true),
        meta: None,
        structured_content: None,
    }
}
