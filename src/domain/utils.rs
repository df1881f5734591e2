//! Argument coercion, validation and player filtering shared by the tools

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{json, Map, Value};

pub const DEFAULT_SEARCH_LIMIT: usize = 20;
pub const MAX_SEARCH_LIMIT: usize = 100;
/// Upper bound on matches collected before `limit` applies.
pub const SEARCH_PRE_TRIM: usize = 2_000;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct PlayerHit {
    pub id: String,
    pub name: String,
    pub position: String,
    pub team: Option<String>,
}

/// Stringifies a scalar argument; `null` counts as absent.
pub fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        Value::Bool(flag) => Some(flag.to_string()),
        other => Some(other.to_string()),
    }
}

pub fn coerce_number(value: Option<&Value>) -> Option<f64> {
    match value? {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                return None;
            }
            trimmed.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Accepts finite weeks of at least 1.
pub fn normalize_week(value: Option<&Value>) -> Option<f64> {
    coerce_number(value).filter(|week| week.is_finite() && *week >= 1.0)
}

pub fn normalize_query(value: Option<&Value>) -> Option<String> {
    value
        .and_then(coerce_string)
        .map(|query| query.trim().to_string())
        .filter(|query| !query.is_empty())
}

pub fn normalize_search_limit(limit: Option<f64>) -> usize {
    match limit {
        Some(value) if !value.is_nan() => value.clamp(1.0, MAX_SEARCH_LIMIT as f64) as usize,
        _ => DEFAULT_SEARCH_LIMIT,
    }
}

/// Integral weeks echo as JSON integers so `3` round-trips as `3`, not `3.0`.
pub fn week_value(week: f64) -> Value {
    if week.fract() == 0.0 && week < i64::MAX as f64 {
        json!(week as i64)
    } else {
        json!(week)
    }
}

/// Directory order: canonical integer ids ascend numerically, then other ids lexically.
fn id_order(left: &str, right: &str) -> Ordering {
    let numeric = |id: &str| {
        id.parse::<u64>()
            .ok()
            .filter(|number| number.to_string() == id)
    };

    match (numeric(left), numeric(right)) {
        (Some(left), Some(right)) => left.cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => left.cmp(right),
    }
}

/// Case-insensitive name filter over the directory, walked in `id_order`.
pub fn search_players(players: &Map<String, Value>, query: &str, limit: usize) -> Vec<PlayerHit> {
    let needle = query.to_lowercase();
    let mut entries: Vec<(&String, &Value)> = players.iter().collect();
    entries.sort_unstable_by(|(left, _), (right, _)| id_order(left, right));

    entries
        .into_iter()
        .filter_map(|(id, player)| {
            let name = non_empty_str(player.get("full_name"))?;
            let position = non_empty_str(player.get("position"))?;
            if !name.to_lowercase().contains(&needle) {
                return None;
            }

            Some(PlayerHit {
                id: id.clone(),
                name: name.to_string(),
                position: position.to_string(),
                team: player
                    .get("team")
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        })
        .take(SEARCH_PRE_TRIM)
        .take(limit)
        .collect()
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|text| !text.is_empty())
}
