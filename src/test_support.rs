//! Shared fixtures for unit tests

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use crate::errors::AppError;
use crate::session::{SessionError, SessionTransport};
use crate::sleeper_client::{LeagueProvider, LeagueResponse};
use crate::AppState;

pub const TEST_DEFAULT_LEAGUE: &str = "1248432621554237440";

/// In-memory provider that records every upstream call it receives.
#[derive(Default)]
pub struct MockProvider {
    players: Map<String, Value>,
    delays: HashMap<String, Duration>,
    failure: Option<String>,
    panics: bool,
    calls: Mutex<Vec<String>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_players(mut self, players: Map<String, Value>) -> Self {
        self.players = players;
        self
    }

    /// Delays matchup fetches for `week` before answering.
    pub fn with_delay(mut self, week: &str, delay: Duration) -> Self {
        self.delays.insert(week.to_string(), delay);
        self
    }

    pub fn failing(mut self, message: &str) -> Self {
        self.failure = Some(message.to_string());
        self
    }

    pub fn panicking(mut self) -> Self {
        self.panics = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) -> Result<(), AppError> {
        self.calls.lock().expect("calls lock").push(call);
        if self.panics {
            panic!("provider exploded");
        }
        match &self.failure {
            Some(message) => Err(AppError::provider(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl LeagueProvider for MockProvider {
    async fn fetch_league(&self, league_id: &str) -> Result<Option<LeagueResponse>, AppError> {
        self.record(format!("league:{league_id}"))?;
        if league_id == "missing" {
            return Ok(None);
        }

        Ok(Some(LeagueResponse {
            name: Some(json!("My League")),
            season: Some(json!("2024")),
            total_rosters: Some(json!(12)),
        }))
    }

    async fn fetch_matchups(&self, league_id: &str, week: &str) -> Result<Value, AppError> {
        self.record(format!("matchups:{league_id}:{week}"))?;
        if let Some(delay) = self.delays.get(week) {
            tokio::time::sleep(*delay).await;
        }

        Ok(json!([{ "matchup_id": 1, "roster_id": 10, "points": 99.9 }]))
    }

    async fn fetch_players(&self) -> Result<Map<String, Value>, AppError> {
        self.record("players".to_string())?;
        Ok(self.players.clone())
    }
}

pub fn player_directory() -> Map<String, Value> {
    match json!({
        "1": { "full_name": "Alpha Man", "position": "QB", "team": "AAA" },
        "2": { "full_name": "Beta Guy", "position": "RB", "team": "BBB" },
        "3": { "full_name": "Gamma Dude", "team": "CCC" }
    }) {
        Value::Object(map) => map,
        _ => unreachable!(),
    }
}

pub fn test_state(provider: Arc<MockProvider>) -> AppState {
    test_state_with_heartbeat(provider, Duration::from_secs(25))
}

pub fn test_state_with_heartbeat(provider: Arc<MockProvider>, heartbeat: Duration) -> AppState {
    AppState::new(TEST_DEFAULT_LEAGUE.to_string(), provider, heartbeat)
}

/// Transport that keeps every pushed message with its event tag.
#[derive(Clone, Default)]
pub struct RecordingTransport {
    sent: Arc<Mutex<Vec<(Value, Option<String>)>>>,
    closed: Arc<AtomicBool>,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Value, Option<String>)> {
        self.sent.lock().expect("sent lock").clone()
    }
}

impl SessionTransport for RecordingTransport {
    fn send(&self, payload: String, event: Option<&str>) -> Result<(), SessionError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(SessionError::Closed);
        }
        let message = serde_json::from_str(&payload).expect("transport payload is json");
        self.sent
            .lock()
            .expect("sent lock")
            .push((message, event.map(str::to_string)));
        Ok(())
    }

    fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}
