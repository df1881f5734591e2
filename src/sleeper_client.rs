use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::errors::AppError;

/// League metadata as returned by `GET /league/{id}`.
///
/// Fields are passed through with whatever JSON type the upstream uses.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct LeagueResponse {
    pub name: Option<Value>,
    pub season: Option<Value>,
    pub total_rosters: Option<Value>,
}

/// Upstream source of league, matchup and player data.
///
/// Every call maps to exactly one outbound request. Implementations must not
/// cache or retry; a failed request surfaces as [`AppError::Provider`].
#[async_trait]
pub trait LeagueProvider: Send + Sync {
    /// `None` when the upstream answers with a `null` league.
    async fn fetch_league(&self, league_id: &str) -> Result<Option<LeagueResponse>, AppError>;
    async fn fetch_matchups(&self, league_id: &str, week: &str) -> Result<Value, AppError>;
    async fn fetch_players(&self) -> Result<Map<String, Value>, AppError>;
}

#[derive(Debug, Clone)]
pub struct HttpSleeperClient {
    http: reqwest::Client,
    base_url: String,
}

impl HttpSleeperClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|err| AppError::internal(format!("failed to build http client: {err}")))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, AppError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "fetching from sleeper");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|err| AppError::provider(format!("request to {url} failed: {err}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::provider(format!(
                "HTTP {} for {url}",
                status.as_u16()
            )));
        }

        response
            .json::<T>()
            .await
            .map_err(|err| AppError::provider(format!("invalid JSON from {url}: {err}")))
    }
}

#[async_trait]
impl LeagueProvider for HttpSleeperClient {
    async fn fetch_league(&self, league_id: &str) -> Result<Option<LeagueResponse>, AppError> {
        self.get_json(&format!("/league/{league_id}")).await
    }

    async fn fetch_matchups(&self, league_id: &str, week: &str) -> Result<Value, AppError> {
        self.get_json(&format!("/league/{league_id}/matchups/{week}"))
            .await
    }

    async fn fetch_players(&self) -> Result<Map<String, Value>, AppError> {
        let players: Option<Map<String, Value>> = self.get_json("/players/nfl").await?;
        Ok(players.unwrap_or_default())
    }
}
