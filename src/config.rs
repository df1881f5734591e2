use std::{env, net::SocketAddr, time::Duration};

use thiserror::Error;

pub const DEFAULT_LEAGUE_ID: &str = "1248432621554237440";
pub const DEFAULT_SLEEPER_API_BASE: &str = "https://api.sleeper.app/v1";
pub const DEFAULT_HEARTBEAT_SECS: u64 = 25;

#[derive(Debug, Clone)]
pub struct Config {
    pub default_league_id: String,
    pub sleeper_api_base: String,
    pub bind_addr: String,
    pub bind_port: u16,
    pub heartbeat_interval: Duration,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("BIND_PORT must be a valid u16")]
    InvalidPort,
    #[error("SSE_HEARTBEAT_SECS must be a positive integer")]
    InvalidHeartbeat,
    #[error("invalid bind address or port")]
    InvalidSocket,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let default_league_id =
            read("DEFAULT_LEAGUE_ID").unwrap_or_else(|| DEFAULT_LEAGUE_ID.to_string());
        let sleeper_api_base = read("SLEEPER_API_BASE")
            .unwrap_or_else(|| DEFAULT_SLEEPER_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();
        let bind_addr = read("BIND_ADDR").unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_port = read("BIND_PORT")
            .map(|value| value.parse::<u16>().map_err(|_| ConfigError::InvalidPort))
            .transpose()?
            .unwrap_or(8080);
        let heartbeat_secs = read("SSE_HEARTBEAT_SECS")
            .map(|value| {
                value
                    .parse::<u64>()
                    .ok()
                    .filter(|secs| *secs > 0)
                    .ok_or(ConfigError::InvalidHeartbeat)
            })
            .transpose()?
            .unwrap_or(DEFAULT_HEARTBEAT_SECS);

        let config = Self {
            default_league_id,
            sleeper_api_base,
            bind_addr,
            bind_port,
            heartbeat_interval: Duration::from_secs(heartbeat_secs),
        };

        let _ = config.bind_socket()?;
        Ok(config)
    }

    pub fn bind_socket(&self) -> Result<SocketAddr, ConfigError> {
        format!("{}:{}", self.bind_addr, self.bind_port)
            .parse::<SocketAddr>()
            .map_err(|_| ConfigError::InvalidSocket)
    }
}
