//! Configuration management

use anyhow::Result;
use std::path::PathBuf;
use std::time::Duration;

/// Being configuration, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Anthropic API key (chat skill; optional)
    pub anthropic_api_key: Option<String>,

    /// Tavily API key (web search skill; optional)
    pub tavily_api_key: Option<String>,

    /// Chat model override
    pub chat_model: Option<String>,

    /// SQLite path for the memory log; None keeps memory volatile
    pub db_path: Option<PathBuf>,

    /// Delay between scheduling cycles
    pub tick_interval: Duration,

    /// Energy budget ceiling
    pub max_energy: f64,

    /// Energy regeneration rate per second
    pub regen_per_sec: f64,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        let anthropic_api_key = std::env::var("ANTHROPIC_API_KEY").ok();
        let tavily_api_key = std::env::var("TAVILY_API_KEY").ok();
        let chat_model = std::env::var("BEING_CHAT_MODEL").ok();

        let db_path = match std::env::var("BEING_DB_PATH") {
            Ok(v) if v.is_empty() || v == ":memory:" => None,
            Ok(v) => Some(PathBuf::from(v)),
            Err(_) => Some(PathBuf::from("digital_being.db")),
        };

        let tick_interval = std::env::var("BEING_TICK_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(30));

        let max_energy = std::env::var("BEING_MAX_ENERGY")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(1.0);

        let regen_per_sec = std::env::var("BEING_ENERGY_REGEN")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(0.01);

        anyhow::ensure!(max_energy > 0.0, "BEING_MAX_ENERGY must be positive");
        anyhow::ensure!(regen_per_sec >= 0.0, "BEING_ENERGY_REGEN must be non-negative");

        Ok(Self {
            anthropic_api_key,
            tavily_api_key,
            chat_model,
            db_path,
            tick_interval,
            max_energy,
            regen_per_sec,
        })
    }
}
