use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

/// Floor for the refresh cadence so the status API is never hammered.
const MIN_REFRESH_SECS: f64 = 5.0;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub donut_api_key: String,
    pub api_base: String,
    pub command_channel_id: String,
    pub track_file: PathBuf,
    pub refresh_interval: Duration,
    pub command_poll_interval: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let discord_token = env::var("DISCORD_TOKEN").context("DISCORD_TOKEN must be set")?;
        let donut_api_key = env::var("DONUT_API_KEY").context("DONUT_API_KEY must be set")?;
        let api_base = env::var("API_BASE").context("API_BASE must be set")?;
        let command_channel_id =
            env::var("COMMAND_CHANNEL_ID").context("COMMAND_CHANNEL_ID must be set")?;

        let track_file: PathBuf = env::var("TRACK_FILE")
            .unwrap_or_else(|_| "tracked_players.json".to_string())
            .into();

        let refresh_minutes = env::var("REFRESH_INTERVAL_MINUTES")
            .ok()
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(0.3);
        let refresh_interval = refresh_interval_from_minutes(refresh_minutes);

        let command_poll_interval = Duration::from_secs(
            env::var("COMMAND_POLL_INTERVAL_SECS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(2),
        );

        Ok(Self {
            discord_token,
            donut_api_key,
            api_base,
            command_channel_id,
            track_file,
            refresh_interval,
            command_poll_interval,
        })
    }
}

/// Fractional minutes are allowed (0.3 = 18s); clamped to the 5s floor.
pub fn refresh_interval_from_minutes(minutes: f64) -> Duration {
    Duration::from_secs_f64((minutes * 60.0).max(MIN_REFRESH_SECS))
}
