//! donutwatch: Discord bot that tracks DonutSMP players.
//!
//! Responsibilities:
//! - Poll the status API for each tracked player's presence and stats
//! - Keep one embed message per player refreshed with the latest state
//! - Persist the tracked set to a JSON file so restarts pick it back up
//! - Serve !track / !list / !untrack from a command channel

mod commands;
mod config;
mod discord;
mod donut;
mod formatters;
mod registry;
mod supervisor;
mod tracker;

use anyhow::Result;
use config::Config;
use discord::{DiscordClient, NotificationSink};
use donut::{DonutClient, StatusSource};
use dotenv::dotenv;
use log::info;
use registry::Registry;
use std::sync::Arc;
use supervisor::Supervisor;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    env_logger::init();

    let cfg = Config::from_env()?;
    info!(
        "Starting donutwatch (refresh every {:?}, track file {})",
        cfg.refresh_interval,
        cfg.track_file.display()
    );

    let discord = Arc::new(DiscordClient::new(cfg.discord_token.clone()));
    let status: Arc<dyn StatusSource> =
        Arc::new(DonutClient::new(cfg.api_base.clone(), cfg.donut_api_key.clone()));
    let sink: Arc<dyn NotificationSink> = discord.clone();
    let registry = Arc::new(Registry::new(cfg.track_file.clone()));

    let supervisor = Arc::new(Supervisor::new(
        status,
        sink,
        registry,
        cfg.refresh_interval,
    ));

    supervisor.restore_all().await;
    info!(
        "{} refresh loop(s) running after restore",
        supervisor.running().await.len()
    );

    commands::run(
        discord,
        supervisor,
        cfg.command_channel_id.clone(),
        cfg.command_poll_interval,
    )
    .await;

    Ok(())
}
