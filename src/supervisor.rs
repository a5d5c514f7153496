//! Command surface and restart recovery. Owns the tracker tasks: every
//! live refresh loop has exactly one entry in the tracker map, and the
//! map is the only place loops are started or aborted from.

use crate::discord::{MessageRef, NotificationSink};
use crate::donut::{self, StatusSource};
use crate::formatters;
use crate::registry::{Registry, TrackedPlayer};
use crate::tracker::{self, TrackerMap};
use log::{error, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

const GENERIC_FAILURE: &str = "\u{274C} An error occurred while processing the command.";

pub struct Supervisor {
    status: Arc<dyn StatusSource>,
    sink: Arc<dyn NotificationSink>,
    registry: Arc<Registry>,
    trackers: TrackerMap,
    refresh_interval: Duration,
}

impl Supervisor {
    pub fn new(
        status: Arc<dyn StatusSource>,
        sink: Arc<dyn NotificationSink>,
        registry: Arc<Registry>,
        refresh_interval: Duration,
    ) -> Self {
        Self {
            status,
            sink,
            registry,
            trackers: Arc::new(Mutex::new(HashMap::new())),
            refresh_interval,
        }
    }

    /// Start tracking a player, publishing the initial embed into the
    /// channel the command came from. Returns a reply only on failure;
    /// on success the published embed is the visible result.
    ///
    /// Tracking an already-tracked name stops the old loop first and
    /// then starts over, so there is never more than one loop per name.
    pub async fn handle_track(&self, name: &str, channel_id: &str) -> Option<String> {
        {
            let mut trackers = self.trackers.lock().await;
            if let Some(task) = trackers.remove(name) {
                info!("Re-track of {}: stopping previous loop", name);
                task.abort();
            }
        }

        let (lookup, stats) = tokio::join!(self.status.lookup(name), self.status.stats(name));
        let Some(stats) = stats else {
            return Some(format!(
                "\u{274C} API Error: stats not available for `{}`.",
                name
            ));
        };

        let online = donut::is_online(lookup.as_ref());
        let embed = formatters::status_embed(name, online, &stats);

        let target = match self.sink.publish(channel_id, &embed).await {
            Ok(target) => target,
            Err(e) => {
                error!("Failed to publish tracking message for {}: {}", name, e);
                return Some(GENERIC_FAILURE.to_string());
            }
        };

        let entry = TrackedPlayer {
            channel_id: target.channel_id.clone(),
            message_id: target.message_id.clone(),
        };
        if let Err(e) = self.registry.upsert(name, entry).await {
            error!("Failed to persist tracking for {}: {}", name, e);
            return Some(GENERIC_FAILURE.to_string());
        }

        self.spawn_tracker(name.to_string(), target).await;
        info!("Now tracking {}", name);
        None
    }

    pub async fn handle_list(&self) -> String {
        let tracked = self.registry.load().await;
        if tracked.is_empty() {
            return "\u{1F4ED} No players are currently being tracked.".to_string();
        }
        let lines: Vec<String> = tracked.keys().map(|name| format!("\u{2022} `{}`", name)).collect();
        format!("\u{1F4CB} Tracked players:\n{}", lines.join("\n"))
    }

    /// Stop tracking. The loop may already have ended on its own (its
    /// message was deleted), so a missing task is not an error.
    pub async fn handle_untrack(&self, name: &str) -> String {
        if let Some(task) = self.trackers.lock().await.remove(name) {
            task.abort();
        }

        match self.registry.remove(name).await {
            Ok(true) => {
                info!("Stopped tracking {}", name);
                format!("\u{2705} Removed tracking for `{}`.", name)
            }
            Ok(false) => format!("\u{274C} `{}` is not being tracked.", name),
            Err(e) => {
                error!("Failed to remove {} from track file: {}", name, e);
                GENERIC_FAILURE.to_string()
            }
        }
    }

    /// Startup recovery: restart a loop for every persisted entry whose
    /// message still resolves, and drop the ones whose target is gone.
    pub async fn restore_all(&self) {
        let tracked = self.registry.load().await;
        if tracked.is_empty() {
            return;
        }
        info!("Restoring {} tracked player(s)", tracked.len());

        for (name, entry) in tracked {
            match self
                .sink
                .resolve(&entry.channel_id, &entry.message_id)
                .await
            {
                Ok(target) => {
                    self.spawn_tracker(name.clone(), target).await;
                    info!("Restored tracking for {}", name);
                }
                Err(e) => {
                    warn!("Could not restore tracking for {}: {}", name, e);
                    if let Err(e) = self.registry.remove(&name).await {
                        warn!("Failed to drop stale entry {}: {}", name, e);
                    }
                }
            }
        }
    }

    /// Names with a live refresh loop right now.
    pub async fn running(&self) -> Vec<String> {
        self.trackers.lock().await.keys().cloned().collect()
    }

    // Holds the map lock across spawn + insert so the new loop cannot
    // observe the map before its own handle is registered.
    async fn spawn_tracker(&self, name: String, target: MessageRef) {
        let mut trackers = self.trackers.lock().await;
        let task = tokio::spawn(tracker::refresh_loop(
            self.status.clone(),
            self.sink.clone(),
            self.registry.clone(),
            self.trackers.clone(),
            name.clone(),
            target,
            self.refresh_interval,
        ));
        trackers.insert(name, task);
    }
}
