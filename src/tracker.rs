//! Per-player refresh loop. One task per tracked name, owned by the
//! supervisor through its join handle; the loop ends itself only when
//! the notification target is permanently gone.

use crate::discord::{MessageRef, NotificationSink, SinkError};
use crate::donut::{self, StatusSource};
use crate::formatters;
use crate::registry::Registry;
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

/// Live loops by player name. Shared between the supervisor (spawn,
/// abort) and the loops themselves (self-removal on terminal failure).
pub type TrackerMap = Arc<Mutex<HashMap<String, JoinHandle<()>>>>;

/// Refresh one player's notification message until stopped or until the
/// message cannot be updated anymore.
///
/// Transient problems (status API unavailable, network hiccups on the
/// edit) are retried forever with no backoff; the fixed interval is the
/// throttle. Only NotFound/Forbidden end the loop, and those also drop
/// the player from the registry.
pub async fn refresh_loop(
    status: Arc<dyn StatusSource>,
    sink: Arc<dyn NotificationSink>,
    registry: Arc<Registry>,
    trackers: TrackerMap,
    name: String,
    target: MessageRef,
    interval: Duration,
) {
    info!("Refresh loop started for {}", name);
    loop {
        let (lookup, stats) = tokio::join!(status.lookup(&name), status.stats(&name));

        match stats {
            None => {
                // Partial data: render nothing, try again next cycle.
                debug!("{}: stats unavailable, skipping cycle", name);
            }
            Some(stats) => {
                let online = donut::is_online(lookup.as_ref());
                let embed = formatters::status_embed(&name, online, &stats);
                match sink.update(&target, &embed).await {
                    Ok(()) => {}
                    Err(e) if e.is_terminal() => {
                        info!("{} for {}, removing from tracked", e, name);
                        deregister(&registry, &trackers, &name).await;
                        break;
                    }
                    Err(e) => {
                        warn!("Error updating {}: {}", name, e);
                    }
                }
            }
        }

        tokio::time::sleep(interval).await;
    }
    info!("Refresh loop ended for {}", name);
}

/// Terminal exit path: drop the registry entry and this loop's own
/// handle so list/untrack stay consistent with what is actually running.
async fn deregister(registry: &Registry, trackers: &TrackerMap, name: &str) {
    if let Err(e) = registry.remove(name).await {
        warn!("Failed to remove {} from track file: {}", name, e);
    }
    trackers.lock().await.remove(name);
}
