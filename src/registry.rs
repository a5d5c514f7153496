use anyhow::{Context, Result};
use log::warn;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// Where a tracked player's notification message lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedPlayer {
    pub channel_id: String,
    pub message_id: String,
}

/// Durable name -> notification-address map, stored as a single JSON
/// document. The file is the source of truth for what is being tracked;
/// every mutation is a full load + mutate + save cycle serialized behind
/// an in-process lock.
pub struct Registry {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl Registry {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// An absent or unreadable file yields an empty map. Corruption is
    /// logged but never surfaces to the caller; the bot keeps running
    /// with nothing tracked.
    pub async fn load(&self) -> BTreeMap<String, TrackedPlayer> {
        let raw = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(_) => return BTreeMap::new(),
        };
        match serde_json::from_slice(&raw) {
            Ok(map) => map,
            Err(e) => {
                warn!(
                    "Track file {} is unreadable, starting with an empty registry: {}",
                    self.path.display(),
                    e
                );
                BTreeMap::new()
            }
        }
    }

    /// Full rewrite via temp file + rename so a crash mid-write never
    /// leaves a half-written document behind.
    pub async fn save(&self, map: &BTreeMap<String, TrackedPlayer>) -> Result<()> {
        let json = serde_json::to_vec_pretty(map).context("serialize track file")?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json)
            .await
            .with_context(|| format!("write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path)
            .await
            .with_context(|| format!("rename {} over {}", tmp.display(), self.path.display()))?;
        Ok(())
    }

    pub async fn upsert(&self, name: &str, entry: TrackedPlayer) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await;
        map.insert(name.to_string(), entry);
        self.save(&map).await
    }

    /// Returns whether the name was present. A missing name leaves the
    /// file untouched.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let _guard = self.write_lock.lock().await;
        let mut map = self.load().await;
        if map.remove(name).is_none() {
            return Ok(false);
        }
        self.save(&map).await?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn entry(channel: &str, message: &str) -> TrackedPlayer {
        TrackedPlayer {
            channel_id: channel.to_string(),
            message_id: message.to_string(),
        }
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path().join("tracked.json"));
        assert!(registry.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_upsert_and_load_roundtrip() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path().join("tracked.json"));

        registry.upsert("alice", entry("c1", "m1")).await.unwrap();
        registry.upsert("bob", entry("c2", "m2")).await.unwrap();

        let map = registry.load().await;
        assert_eq!(map.len(), 2);
        assert_eq!(map["alice"], entry("c1", "m1"));
        assert_eq!(map["bob"], entry("c2", "m2"));
    }

    #[tokio::test]
    async fn test_upsert_overwrites() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path().join("tracked.json"));

        registry.upsert("alice", entry("c1", "m1")).await.unwrap();
        registry.upsert("alice", entry("c1", "m9")).await.unwrap();

        let map = registry.load().await;
        assert_eq!(map.len(), 1);
        assert_eq!(map["alice"], entry("c1", "m9"));
    }

    #[tokio::test]
    async fn test_remove() {
        let dir = tempdir().unwrap();
        let registry = Registry::new(dir.path().join("tracked.json"));

        registry.upsert("alice", entry("c1", "m1")).await.unwrap();
        assert!(registry.remove("alice").await.unwrap());
        assert!(!registry.remove("alice").await.unwrap());
        assert!(registry.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_corrupt_file_fails_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tracked.json");
        std::fs::write(&path, "{ not json").unwrap();

        let registry = Registry::new(&path);
        assert!(registry.load().await.is_empty());

        // Still writable afterwards.
        registry.upsert("alice", entry("c1", "m1")).await.unwrap();
        assert_eq!(registry.load().await.len(), 1);
    }
}
