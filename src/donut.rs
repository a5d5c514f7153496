use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;

/// Player presence as reported by the lookup endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlayerLocation {
    #[serde(default)]
    pub location: Option<String>,
}

/// Read-only view of the status API. Every failure mode (transport error,
/// non-2xx, missing result envelope) collapses to `None` so callers only
/// ever see "available" or "unavailable".
#[async_trait]
pub trait StatusSource: Send + Sync {
    async fn lookup(&self, name: &str) -> Option<PlayerLocation>;
    async fn stats(&self, name: &str) -> Option<Value>;
}

#[derive(Debug, Clone)]
pub struct DonutClient {
    http: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    result: Option<Value>,
}

impl DonutClient {
    pub fn new(base_url: String, api_key: String) -> Self {
        Self {
            http: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url,
            api_key,
        }
    }

    async fn fetch_result(&self, endpoint: &str) -> Option<Value> {
        let url = format!("{}{}", self.base_url.trim_end_matches('/'), endpoint);
        let resp = match self
            .http
            .get(&url)
            .bearer_auth(&self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                debug!("Status API request failed: {} ({})", e, url);
                return None;
            }
        };

        let status = resp.status();
        if !status.is_success() {
            debug!("Status API non-2xx for {}: {}", url, status);
            return None;
        }

        let envelope: Envelope = match resp.json().await {
            Ok(v) => v,
            Err(e) => {
                debug!("Status API returned invalid JSON for {}: {}", url, e);
                return None;
            }
        };

        envelope.result.filter(|v| !v.is_null())
    }
}

#[async_trait]
impl StatusSource for DonutClient {
    async fn lookup(&self, name: &str) -> Option<PlayerLocation> {
        let result = self.fetch_result(&format!("/lookup/{}", name)).await?;
        serde_json::from_value(result).ok()
    }

    async fn stats(&self, name: &str) -> Option<Value> {
        self.fetch_result(&format!("/stats/{}", name)).await
    }
}

/// A player counts as online when the lookup reports a real location that
/// is not the "offline" sentinel. Missing lookup data or an empty location
/// string both read as offline.
pub fn is_online(lookup: Option<&PlayerLocation>) -> bool {
    match lookup
        .and_then(|l| l.location.as_deref())
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        Some(loc) => !loc.eq_ignore_ascii_case("offline"),
        None => false,
    }
}
