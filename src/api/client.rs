use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::ScrapeConfig;
use crate::error::{Result, ScrapeError};

/// Raw page content returned by the fetch service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Primary text rendering of the page (markdown with pipe tables)
    pub markdown: String,
    /// Secondary markup rendering, when the service returned one
    pub html: Option<String>,
}

/// Anything that can turn a chain page locator into a snapshot.
///
/// Implementations make one attempt per call and never retry.
#[allow(async_fn_in_trait)]
pub trait SnapshotSource {
    async fn fetch(&self, locator: &Url) -> Result<Snapshot>;
}

#[derive(Debug, Serialize)]
struct FetchRequest<'a> {
    url: &'a str,
}

/// Envelope returned by the fetch service
#[derive(Debug, Clone, Deserialize)]
pub struct FetchResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

impl FetchResponse {
    /// Pull the page content out of the envelope.
    ///
    /// The service nests the content either directly under `data` or one
    /// level deeper under `data.data`.
    pub fn into_snapshot(self) -> Result<Snapshot> {
        if !self.success {
            return Err(ScrapeError::Upstream(
                self.error
                    .unwrap_or_else(|| "fetch service reported failure".to_string()),
            ));
        }

        let data = self.data.unwrap_or(Value::Null);
        let field = |name: &str| -> Option<String> {
            data.pointer(&format!("/data/{}", name))
                .or_else(|| data.get(name))
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
        };

        Ok(Snapshot {
            markdown: field("markdown").unwrap_or_default(),
            html: field("html"),
        })
    }
}

/// HTTP client for the external fetch service
pub struct ScrapeClient {
    client: reqwest::Client,
    config: ScrapeConfig,
}

impl ScrapeClient {
    pub fn new(config: ScrapeConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ScrapeError::Request(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &ScrapeConfig {
        &self.config
    }

    fn auth(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        }
    }
}

impl SnapshotSource for ScrapeClient {
    async fn fetch(&self, locator: &Url) -> Result<Snapshot> {
        info!("Fetching {}", locator);
        let resp = self
            .auth(self.client.post(&self.config.endpoint))
            .json(&FetchRequest {
                url: locator.as_str(),
            })
            .send()
            .await
            .map_err(|e| ScrapeError::Request(format!("Fetch request failed: {}", e)))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            warn!("Fetch service answered {} for {}", status, locator);
            return Err(ScrapeError::Upstream(format!("HTTP {}: {}", status, body.trim())));
        }

        let envelope = resp.json::<FetchResponse>().await.map_err(|e| {
            ScrapeError::Parse(format!("Failed to parse fetch service response: {}", e))
        })?;
        let snapshot = envelope.into_snapshot()?;
        debug!(
            "Fetched {} bytes of text, markup {}",
            snapshot.markdown.len(),
            if snapshot.html.is_some() { "present" } else { "absent" }
        );
        Ok(snapshot)
    }
}
