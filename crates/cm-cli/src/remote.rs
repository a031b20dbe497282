//! Fetching records from the upstream store over HTTP.
//!
//! The endpoint is expected to answer a GET with a JSON array of records,
//! which is what a PostgREST-style `processed_messages` table returns.
//! There are no retries: a failed fetch aborts the run.

use std::time::Duration;

use anyhow::{Context, Result};
use cm_core::Record;
use cm_store::SourceConfig;
use reqwest::Client;
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap, HeaderValue};

pub struct RemoteSource {
    client: Client,
    url: String,
}

impl RemoteSource {
    /// Build a client for `url`. The API key, when its environment variable
    /// is set, is sent both as `apikey` and as a bearer token.
    pub fn new(url: &str, source: &SourceConfig) -> Result<Self> {
        anyhow::ensure!(!url.trim().is_empty(), "empty source URL");

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key(&source.api_key_env) {
            headers.insert(
                "apikey",
                HeaderValue::from_str(&key).context("invalid API key")?,
            );
            headers.insert(
                AUTHORIZATION,
                HeaderValue::from_str(&format!("Bearer {key}")).context("invalid API key")?,
            );
        } else {
            tracing::debug!("{} not set, fetching without credentials", source.api_key_env);
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs.max(1)))
            .default_headers(headers)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            client,
            url: url.trim().to_string(),
        })
    }

    pub async fn fetch(&self) -> Result<Vec<Record>> {
        tracing::info!("fetching records from {}", self.url);
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .with_context(|| format!("request to {} failed", self.url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} returned {status}: {}", self.url, body.trim());
        }

        let records: Vec<Record> = response
            .json()
            .await
            .with_context(|| format!("invalid record JSON from {}", self.url))?;
        tracing::info!("fetched {} records", records.len());
        Ok(records)
    }
}

fn api_key(var: &str) -> Option<String> {
    std::env::var(var)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}
