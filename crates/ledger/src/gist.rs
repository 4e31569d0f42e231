//! GitHub Gist backed ledger store.
//!
//! The Gist API has no conditional write, so `put` re-reads the current
//! revision (the newest history version) and reports a conflict if it moved
//! since the caller's read. Only then is the file patched. The remaining
//! window between that check and the write is narrow but not closed.

use async_trait::async_trait;
use bourse_tracker_core::{LedgerConfig, LedgerStore, PutOutcome, Revision, StoreError, Versioned};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const USER_AGENT: &str = "bourse-tracker";

// =============================================================================
// API Response Types
// =============================================================================

#[derive(Debug, Deserialize)]
struct RawGist {
    #[serde(default)]
    files: HashMap<String, RawGistFile>,
    #[serde(default)]
    history: Vec<RawHistoryEntry>,
    #[serde(default)]
    updated_at: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawGistFile {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    truncated: bool,
    #[serde(default)]
    raw_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawHistoryEntry {
    version: String,
}

impl RawGist {
    fn revision(&self) -> Option<Revision> {
        self.history
            .first()
            .map(|h| Revision::new(h.version.clone()))
            .or_else(|| self.updated_at.clone().map(Revision::new))
    }
}

// =============================================================================
// Store
// =============================================================================

pub struct GistStore {
    http: Client,
    base_url: String,
    gist_id: String,
    token: SecretString,
}

impl GistStore {
    /// Creates a store from ledger configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &LedgerConfig) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| StoreError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            gist_id: config.gist_id.clone(),
            token: config.gist_token.clone(),
        })
    }

    /// Sets a custom base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn gist_url(&self) -> String {
        format!("{}/gists/{}", self.base_url, self.gist_id)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header(
                "Authorization",
                format!("token {}", self.token.expose_secret()),
            )
            .header("Accept", "application/vnd.github.v3+json")
    }

    async fn fetch_gist(&self) -> Result<RawGist, StoreError> {
        let url = self.gist_url();
        tracing::debug!("GET {}", url);

        let response = self
            .authorized(self.http.get(&url))
            .send()
            .await
            .map_err(classify)?;
        let response = check_status(response).await?;
        response
            .json::<RawGist>()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))
    }

    async fn fetch_raw(&self, raw_url: &str) -> Result<String, StoreError> {
        tracing::debug!("GET {}", raw_url);
        let response = self
            .authorized(self.http.get(raw_url))
            .send()
            .await
            .map_err(classify)?;
        let response = check_status(response).await?;
        response.text().await.map_err(classify)
    }
}

#[async_trait]
impl LedgerStore for GistStore {
    async fn get(&self, key: &str) -> Result<Versioned, StoreError> {
        let gist = self.fetch_gist().await?;
        let revision = gist.revision();

        let content = match gist.files.get(key) {
            None => None,
            Some(file) if file.truncated => match file.raw_url.as_deref() {
                Some(raw_url) => Some(self.fetch_raw(raw_url).await?),
                None => {
                    return Err(StoreError::Malformed(format!(
                        "{key} is truncated and has no raw_url"
                    )))
                }
            },
            Some(file) => file.content.clone(),
        };

        Ok(Versioned { content, revision })
    }

    async fn put(
        &self,
        key: &str,
        content: &str,
        expected: Option<&Revision>,
    ) -> Result<PutOutcome, StoreError> {
        let current = self.fetch_gist().await?;
        let moved = match expected {
            Some(expected) => current.revision().as_ref() != Some(expected),
            // the caller saw no file; any existing file means someone wrote it
            None => current.files.contains_key(key),
        };
        if moved {
            tracing::debug!(key, "gist revision moved since read");
            return Ok(PutOutcome::Conflict);
        }

        let url = self.gist_url();
        tracing::debug!("PATCH {}", url);
        let body = serde_json::json!({ "files": { key: { "content": content } } });

        let response = self
            .authorized(self.http.patch(&url))
            .json(&body)
            .send()
            .await
            .map_err(classify)?;
        let response = check_status(response).await?;
        let written = response
            .json::<RawGist>()
            .await
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        written
            .revision()
            .map(PutOutcome::Written)
            .ok_or_else(|| StoreError::Malformed("write response has no revision".to_string()))
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let text = response.text().await.unwrap_or_default();
    Err(StoreError::Api {
        status: status.as_u16(),
        message: text,
    })
}

fn classify(err: reqwest::Error) -> StoreError {
    if err.is_timeout() {
        StoreError::Timeout(err.to_string())
    } else {
        StoreError::Network(err.to_string())
    }
}
