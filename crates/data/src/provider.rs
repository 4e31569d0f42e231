//! HTTP market data provider with rate limiting.
//!
//! Fetches per-symbol JSON records from a templated URL. `{scope}` in the
//! template is replaced by the requested scope and `{key}` by the API key.

use async_trait::async_trait;
use bourse_tracker_core::{DataProvider, ProviderConfig, ProviderError, RawRecord};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

const USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) bourse-tracker/0.1";

/// Rate-limited HTTP provider.
pub struct HttpProvider {
    name: String,
    url_template: String,
    scopes: Vec<String>,
    api_key: Option<SecretString>,
    records_key: Option<String>,
    http: Client,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl HttpProvider {
    /// Creates a provider from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| ProviderError::Network(format!("failed to build HTTP client: {e}")))?;

        let per_minute = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(per_minute)));

        Ok(Self {
            name: config.name.clone(),
            url_template: config.url.clone(),
            scopes: config.scopes.clone(),
            api_key: config.api_key.clone(),
            records_key: config.records_key.clone(),
            http,
            rate_limiter,
        })
    }

    /// Sets a custom URL template (useful for testing).
    #[must_use]
    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = template.into();
        self
    }

    fn url_for(&self, scope: &str) -> String {
        self.url_template
            .replace("{scope}", scope)
            .replace(
                "{key}",
                self.api_key.as_ref().map_or("", |k| k.expose_secret()),
            )
    }

    async fn handle_response(
        &self,
        response: reqwest::Response,
    ) -> Result<Vec<RawRecord>, ProviderError> {
        let status = response.status();

        if status.as_u16() == 429 {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ProviderError::RateLimit {
                retry_after_secs: retry_after,
            });
        }

        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                message: text,
            });
        }

        let body: Value = response.json().await.map_err(classify)?;
        self.extract_records(body)
    }

    fn extract_records(&self, body: Value) -> Result<Vec<RawRecord>, ProviderError> {
        let items = match (body, self.records_key.as_deref()) {
            (Value::Array(items), _) => items,
            (Value::Object(mut obj), Some(key)) => match obj.remove(key) {
                Some(Value::Array(items)) => items,
                _ => {
                    return Err(ProviderError::Malformed(format!(
                        "no record array under {key:?}"
                    )))
                }
            },
            (other, _) => {
                return Err(ProviderError::Malformed(format!(
                    "expected a record array, got {}",
                    kind_of(&other)
                )))
            }
        };

        let total = items.len();
        let records: Vec<RawRecord> = items
            .into_iter()
            .filter_map(|item| match item {
                Value::Object(map) => Some(map),
                _ => None,
            })
            .collect();
        if records.len() < total {
            tracing::debug!(
                provider = %self.name,
                skipped = total - records.len(),
                "non-object entries in provider payload"
            );
        }
        Ok(records)
    }
}

#[async_trait]
impl DataProvider for HttpProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn scopes(&self) -> &[String] {
        &self.scopes
    }

    async fn fetch(&self, scope: &str) -> Result<Vec<RawRecord>, ProviderError> {
        self.rate_limiter.until_ready().await;

        let url = self.url_for(scope);
        tracing::debug!(provider = %self.name, scope, "GET {}", self.url_template);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json, text/plain, */*")
            .send()
            .await
            .map_err(classify)?;

        self.handle_response(response).await
    }
}

/// Maps a transport error onto the provider taxonomy.
fn classify(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout(err.to_string())
    } else if err.is_decode() {
        ProviderError::Malformed(err.to_string())
    } else {
        ProviderError::Network(err.to_string())
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
