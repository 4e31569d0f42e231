//! Telegram Bot API message sink.

use async_trait::async_trait;
use bourse_tracker_core::{MessageSink, SinkError, TelegramConfig};
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Wait used when a 429 carries no usable retry hint.
const DEFAULT_RETRY_AFTER: Duration = Duration::from_secs(5);

#[derive(Debug, Serialize)]
struct SendMessageRequest<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    ok: bool,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    parameters: Option<ResponseParameters>,
}

#[derive(Debug, Deserialize)]
struct ResponseParameters {
    #[serde(default)]
    retry_after: Option<u64>,
}

/// Sends HTML messages to one chat.
pub struct TelegramSink {
    http: Client,
    base_url: String,
    bot_token: SecretString,
    chat_id: String,
}

impl TelegramSink {
    /// Creates a sink from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError::Permanent`] if the HTTP client cannot be built.
    pub fn new(config: &TelegramConfig) -> Result<Self, SinkError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SinkError::Permanent(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.api_url.trim_end_matches('/').to_string(),
            bot_token: config.bot_token.clone(),
            chat_id: config.chat_id.clone(),
        })
    }

    /// Sets a custom base URL (useful for testing).
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn send_url(&self) -> String {
        format!(
            "{}/bot{}/sendMessage",
            self.base_url,
            self.bot_token.expose_secret()
        )
    }

    async fn handle_response(response: reqwest::Response) -> Result<(), SinkError> {
        let status = response.status();
        let header_retry = response
            .headers()
            .get("Retry-After")
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.parse::<u64>().ok());
        let body: ApiResponse = response.json().await.unwrap_or_default();
        let reason = body
            .description
            .clone()
            .unwrap_or_else(|| status.to_string());

        if status.as_u16() == 429 {
            let retry_after = body
                .parameters
                .and_then(|p| p.retry_after)
                .or(header_retry)
                .map_or(DEFAULT_RETRY_AFTER, Duration::from_secs);
            return Err(SinkError::RateLimited { retry_after });
        }
        if status.is_server_error() {
            return Err(SinkError::Transient(format!("{}: {reason}", status.as_u16())));
        }
        if !status.is_success() {
            return Err(SinkError::Permanent(format!("{}: {reason}", status.as_u16())));
        }
        if !body.ok {
            return Err(SinkError::Permanent(format!("rejected: {reason}")));
        }
        Ok(())
    }
}

#[async_trait]
impl MessageSink for TelegramSink {
    async fn send(&self, text: &str) -> Result<(), SinkError> {
        let request = SendMessageRequest {
            chat_id: &self.chat_id,
            text,
            parse_mode: "HTML",
            disable_web_page_preview: true,
        };
        tracing::debug!(chat_id = %self.chat_id, chars = text.chars().count(), "POST sendMessage");

        let response = self
            .http
            .post(self.send_url())
            .json(&request)
            .send()
            .await
            .map_err(classify)?;

        Self::handle_response(response).await
    }
}

impl std::fmt::Debug for TelegramSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TelegramSink")
            .field("base_url", &self.base_url)
            .field("chat_id", &self.chat_id)
            .finish_non_exhaustive()
    }
}

fn classify(err: reqwest::Error) -> SinkError {
    if err.is_timeout() {
        SinkError::Timeout(err.to_string())
    } else if err.is_builder() {
        SinkError::Permanent(err.to_string())
    } else {
        SinkError::Transient(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn sink(server: &MockServer) -> TelegramSink {
        let config = TelegramConfig {
            bot_token: SecretString::from("123:abc"),
            chat_id: "@channel".to_string(),
            ..Default::default()
        };
        TelegramSink::new(&config).unwrap().with_base_url(server.uri())
    }

    #[tokio::test]
    async fn test_send_posts_html_message() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/bot123:abc/sendMessage"))
            .and(body_partial_json(serde_json::json!({
                "chat_id": "@channel",
                "text": "<b>hi</b>",
                "parse_mode": "HTML"
            })))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "ok": true, "result": {} })),
            )
            .expect(1)
            .mount(&server)
            .await;

        sink(&server).send("<b>hi</b>").await.unwrap();
    }

    #[tokio::test]
    async fn test_rate_limit_reads_retry_after() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 429,
                "description": "Too Many Requests: retry after 7",
                "parameters": { "retry_after": 7 }
            })))
            .mount(&server)
            .await;

        let err = sink(&server).send("x").await.unwrap_err();
        match err {
            SinkError::RateLimited { retry_after } => {
                assert_eq!(retry_after, Duration::from_secs(7));
            }
            other => panic!("expected rate limit, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_server_error_is_transient() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let err = sink(&server).send("x").await.unwrap_err();
        assert!(matches!(err, SinkError::Transient(_)));
    }

    #[tokio::test]
    async fn test_bad_request_is_permanent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "ok": false,
                "error_code": 400,
                "description": "Bad Request: can't parse entities"
            })))
            .mount(&server)
            .await;

        let err = sink(&server).send("<b>").await.unwrap_err();
        match err {
            SinkError::Permanent(reason) => assert!(reason.contains("can't parse entities")),
            other => panic!("expected permanent, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_slow_response_is_timeout() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({ "ok": true }))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&server)
            .await;

        let config = TelegramConfig {
            bot_token: SecretString::from("123:abc"),
            chat_id: "@channel".to_string(),
            timeout_secs: 1,
            ..Default::default()
        };
        let sink = TelegramSink::new(&config).unwrap().with_base_url(server.uri());

        let err = sink.send("x").await.unwrap_err();
        assert!(matches!(err, SinkError::Timeout(_)));
    }
}
