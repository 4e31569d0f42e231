//! Error types shared across the tracker crates.
//!
//! Each collaborator boundary gets its own enum so callers can tell transient
//! failures (retry or degrade) from permanent ones.

use std::time::Duration;
use thiserror::Error;

/// Errors raised by a market data provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Provider returned a non-success status.
    #[error("provider error: {status} - {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// Rate limit exceeded.
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit {
        /// Seconds to wait before retry.
        retry_after_secs: u64,
    },

    /// Response body could not be interpreted as records.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Returns true if a later attempt may succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) | Self::RateLimit { .. } => true,
            Self::Status { status, .. } => *status >= 500,
            Self::Malformed(_) => false,
        }
    }
}

/// Errors raised by the remote ledger store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Request timeout.
    #[error("request timeout: {0}")]
    Timeout(String),

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Store API returned a non-success status.
    #[error("store error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The stored document or store response is unreadable.
    #[error("malformed store data: {0}")]
    Malformed(String),
}

impl StoreError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Network(_) => true,
            Self::Api { status, .. } => *status >= 500 || *status == 429,
            Self::Malformed(_) => false,
        }
    }
}

/// Errors raised by a message sink.
#[derive(Debug, Error)]
pub enum SinkError {
    /// Sink asked us to slow down.
    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited {
        /// Delay the sink requested.
        retry_after: Duration,
    },

    /// Request timeout. Delivery state is unknown.
    #[error("send timeout: {0}")]
    Timeout(String),

    /// Temporary failure (5xx, connection reset).
    #[error("transient send failure: {0}")]
    Transient(String),

    /// The message was rejected and will not succeed on retry.
    #[error("permanent send failure: {0}")]
    Permanent(String),
}

impl SinkError {
    #[must_use]
    pub fn is_transient(&self) -> bool {
        !matches!(self, Self::Permanent(_))
    }
}

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required setting is empty or missing.
    #[error("missing required setting: {0}")]
    Missing(&'static str),

    /// A setting has an unusable value.
    #[error("invalid setting {field}: {reason}")]
    Invalid {
        /// Dotted path of the setting.
        field: String,
        /// What is wrong with it.
        reason: String,
    },
}

impl ConfigError {
    #[must_use]
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            reason: reason.into(),
        }
    }
}
