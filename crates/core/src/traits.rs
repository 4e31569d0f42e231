use crate::error::{ProviderError, SinkError, StoreError};
use async_trait::async_trait;

/// A raw provider record: field name to JSON value.
pub type RawRecord = serde_json::Map<String, serde_json::Value>;

#[async_trait]
pub trait DataProvider: Send + Sync {
    fn name(&self) -> &str;

    /// Scopes (sectors, boards) this provider is queried for. An empty list
    /// means a single unscoped fetch.
    fn scopes(&self) -> &[String];

    async fn fetch(&self, scope: &str) -> Result<Vec<RawRecord>, ProviderError>;
}

/// Opaque version token of a stored document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Revision(pub String);

impl Revision {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }
}

/// Document content together with the revision it was read at.
///
/// `content` is `None` when the key does not exist yet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Versioned {
    pub content: Option<String>,
    pub revision: Option<Revision>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Written(Revision),
    /// The stored revision no longer matches the expected one.
    Conflict,
}

#[async_trait]
pub trait LedgerStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Versioned, StoreError>;

    /// Writes `content` if the stored revision still equals `expected`
    /// (`None` meaning the key must not exist yet).
    async fn put(
        &self,
        key: &str,
        content: &str,
        expected: Option<&Revision>,
    ) -> Result<PutOutcome, StoreError>;
}

#[async_trait]
pub trait MessageSink: Send + Sync {
    async fn send(&self, text: &str) -> Result<(), SinkError>;
}
