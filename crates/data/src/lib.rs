//! Market snapshot acquisition for the bourse alert tracker.
//!
//! This crate provides:
//! - An HTTP provider with per-provider rate limiting
//! - Concurrent fetching across providers and scopes
//! - Normalization of raw records into canonical snapshot rows

pub mod fetcher;
pub mod normalizer;
pub mod provider;

pub use fetcher::{FetchReport, ProviderBatch, SnapshotFetcher};
pub use normalizer::{normalize, NormalizeReport, Snapshot};
pub use provider::HttpProvider;
