//! Day-partitioned deduplication ledger.
//!
//! The ledger remembers which (symbol, rule) pairs were delivered on each
//! day so repeated or overlapping runs never alert twice. It lives in a
//! remote versioned document store; see [`DedupLedger`] for the write
//! protocol.

pub mod document;
pub mod error;
pub mod gist;
pub mod ledger;
pub mod memory;

pub use document::{DayStats, LedgerDocument};
pub use error::{LedgerError, Result};
pub use gist::GistStore;
pub use ledger::{CommitOutcome, DedupLedger, LedgerSettings};
pub use memory::MemoryStore;
