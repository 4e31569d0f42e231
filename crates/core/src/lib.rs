pub mod config;
pub mod config_loader;
pub mod error;
pub mod session;
pub mod traits;
pub mod types;

pub use config::{
    AppConfig, DispatchConfig, LedgerConfig, MarketConfig, ProviderConfig, RuleToggle,
    RulesConfig, SummaryConfig, TelegramConfig,
};
pub use config_loader::ConfigLoader;
pub use error::{ConfigError, ProviderError, SinkError, StoreError};
pub use session::{MarketSession, SessionState};
pub use traits::{
    DataProvider, LedgerStore, MessageSink, PutOutcome, RawRecord, Revision, Versioned,
};
pub use types::{safe_ratio, DayKey, Field, LedgerEntry, Match, SnapshotRow};
