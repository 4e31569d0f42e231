use crate::error::ConfigError;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub telegram: TelegramConfig,
    pub ledger: LedgerConfig,
    pub providers: Vec<ProviderConfig>,
    pub market: MarketConfig,
    pub dispatch: DispatchConfig,
    pub rules: RulesConfig,
    pub summary: SummaryConfig,
}

impl AppConfig {
    /// Checks settings every command depends on.
    ///
    /// # Errors
    ///
    /// Returns the first invalid setting found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.providers.is_empty() {
            return Err(ConfigError::Missing("providers"));
        }
        for (i, provider) in self.providers.iter().enumerate() {
            if provider.url.trim().is_empty() {
                return Err(ConfigError::invalid(
                    format!("providers[{i}].url"),
                    "must not be empty",
                ));
            }
            if provider.requests_per_minute == 0 {
                return Err(ConfigError::invalid(
                    format!("providers[{i}].requests_per_minute"),
                    "must be at least 1",
                ));
            }
        }
        if self.ledger.retention_days == 0 {
            return Err(ConfigError::invalid(
                "ledger.retention_days",
                "must be at least 1",
            ));
        }
        if self.ledger.max_commit_attempts == 0 {
            return Err(ConfigError::invalid(
                "ledger.max_commit_attempts",
                "must be at least 1",
            ));
        }
        if self.dispatch.max_in_flight == 0 {
            return Err(ConfigError::invalid(
                "dispatch.max_in_flight",
                "must be at least 1",
            ));
        }
        if self.dispatch.default_batch_size == 0 {
            return Err(ConfigError::invalid(
                "dispatch.default_batch_size",
                "must be at least 1",
            ));
        }
        if self.summary.min_count == 0 {
            return Err(ConfigError::invalid("summary.min_count", "must be at least 1"));
        }
        Ok(())
    }

    /// Checks the credentials needed to read and write the ledger.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an empty token or document id.
    pub fn require_ledger(&self) -> Result<(), ConfigError> {
        if self.ledger.gist_token.expose_secret().is_empty() {
            return Err(ConfigError::Missing("ledger.gist_token"));
        }
        if self.ledger.gist_id.is_empty() {
            return Err(ConfigError::Missing("ledger.gist_id"));
        }
        Ok(())
    }

    /// Checks the credentials needed to deliver messages.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] for an empty token or chat id.
    pub fn require_telegram(&self) -> Result<(), ConfigError> {
        if self.telegram.bot_token.expose_secret().is_empty() {
            return Err(ConfigError::Missing("telegram.bot_token"));
        }
        if self.telegram.chat_id.is_empty() {
            return Err(ConfigError::Missing("telegram.chat_id"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TelegramConfig {
    pub bot_token: SecretString,
    /// Channel username or numeric chat id.
    #[serde(deserialize_with = "string_or_int")]
    pub chat_id: String,
    /// Channel handle appended to every message footer.
    pub channel_name: String,
    pub api_url: String,
    pub timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: SecretString::from(String::new()),
            chat_id: String::new(),
            channel_name: "@tehran_stock_alerts".to_string(),
            api_url: "https://api.telegram.org".to_string(),
            timeout_secs: 15,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    pub gist_token: SecretString,
    pub gist_id: String,
    pub file_name: String,
    pub api_url: String,
    /// Number of most recent day partitions kept in the document.
    pub retention_days: usize,
    pub cache_ttl_secs: u64,
    pub max_commit_attempts: u32,
    pub backoff_base_ms: u64,
    pub backoff_max_ms: u64,
    pub timeout_secs: u64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            gist_token: SecretString::from(String::new()),
            gist_id: String::new(),
            file_name: "alert_cache.json".to_string(),
            api_url: "https://api.github.com".to_string(),
            retention_days: 3,
            cache_ttl_secs: 30,
            max_commit_attempts: 4,
            backoff_base_ms: 250,
            backoff_max_ms: 4000,
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub name: String,
    /// URL template. `{scope}` and `{key}` are substituted per request.
    pub url: String,
    pub scopes: Vec<String>,
    pub api_key: Option<SecretString>,
    /// Optional JSON key holding the record array in the response body.
    pub records_key: Option<String>,
    pub requests_per_minute: u32,
    pub timeout_secs: u64,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "brsapi".to_string(),
            url: "https://BrsApi.ir/Api/Tsetmc/AllSymbols.php?key={key}".to_string(),
            scopes: Vec::new(),
            api_key: None,
            records_key: None,
            requests_per_minute: 30,
            timeout_secs: 30,
        }
    }
}

/// Accepts a chat id written either as a string or as a bare integer.
fn string_or_int<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum ChatId {
        Text(String),
        Number(i64),
    }

    Ok(match ChatId::deserialize(deserializer)? {
        ChatId::Text(s) => s,
        ChatId::Number(n) => n.to_string(),
    })
}

/// Official exchange holidays for the Persian years 1404 and 1405, as
/// Gregorian dates.
pub const DEFAULT_HOLIDAYS: &[&str] = &[
    // 1404
    "2025-03-21", "2025-03-22", "2025-03-23", "2025-03-24",
    "2025-04-01", "2025-04-02", "2025-06-04", "2025-06-05",
    "2025-07-02", "2025-07-10", "2025-07-11", "2025-08-06",
    "2025-09-17", "2025-09-26", "2025-10-10", "2025-10-11",
    "2025-11-19", "2025-11-29", "2025-12-01", "2025-12-08",
    "2026-02-09", "2026-02-22", "2026-03-06", "2026-03-16",
    // 1405
    "2026-03-21", "2026-03-22", "2026-03-23", "2026-03-24",
    "2026-04-01", "2026-04-02", "2026-06-04", "2026-06-05",
    "2026-06-20", "2026-06-29", "2026-06-30", "2026-07-26",
    "2026-09-06", "2026-09-14", "2026-09-29", "2026-09-30",
    "2026-11-08", "2026-11-18", "2026-11-20", "2026-11-27",
    "2027-01-29", "2027-02-11", "2027-02-23", "2027-03-05",
];

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    pub timezone: String,
    /// Session open, `HH:MM` local time.
    pub open: String,
    /// Session close, `HH:MM` local time.
    pub close: String,
    /// Working weekdays, Saturday = 0 through Friday = 6.
    pub working_days: Vec<u8>,
    /// Closed dates, `YYYY-MM-DD`.
    pub holidays: Vec<String>,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            timezone: "Asia/Tehran".to_string(),
            open: "08:00".to_string(),
            close: "12:30".to_string(),
            working_days: vec![0, 1, 2, 3, 4],
            holidays: DEFAULT_HOLIDAYS.iter().map(ToString::to_string).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Upper bound on concurrent in-flight sends.
    pub max_in_flight: usize,
    /// Minimum spacing between two consecutive send starts.
    pub min_send_spacing_ms: u64,
    pub default_batch_size: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_in_flight: 2,
            min_send_spacing_ms: 3000,
            default_batch_size: 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// Local time after which the daily summary may run, `HH:MM`.
    pub not_before: String,
    /// Minimum number of distinct rules a symbol must trigger.
    pub min_count: usize,
    pub max_symbols: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            not_before: "12:30".to_string(),
            min_count: 2,
            max_symbols: 30,
        }
    }
}

/// Settings shared by every rule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuleToggle {
    pub enabled: bool,
    /// Overrides `dispatch.default_batch_size` for this rule.
    pub batch_size: Option<usize>,
}

impl Default for RuleToggle {
    fn default() -> Self {
        Self {
            enabled: true,
            batch_size: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RulesConfig {
    pub strong_buying: StrongBuyingConfig,
    pub per_capita_cross: PerCapitaCrossConfig,
    pub watchlist: WatchlistConfig,
    pub ceiling_queue: CeilingQueueConfig,
    pub real_money_ratio: RealMoneyRatioConfig,
    pub tick_time: TickTimeConfig,
    pub suspicious_volume: SuspiciousVolumeConfig,
    pub swing_trade: SwingTradeConfig,
    pub first_hour: FirstHourConfig,
    pub heavy_buy_queue: HeavyBuyQueueConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StrongBuyingConfig {
    #[serde(flatten)]
    pub toggle: RuleToggle,
    pub min_value_ratio: f64,
    pub min_buy_per_capita: f64,
    pub min_buy_power: f64,
    /// Also require buy power above its five-day average.
    pub require_above_5d_avg: bool,
}

impl Default for StrongBuyingConfig {
    fn default() -> Self {
        Self {
            toggle: RuleToggle::default(),
            min_value_ratio: 1.0,
            min_buy_per_capita: 50.0,
            min_buy_power: 1.0,
            require_above_5d_avg: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PerCapitaCrossConfig {
    #[serde(flatten)]
    pub toggle: RuleToggle,
    pub min_value_ratio: f64,
}

impl Default for PerCapitaCrossConfig {
    fn default() -> Self {
        Self {
            toggle: RuleToggle::default(),
            min_value_ratio: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchlistConfig {
    #[serde(flatten)]
    pub toggle: RuleToggle,
    /// Symbol to minimum last-price change percent.
    pub symbols: BTreeMap<String, f64>,
}

impl Default for WatchlistConfig {
    fn default() -> Self {
        let symbols = ["فولاد", "خودرو", "شپنا", "فملی"]
            .into_iter()
            .map(|s| (s.to_string(), 2.99))
            .collect();
        Self {
            toggle: RuleToggle::default(),
            symbols,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CeilingQueueConfig {
    #[serde(flatten)]
    pub toggle: RuleToggle,
    /// Maximum distance of the last price below the ceiling, in percent.
    pub price_range_pct: f64,
    pub min_buy_queue_value: f64,
    pub max_sell_queue_value: f64,
}

impl Default for CeilingQueueConfig {
    fn default() -> Self {
        Self {
            toggle: RuleToggle::default(),
            price_range_pct: 5.0,
            min_buy_queue_value: 1_000_000_000.0,
            max_sell_queue_value: 10_000_000.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RealMoneyRatioConfig {
    #[serde(flatten)]
    pub toggle: RuleToggle,
    pub min_ratio: f64,
    pub min_buy_per_capita: f64,
    pub min_buy_power: f64,
}

impl Default for RealMoneyRatioConfig {
    fn default() -> Self {
        Self {
            toggle: RuleToggle::default(),
            min_ratio: 0.5,
            min_buy_per_capita: 50.0,
            min_buy_power: 1.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TickTimeConfig {
    #[serde(flatten)]
    pub toggle: RuleToggle,
    /// `first_to_low_ratio * first_price` must exceed the day's low.
    pub first_to_low_ratio: f64,
    /// `last_to_first_ratio * last_price` must exceed the first price.
    pub last_to_first_ratio: f64,
    pub min_tick_diff: f64,
}

impl Default for TickTimeConfig {
    fn default() -> Self {
        Self {
            toggle: RuleToggle::default(),
            first_to_low_ratio: 0.98,
            last_to_first_ratio: 0.98,
            min_tick_diff: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SuspiciousVolumeConfig {
    #[serde(flatten)]
    pub toggle: RuleToggle,
    pub min_value_ratio: f64,
}

impl Default for SuspiciousVolumeConfig {
    fn default() -> Self {
        Self {
            toggle: RuleToggle::default(),
            min_value_ratio: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SwingTradeConfig {
    #[serde(flatten)]
    pub toggle: RuleToggle,
    /// Lower price limit of the day, in percent. The low must sit on it and
    /// the last price must have recovered above it.
    pub floor_pct: f64,
    /// The last change must still be below this percent.
    pub max_last_change_pct: f64,
    pub min_buy_power: f64,
    pub min_buy_per_capita: f64,
    pub min_value_ratio: f64,
}

impl Default for SwingTradeConfig {
    fn default() -> Self {
        Self {
            toggle: RuleToggle::default(),
            floor_pct: -3.0,
            max_last_change_pct: -2.0,
            min_buy_power: 2.0,
            min_buy_per_capita: 50.0,
            min_value_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FirstHourConfig {
    #[serde(flatten)]
    pub toggle: RuleToggle,
    /// First local hour (inclusive) in which the rule may fire.
    pub start_hour: u32,
    /// Local hour (exclusive) from which the rule stops firing.
    pub end_hour: u32,
    pub min_value_ratio: f64,
}

impl Default for FirstHourConfig {
    fn default() -> Self {
        Self {
            toggle: RuleToggle::default(),
            start_hour: 9,
            end_hour: 10,
            min_value_ratio: 1.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HeavyBuyQueueConfig {
    #[serde(flatten)]
    pub toggle: RuleToggle,
    /// Same unit as the provider's `buy_queue_value`.
    pub min_buy_queue_value: f64,
    pub min_buy_queue_per_order: f64,
    /// Also require the last price to sit at the ceiling.
    pub require_ceiling: bool,
}

impl Default for HeavyBuyQueueConfig {
    fn default() -> Self {
        Self {
            toggle: RuleToggle::default(),
            min_buy_queue_value: 10_000_000_000.0,
            min_buy_queue_per_order: 70_000_000.0,
            require_ceiling: true,
        }
    }
}
