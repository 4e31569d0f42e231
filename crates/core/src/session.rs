//! Trading session calendar.
//!
//! Decides whether the exchange is open at a given instant, using a local
//! timezone, a set of working weekdays (Saturday = 0), a holiday list, and an
//! open/close window.

use crate::config::MarketConfig;
use crate::error::ConfigError;
use crate::types::DayKey;
use chrono::{DateTime, Datelike, NaiveDate, NaiveTime, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Open,
    NonWorkingDay,
    Holiday,
    BeforeOpen,
    AfterClose,
}

impl SessionState {
    #[must_use]
    pub const fn is_open(self) -> bool {
        matches!(self, Self::Open)
    }
}

#[derive(Debug, Clone)]
pub struct MarketSession {
    tz: Tz,
    open: NaiveTime,
    close: NaiveTime,
    working_days: HashSet<u8>,
    holidays: HashSet<NaiveDate>,
}

impl MarketSession {
    /// Builds a session calendar from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] for an unknown timezone, an unparsable
    /// time or date, or a window that closes before it opens.
    pub fn from_config(config: &MarketConfig) -> Result<Self, ConfigError> {
        let tz: Tz = config
            .timezone
            .parse()
            .map_err(|e| ConfigError::invalid("market.timezone", format!("{e}")))?;
        let open = parse_hhmm("market.open", &config.open)?;
        let close = parse_hhmm("market.close", &config.close)?;
        if close <= open {
            return Err(ConfigError::invalid(
                "market.close",
                "must be later than market.open",
            ));
        }

        let mut working_days = HashSet::new();
        for day in &config.working_days {
            if *day > 6 {
                return Err(ConfigError::invalid(
                    "market.working_days",
                    format!("{day} is not a weekday index (0..=6)"),
                ));
            }
            working_days.insert(*day);
        }

        let holidays = config
            .holidays
            .iter()
            .map(|d| {
                NaiveDate::parse_from_str(d, "%Y-%m-%d")
                    .map_err(|e| ConfigError::invalid("market.holidays", format!("{d}: {e}")))
            })
            .collect::<Result<HashSet<_>, _>>()?;

        Ok(Self {
            tz,
            open,
            close,
            working_days,
            holidays,
        })
    }

    #[must_use]
    pub fn local(&self, now: DateTime<Utc>) -> DateTime<Tz> {
        now.with_timezone(&self.tz)
    }

    /// Day partition of `now` in the exchange timezone.
    #[must_use]
    pub fn day_key(&self, now: DateTime<Utc>) -> DayKey {
        DayKey::for_instant(&self.local(now))
    }

    /// Local wall-clock hour, used by hour-gated rules.
    #[must_use]
    pub fn local_hour(&self, now: DateTime<Utc>) -> u32 {
        self.local(now).hour()
    }

    #[must_use]
    pub fn state_at(&self, now: DateTime<Utc>) -> SessionState {
        let local = self.local(now);
        if !self.is_working_day(local.date_naive()) {
            return SessionState::NonWorkingDay;
        }
        if self.holidays.contains(&local.date_naive()) {
            return SessionState::Holiday;
        }
        let time = local.time();
        if time < self.open {
            SessionState::BeforeOpen
        } else if time > self.close {
            SessionState::AfterClose
        } else {
            SessionState::Open
        }
    }

    /// True on a working, non-holiday day at or after `at` local time.
    #[must_use]
    pub fn is_trading_day_after(&self, now: DateTime<Utc>, at: NaiveTime) -> bool {
        let local = self.local(now);
        let date = local.date_naive();
        self.is_working_day(date) && !self.holidays.contains(&date) && local.time() >= at
    }

    fn is_working_day(&self, date: NaiveDate) -> bool {
        self.working_days.contains(&weekday_index(date.weekday()))
    }
}

/// Weekday index with Saturday = 0.
#[must_use]
pub fn weekday_index(weekday: Weekday) -> u8 {
    // num_days_from_monday: Mon = 0 .. Sun = 6
    ((weekday.num_days_from_monday() + 2) % 7) as u8
}

/// Parses a `HH:MM` setting.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming `field` when the value does not parse.
pub fn parse_hhmm(field: &str, value: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(value, "%H:%M")
        .map_err(|e| ConfigError::invalid(field, format!("{value:?}: {e}")))
}
