//! The concrete rule bank.

mod flow;
mod price;
mod queue;
mod volume;

pub use flow::{PerCapitaCross, RealMoneyRatio, StrongBuying};
pub use price::{SwingTrade, TickTime, Watchlist};
pub use queue::{CeilingQueue, HeavyBuyQueue};
pub use volume::{FirstHour, SuspiciousVolume};
