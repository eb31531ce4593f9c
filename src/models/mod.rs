//! Data models for traders, market positions, run reports and session stats.

mod position;
mod report;
mod stats;
mod trader;

pub use position::{MarketGroup, MarketGroups};
pub use report::{OrderRecord, OrderStatus, RunOutcome, RunReport};
pub use stats::SessionStats;
pub use trader::TraderRoster;
