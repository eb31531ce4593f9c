//! Copy-trading configuration.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::api::{LeaderboardCategory, LeaderboardMetric, TimePeriod};

/// How repeat sightings of a market are deduplicated across runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DedupPolicy {
    /// Mirror each quorum member once: order the growth of the quorum over
    /// the highest count already mirrored.
    Counting,
    /// Mirror a market once, ever, with a fixed order size.
    Boolean,
}

impl fmt::Display for DedupPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DedupPolicy::Counting => f.write_str("counting"),
            DedupPolicy::Boolean => f.write_str("boolean"),
        }
    }
}

impl FromStr for DedupPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "counting" | "count" => Ok(DedupPolicy::Counting),
            "boolean" | "bool" | "once" => Ok(DedupPolicy::Boolean),
            other => Err(format!("unknown dedup policy: {}", other)),
        }
    }
}

/// Configuration for one copy-trading run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopyConfig {
    /// Leaderboard windows scanned every run, in order
    pub time_periods: Vec<TimePeriod>,

    /// Metric used to rank traders
    pub leaderboard_metric: LeaderboardMetric,

    /// Traders fetched per window
    pub leaderboard_limit: u32,

    /// Optional category filter for the leaderboard
    pub leaderboard_category: Option<LeaderboardCategory>,

    /// Minimum distinct traders in a market before it is mirrored
    pub quorum: usize,

    /// Cross-run deduplication rule
    pub dedup_policy: DedupPolicy,

    /// Contracts per order under the boolean policy
    pub boolean_order_count: u32,

    /// Limit price in cents on the chosen side
    pub limit_price_cents: u32,

    /// Log orders instead of submitting them
    pub dry_run: bool,
}

impl CopyConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.time_periods.is_empty() {
            return Err("at least one leaderboard time period is required".to_string());
        }
        if self.quorum == 0 {
            return Err("quorum must be at least 1".to_string());
        }
        if !(1..=99).contains(&self.limit_price_cents) {
            return Err(format!(
                "limit price must be between 1 and 99 cents, got {}",
                self.limit_price_cents
            ));
        }
        if self.dedup_policy == DedupPolicy::Boolean && self.boolean_order_count == 0 {
            return Err("boolean policy needs a positive order count".to_string());
        }
        Ok(())
    }
}

impl Default for CopyConfig {
    fn default() -> Self {
        Self {
            time_periods: vec![TimePeriod::AllTime, TimePeriod::Yearly, TimePeriod::Monthly],
            leaderboard_metric: LeaderboardMetric::ProjectedPnl,
            leaderboard_limit: 99,
            leaderboard_category: None,
            quorum: 2,
            dedup_policy: DedupPolicy::Counting,
            boolean_order_count: 1,
            limit_price_cents: 95,
            dry_run: false,
        }
    }
}
