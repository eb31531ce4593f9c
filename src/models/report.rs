//! Per-run report returned by the copy engine.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::api::Side;

/// What happened to one order decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    /// Accepted by the exchange.
    Placed,
    /// Submission failed; the ledger keeps the entry.
    Failed,
    /// Dry run: logged, not submitted.
    Simulated,
    /// Warm-up run: recorded in the ledger only.
    Observed,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "placed",
            OrderStatus::Failed => "failed",
            OrderStatus::Simulated => "simulated",
            OrderStatus::Observed => "observed",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct OrderRecord {
    pub market_ticker: String,
    pub side: Side,
    pub count: u32,
    pub limit_cents: u32,
    pub quorum_size: usize,
    pub client_order_id: String,
    pub status: OrderStatus,
    pub order_id: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum RunOutcome {
    Completed,
    Aborted { reason: String },
}

/// Summary of one engine run.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub initial: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outcome: RunOutcome,
    pub unique_traders: usize,
    pub holdings_failures: usize,
    pub markets_seen: usize,
    pub qualifying_markets: usize,
    pub skipped_markets: usize,
    pub orders: Vec<OrderRecord>,
}

impl RunReport {
    pub fn start(initial: bool) -> Self {
        let now = Utc::now();
        Self {
            initial,
            started_at: now,
            finished_at: now,
            outcome: RunOutcome::Completed,
            unique_traders: 0,
            holdings_failures: 0,
            markets_seen: 0,
            qualifying_markets: 0,
            skipped_markets: 0,
            orders: Vec::new(),
        }
    }

    pub fn finish(mut self, outcome: RunOutcome) -> Self {
        self.outcome = outcome;
        self.finished_at = Utc::now();
        self
    }

    pub fn is_aborted(&self) -> bool {
        matches!(self.outcome, RunOutcome::Aborted { .. })
    }

    /// Contracts accepted by the exchange in this run.
    pub fn contracts_placed(&self) -> u64 {
        self.orders
            .iter()
            .filter(|o| o.status == OrderStatus::Placed)
            .map(|o| u64::from(o.count))
            .sum()
    }
}
