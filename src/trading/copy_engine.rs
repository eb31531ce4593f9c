//! Copy-trading engine: turns leaderboard and holdings snapshots into
//! deduplicated market orders.

use anyhow::{Context, Result};
use chrono_tz::America::New_York;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::api::{ExchangeApi, LeaderboardRequest, OrderRequest, RequestOutcome};
use crate::models::{
    MarketGroup, MarketGroups, OrderRecord, OrderStatus, RunOutcome, RunReport, SessionStats,
    TraderRoster,
};

use super::config::{CopyConfig, DedupPolicy};
use super::ledger::{LedgerDecision, OrderedMarketsLedger};

/// Copy-trading engine state.
///
/// The ledger and session stats live for as long as the engine does. `run`
/// takes `&mut self`, so two runs can never interleave.
pub struct CopyTradeEngine<E: ExchangeApi> {
    exchange: E,
    config: CopyConfig,
    ledger: OrderedMarketsLedger,
    stats: SessionStats,
}

impl<E: ExchangeApi> CopyTradeEngine<E> {
    pub fn new(exchange: E, config: CopyConfig) -> Self {
        Self::with_state(exchange, config, OrderedMarketsLedger::new(), SessionStats::new())
    }

    /// Create an engine over existing ledger and stats.
    pub fn with_state(
        exchange: E,
        config: CopyConfig,
        ledger: OrderedMarketsLedger,
        stats: SessionStats,
    ) -> Self {
        Self {
            exchange,
            config,
            ledger,
            stats,
        }
    }

    pub fn exchange(&self) -> &E {
        &self.exchange
    }

    pub fn ledger(&self) -> &OrderedMarketsLedger {
        &self.ledger
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// Execute one full run. The first run of a process should pass
    /// `initial = true`: it fills the ledger without placing orders.
    pub async fn run(&mut self, initial: bool) -> RunReport {
        let mut report = RunReport::start(initial);
        info!(initial, policy = %self.config.dedup_policy, quorum = self.config.quorum, "Starting copy-trading run");

        let roster = match self.collect_traders().await {
            Ok(roster) => roster,
            Err(e) => {
                let reason = format!("{:#}", e);
                error!(reason = %reason, "Leaderboard collection failed, aborting run");
                let report = report.finish(RunOutcome::Aborted { reason });
                self.stats.record_run(&report);
                return report;
            }
        };
        report.unique_traders = roster.len();
        if roster.is_empty() {
            warn!("Leaderboards returned no traders");
        } else {
            info!(traders = roster.len(), "Collected unique traders");
        }

        let groups = self.collect_holdings(&roster, &mut report).await;
        report.markets_seen = groups.len();

        let qualifying = groups.with_quorum(self.config.quorum);
        report.qualifying_markets = qualifying.len();
        info!(
            markets = report.markets_seen,
            qualifying = qualifying.len(),
            quorum = self.config.quorum,
            "Grouped trader holdings by market"
        );

        for group in &qualifying {
            if let Some(record) = self.process_market(group, initial).await {
                report.orders.push(record);
            } else {
                report.skipped_markets += 1;
            }
        }

        let report = report.finish(RunOutcome::Completed);
        self.stats.record_run(&report);
        self.log_summary(&report);
        report
    }

    /// Fetch every configured leaderboard window. Any failure aborts.
    async fn collect_traders(&self) -> Result<TraderRoster> {
        let mut roster = TraderRoster::new();

        for &time_period in &self.config.time_periods {
            let request = LeaderboardRequest {
                metric: self.config.leaderboard_metric,
                limit: self.config.leaderboard_limit,
                category: self.config.leaderboard_category,
                time_period,
            };

            let board = match self.exchange.get_social_leaderboard(&request).await {
                RequestOutcome::Success(resp) => resp.data,
                RequestOutcome::Failure(failure) => {
                    warn!(period = %time_period, details = %failure.summary(), "Leaderboard request failed");
                    return Err(failure).with_context(|| format!("{} leaderboard", time_period));
                }
            };

            let added = roster.merge(&board.rank_list);
            debug!(
                period = %time_period,
                entries = board.rank_list.len(),
                new_traders = added,
                "Fetched leaderboard"
            );
        }

        Ok(roster)
    }

    /// Fetch holdings per trader. A failed trader is skipped.
    async fn collect_holdings(&self, roster: &TraderRoster, report: &mut RunReport) -> MarketGroups {
        let mut groups = MarketGroups::new();

        for nickname in roster.iter() {
            match self.exchange.get_profile_holdings(nickname).await {
                RequestOutcome::Success(resp) => {
                    let added = groups.add_holdings(nickname, &resp.data.holdings);
                    debug!(trader = %nickname, events = resp.data.holdings.len(), positions = added, "Fetched holdings");
                }
                RequestOutcome::Failure(failure) => {
                    report.holdings_failures += 1;
                    warn!(trader = %nickname, details = %failure.summary(), "Holdings request failed, skipping trader");
                }
            }
        }

        groups
    }

    /// Dedup one qualifying market against the ledger and act on it.
    /// Returns `None` when the market is skipped.
    async fn process_market(&mut self, group: &MarketGroup, initial: bool) -> Option<OrderRecord> {
        let ticker = &group.market_ticker;
        let quorum_size = group.quorum_size();
        let policy = self.config.dedup_policy;

        let decision = self
            .ledger
            .record(ticker, u32::try_from(quorum_size).unwrap_or(u32::MAX), policy);

        let new_entries = match decision {
            LedgerDecision::Skip { prior } => {
                debug!(market = %ticker, quorum = quorum_size, prior, "Already ordered, skipping");
                return None;
            }
            LedgerDecision::Order { new_entries, .. } => new_entries,
        };

        let count = match policy {
            DedupPolicy::Counting => new_entries,
            DedupPolicy::Boolean => self.config.boolean_order_count,
        };
        let side = group.representative_side();

        let mut record = OrderRecord {
            market_ticker: ticker.clone(),
            side,
            count,
            limit_cents: self.config.limit_price_cents,
            quorum_size,
            client_order_id: Uuid::new_v4().to_string(),
            status: OrderStatus::Observed,
            order_id: None,
            error: None,
        };

        if initial {
            info!(market = %ticker, side = %side, quorum = quorum_size, traders = ?group.nicknames(), "Initial run, recording market without ordering");
            return Some(record);
        }

        if self.config.dry_run {
            record.status = OrderStatus::Simulated;
            info!(market = %ticker, side = %side, count, limit = record.limit_cents, "[DRY RUN] Would place order");
            return Some(record);
        }

        let request = OrderRequest::market_buy(ticker.as_str(), side, count, record.limit_cents)
            .with_client_order_id(record.client_order_id.as_str());

        match self.exchange.order(&request).await {
            RequestOutcome::Success(resp) => {
                record.status = OrderStatus::Placed;
                info!(
                    market = %ticker,
                    side = %side,
                    count,
                    order_id = %resp.data.order.order_id,
                    status = %resp.data.order.status,
                    "Order placed"
                );
                record.order_id = Some(resp.data.order.order_id);
            }
            RequestOutcome::Failure(failure) => {
                record.status = OrderStatus::Failed;
                error!(
                    market = %ticker,
                    side = %side,
                    count,
                    status = failure.status,
                    details = %failure.summary(),
                    "Order failed"
                );
                record.error = Some(failure.to_string());
            }
        }

        Some(record)
    }

    fn log_summary(&self, report: &RunReport) {
        let finished = report.finished_at.with_timezone(&New_York);
        info!(
            completed_at = %finished.format("%Y-%m-%d %H:%M:%S %Z"),
            orders_this_run = report.contracts_placed(),
            total_orders = self.stats.total_orders_placed,
            total_runs = self.stats.total_runs,
            markets_ordered = self.ledger.len(),
            "Run complete"
        );
    }
}
