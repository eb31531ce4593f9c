//! Bot runner: schedules copy-trading runs and journals their reports.
//!
//! Runs only observe until one of them completes; every later run may order.
//! Runs are awaited inline on a fixed grid of slots. Slots that pass while a
//! run is executing are dropped, so an overlong run is followed by the next
//! slot on the grid rather than by an immediate catch-up run.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Result};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::api::{ExchangeApi, RequestOutcome};
use crate::db::Database;
use crate::models::RunReport;
use crate::trading::{CopyConfig, CopyTradeEngine};

/// Default time between runs.
pub const DEFAULT_INTERVAL_SECS: u64 = 2 * 60 * 60;

/// Bot configuration.
#[derive(Debug, Clone, Serialize)]
pub struct BotConfig {
    /// Seconds between scheduled runs
    pub interval_secs: u64,

    /// Engine configuration
    pub copy_config: CopyConfig,
}

impl BotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.interval_secs == 0 {
            return Err(anyhow!("run interval must be at least one second"));
        }
        self.copy_config.validate().map_err(|e| anyhow!(e))
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_INTERVAL_SECS,
            copy_config: CopyConfig::default(),
        }
    }
}

/// Main bot runner.
pub struct Bot<E: ExchangeApi> {
    config: BotConfig,
    engine: CopyTradeEngine<E>,
    db: Option<Database>,
    shutdown: ShutdownHandle,
}

/// Stops the run loop between runs.
#[derive(Clone)]
struct ShutdownHandle {
    flag: Arc<AtomicBool>,
    wake: Arc<Notify>,
}

impl ShutdownHandle {
    fn new() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
            wake: Arc::new(Notify::new()),
        }
    }

    fn trigger(&self) {
        self.flag.store(true, Ordering::SeqCst);
        self.wake.notify_one();
    }

    fn is_triggered(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// First slot of the grid `origin + k * period` strictly after `now`.
fn next_slot(origin: Instant, period: Duration, now: Instant) -> Instant {
    let period_nanos = period.as_nanos().max(1);
    let elapsed = now.saturating_duration_since(origin).as_nanos();
    let offset = (elapsed / period_nanos + 1) * period_nanos;

    u64::try_from(offset)
        .ok()
        .and_then(|nanos| origin.checked_add(Duration::from_nanos(nanos)))
        .unwrap_or(now + period)
}

impl<E: ExchangeApi> Bot<E> {
    pub fn new(config: BotConfig, exchange: E, db: Option<Database>) -> Result<Self> {
        config.validate()?;
        let engine = CopyTradeEngine::new(exchange, config.copy_config.clone());

        Ok(Self {
            config,
            engine,
            db,
            shutdown: ShutdownHandle::new(),
        })
    }

    /// Check connectivity and credentials by fetching the balance.
    pub async fn initialize(&self) {
        info!("Initializing bot...");

        match self.engine.exchange().get_portfolio_balance().await {
            RequestOutcome::Success(resp) => {
                info!(
                    balance = %resp.data.balance_dollars(),
                    portfolio_value = %resp.data.portfolio_value_dollars(),
                    "Exchange connection verified"
                );
            }
            RequestOutcome::Failure(failure) => {
                warn!(
                    status = failure.status,
                    details = %failure.summary(),
                    "Could not fetch portfolio balance, continuing"
                );
            }
        }
    }

    /// Main run loop. Returns after Ctrl+C.
    pub async fn run(&mut self) -> Result<()> {
        info!(
            interval_secs = self.config.interval_secs,
            dry_run = self.config.copy_config.dry_run,
            quorum = self.config.copy_config.quorum,
            "Starting bot run loop"
        );

        // Register shutdown handler
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
                shutdown.trigger();
            }
        });

        let period = Duration::from_secs(self.config.interval_secs);
        let origin = Instant::now();
        let mut ticker = interval_at(origin, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut initial = true;
        while !self.shutdown.is_triggered() {
            // The first tick completes immediately.
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.shutdown.wake.notified() => break,
            }

            let report = self.run_once(initial).await;

            // An aborted run leaves the ledger untouched, so keep observing.
            initial = initial && report.is_aborted();

            // Slots that passed during the run are dropped, not queued.
            ticker.reset_at(next_slot(origin, period, Instant::now()));
        }

        self.finish().await;
        Ok(())
    }

    /// One engine run, journaled when a database is attached.
    pub async fn run_once(&mut self, initial: bool) -> RunReport {
        let report = self.engine.run(initial).await;

        if let Some(db) = &self.db {
            match db.record_run(&report).await {
                Ok(run_id) => info!(run_id, orders = report.orders.len(), "Run journaled"),
                Err(e) => warn!(error = %e, "Failed to journal run"),
            }
        }

        report
    }

    async fn finish(&self) {
        info!("Shutting down bot...");

        if let Some(db) = &self.db {
            match db.order_stats().await {
                Ok((total, placed, failed)) => {
                    info!(total, placed, failed, "Journal totals")
                }
                Err(e) => warn!(error = %e, "Failed to read journal totals"),
            }
        }

        println!("{}", self.engine.stats());
        println!("Markets in ledger: {}", self.engine.ledger().distinct_markets());
        info!("Bot shutdown complete");
    }
}
