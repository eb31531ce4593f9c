//! SQLite journal of run reports and order decisions.
//!
//! Write-only audit trail: the ordered-markets ledger is never restored from
//! it, so every process start still begins with an observation run.

use anyhow::{Context, Result};
use sqlx::{sqlite::SqlitePoolOptions, SqlitePool};

use crate::models::{RunOutcome, RunReport};

/// Journal connection pool.
pub struct Database {
    pool: SqlitePool,
}

/// Stored run record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredRun {
    pub id: i64,
    pub is_initial: bool,
    pub outcome: String,
    pub abort_reason: Option<String>,
    pub unique_traders: i64,
    pub holdings_failures: i64,
    pub markets_seen: i64,
    pub qualifying_markets: i64,
    pub skipped_markets: i64,
    pub started_at: String,
    pub finished_at: String,
}

impl StoredRun {
    /// Qualifying markets that produced an order record (observed,
    /// simulated, placed or failed) instead of a ledger skip.
    pub fn decided_markets(&self) -> i64 {
        self.qualifying_markets - self.skipped_markets
    }
}

/// Stored order decision.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredOrder {
    pub id: i64,
    pub run_id: i64,
    pub market_ticker: String,
    pub side: String,
    pub count: i64,
    pub limit_cents: i64,
    pub quorum_size: i64,
    pub client_order_id: String,
    pub status: String,
    pub order_id: Option<String>,
    pub error_message: Option<String>,
    pub created_at: String,
}

impl Database {
    /// Open (or create) the journal. In-memory URLs get a single pinned
    /// connection so every query sees the same database.
    pub async fn new(database_url: &str) -> Result<Self> {
        let in_memory = database_url.contains(":memory:");
        let mut options = SqlitePoolOptions::new().max_connections(if in_memory { 1 } else { 5 });
        if in_memory {
            options = options.idle_timeout(None).max_lifetime(None);
        }

        let pool = options
            .connect(database_url)
            .await
            .context("Failed to connect to database")?;

        let db = Self { pool };
        db.run_migrations().await?;

        Ok(db)
    }

    async fn run_migrations(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                is_initial INTEGER NOT NULL DEFAULT 0,
                outcome TEXT NOT NULL,
                abort_reason TEXT,
                unique_traders INTEGER NOT NULL DEFAULT 0,
                holdings_failures INTEGER NOT NULL DEFAULT 0,
                markets_seen INTEGER NOT NULL DEFAULT 0,
                qualifying_markets INTEGER NOT NULL DEFAULT 0,
                skipped_markets INTEGER NOT NULL DEFAULT 0,
                started_at TEXT NOT NULL,
                finished_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create runs table")?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS orders (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id INTEGER NOT NULL,
                market_ticker TEXT NOT NULL,
                side TEXT NOT NULL,
                count INTEGER NOT NULL,
                limit_cents INTEGER NOT NULL,
                quorum_size INTEGER NOT NULL,
                client_order_id TEXT NOT NULL,
                status TEXT NOT NULL,
                order_id TEXT,
                error_message TEXT,
                created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
                FOREIGN KEY (run_id) REFERENCES runs(id)
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .context("Failed to create orders table")?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_orders_ticker ON orders(market_ticker)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Journal a run and its order records. Returns the run id.
    pub async fn record_run(&self, report: &RunReport) -> Result<i64> {
        let (outcome, abort_reason) = match &report.outcome {
            RunOutcome::Completed => ("completed", None),
            RunOutcome::Aborted { reason } => ("aborted", Some(reason.as_str())),
        };

        let mut tx = self.pool.begin().await?;

        let run_id = sqlx::query(
            r#"
            INSERT INTO runs (
                is_initial, outcome, abort_reason, unique_traders, holdings_failures,
                markets_seen, qualifying_markets, skipped_markets, started_at, finished_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(report.initial)
        .bind(outcome)
        .bind(abort_reason)
        .bind(report.unique_traders as i64)
        .bind(report.holdings_failures as i64)
        .bind(report.markets_seen as i64)
        .bind(report.qualifying_markets as i64)
        .bind(report.skipped_markets as i64)
        .bind(report.started_at.to_rfc3339())
        .bind(report.finished_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .context("Failed to insert run")?
        .last_insert_rowid();

        for order in &report.orders {
            sqlx::query(
                r#"
                INSERT INTO orders (
                    run_id, market_ticker, side, count, limit_cents, quorum_size,
                    client_order_id, status, order_id, error_message
                ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(run_id)
            .bind(&order.market_ticker)
            .bind(order.side.as_str())
            .bind(i64::from(order.count))
            .bind(i64::from(order.limit_cents))
            .bind(order.quorum_size as i64)
            .bind(&order.client_order_id)
            .bind(order.status.as_str())
            .bind(&order.order_id)
            .bind(&order.error)
            .execute(&mut *tx)
            .await
            .context("Failed to insert order")?;
        }

        tx.commit().await?;
        Ok(run_id)
    }

    /// Most recent runs first.
    pub async fn recent_runs(&self, limit: i64) -> Result<Vec<StoredRun>> {
        let runs = sqlx::query_as::<_, StoredRun>("SELECT * FROM runs ORDER BY id DESC LIMIT ?")
            .bind(limit)
            .fetch_all(&self.pool)
            .await?;
        Ok(runs)
    }

    /// Most recent order records first.
    pub async fn recent_orders(&self, limit: i64) -> Result<Vec<StoredOrder>> {
        let orders =
            sqlx::query_as::<_, StoredOrder>("SELECT * FROM orders ORDER BY id DESC LIMIT ?")
                .bind(limit)
                .fetch_all(&self.pool)
                .await?;
        Ok(orders)
    }

    /// (total, placed, failed) order records.
    pub async fn order_stats(&self) -> Result<(i64, i64, i64)> {
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders")
            .fetch_one(&self.pool)
            .await?;

        let (placed,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = 'placed'")
                .fetch_one(&self.pool)
                .await?;

        let (failed,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM orders WHERE status = 'failed'")
                .fetch_one(&self.pool)
                .await?;

        Ok((total, placed, failed))
    }
}
