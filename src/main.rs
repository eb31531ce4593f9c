//! Kalshi Copy-Trading Bot
//!
//! Scans the social leaderboard, groups the top traders' open positions by
//! market and buys into markets held by a quorum of them.

mod api;
mod bot;
mod db;
mod models;
mod trading;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::{
    Credentials, ExchangeApi, ExchangeClient, LeaderboardCategory, LeaderboardMetric,
    LeaderboardRequest, RateLimiter, RequestPipeline, TimePeriod,
};
use crate::bot::{Bot, BotConfig, DEFAULT_INTERVAL_SECS};
use crate::db::Database;
use crate::trading::{CopyConfig, DedupPolicy};

/// Kalshi copy-trading bot CLI.
#[derive(Parser)]
#[command(name = "kalshi-copier")]
#[command(about = "Mirror markets held by a quorum of Kalshi leaderboard traders", long_about = None)]
struct Cli {
    /// JSON credential file (apiKey, privateKeyPem or privateKeyPath, baseUrl).
    /// Falls back to KALSHI_* environment variables.
    #[arg(short, long, env = "KALSHI_CONFIG")]
    config: Option<PathBuf>,

    /// Order journal database
    #[arg(short, long, default_value = "sqlite:./kalshi-copier.db?mode=rwc")]
    database: String,

    /// Log level (trace, debug, info, warn, error); RUST_LOG overrides
    #[arg(short, long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the copy-trading bot
    Run {
        /// Seconds between runs
        #[arg(short, long, default_value_t = DEFAULT_INTERVAL_SECS)]
        interval: u64,

        /// Dry run (log orders instead of placing them)
        #[arg(long)]
        dry_run: bool,

        /// Minimum number of traders holding a market
        #[arg(short, long, default_value = "2")]
        quorum: usize,

        /// Dedup policy across runs (counting, boolean)
        #[arg(short, long, default_value = "counting")]
        policy: DedupPolicy,

        /// Do not journal runs to the database
        #[arg(long)]
        no_journal: bool,
    },

    /// Show portfolio balance
    Balance,

    /// Show a leaderboard slice
    Leaderboard {
        /// Ranking metric (volume, projected_pnl, num_markets_traded)
        #[arg(short, long, default_value = "projected_pnl")]
        metric: LeaderboardMetric,

        /// Time period (all_time, yearly, monthly, weekly, daily)
        #[arg(short, long, default_value = "all_time")]
        period: TimePeriod,

        /// Category filter (e.g. politics, sports, crypto)
        #[arg(short, long)]
        category: Option<LeaderboardCategory>,

        /// Number of traders
        #[arg(short = 'n', long, default_value = "20")]
        limit: u32,
    },

    /// Show a trader's open holdings
    Holdings {
        /// Trader nickname
        nickname: String,
    },

    /// Show a trader's aggregate metrics
    Metrics {
        /// Trader nickname
        nickname: String,
    },

    /// Show an event and its markets
    Event {
        /// Event ticker
        ticker: String,
    },

    /// Show journaled runs and orders
    History {
        /// Number of rows
        #[arg(short = 'n', long, default_value = "10")]
        limit: i64,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    // Setup logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level.to_lowercase()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    match cli.command {
        Commands::Run {
            interval,
            dry_run,
            quorum,
            policy,
            no_journal,
        } => {
            let config = BotConfig {
                interval_secs: interval,
                copy_config: CopyConfig {
                    quorum,
                    dedup_policy: policy,
                    dry_run,
                    ..Default::default()
                },
            };

            let client = connect(cli.config.as_deref())?;
            info!(base_url = %client.base_url(), "Exchange client ready");

            let db = if no_journal {
                None
            } else {
                Some(Database::new(&cli.database).await?)
            };

            let mut bot = Bot::new(config, client, db)?;
            bot.initialize().await;
            bot.run().await?;
        }

        Commands::Balance => {
            let client = connect(cli.config.as_deref())?;
            let balance = client.get_portfolio_balance().await.into_data()?;

            println!("\n=== Portfolio ===");
            println!("Balance:         ${:.2}", balance.balance_dollars());
            println!("Portfolio Value: ${:.2}", balance.portfolio_value_dollars());
        }

        Commands::Leaderboard {
            metric,
            period,
            category,
            limit,
        } => {
            let client = connect(cli.config.as_deref())?;
            let request = LeaderboardRequest {
                metric,
                limit,
                category,
                time_period: period,
            };
            let board = client.get_social_leaderboard(&request).await.into_data()?;

            println!("\n{:>5} {:<30} {:>16}", "RANK", "NICKNAME", metric.as_str().to_uppercase());
            println!("{}", "-".repeat(53));

            for entry in board.rank_list {
                println!(
                    "{:>5} {:<30} {:>16.2}",
                    entry.rank,
                    truncate(&entry.nickname, 28),
                    entry.value
                );
            }
        }

        Commands::Holdings { nickname } => {
            let client = connect(cli.config.as_deref())?;
            let holdings = client.get_profile_holdings(&nickname).await.into_data()?;

            if holdings.holdings.is_empty() {
                println!("{} has no open holdings.", nickname);
                return Ok(());
            }

            println!("\n{:<36} {:<8} {:>10} {:>12}", "MARKET", "SIDE", "POSITION", "P&L");
            println!("{}", "-".repeat(69));

            for holding in &holdings.holdings {
                for market in &holding.market_holdings {
                    println!(
                        "{:<36} {:<8} {:>10} {:>12.2}",
                        truncate(&market.market_ticker, 34),
                        api::Side::from_signed_position(market.signed_open_position).as_str(),
                        market.signed_open_position.abs(),
                        market.pnl
                    );
                }
            }
        }

        Commands::Metrics { nickname } => {
            let client = connect(cli.config.as_deref())?;
            let resp = client.get_profile_metrics(&nickname).await.into_data()?;
            let m = resp.metrics;

            println!("\n=== Trader: {} ===", nickname);
            println!("Volume:           {}", m.volume.unwrap_or(0));
            println!("Dollars Traded:   ${:.2}", m.dollars_traded.unwrap_or(0.0));
            println!("P&L:              ${:.2}", m.pnl.unwrap_or(0.0));
            println!("ROI:              {:.1}%", m.roi.unwrap_or(0.0) * 100.0);
            println!("Markets Traded:   {}", m.num_markets_traded.unwrap_or(0));
            println!("Open Interest:    {}", m.open_interest.unwrap_or(0));
        }

        Commands::Event { ticker } => {
            let client = connect(cli.config.as_deref())?;
            let resp = client.get_event(&ticker).await.into_data()?;

            println!("\n=== {} ===", resp.event.title);
            println!("Event:    {}", resp.event.event_ticker);
            println!("Series:   {}", resp.event.series_ticker);
            println!("Category: {}", resp.event.category);

            println!("\n{:<36} {:<10} {:>8} {:>8} {:>10}", "MARKET", "STATUS", "YES BID", "YES ASK", "VOLUME");
            println!("{}", "-".repeat(76));
            for market in &resp.markets {
                println!(
                    "{:<36} {:<10} {:>8} {:>8} {:>10}",
                    truncate(&market.ticker, 34),
                    market.status,
                    market.yes_bid,
                    market.yes_ask,
                    market.volume
                );
            }
        }

        Commands::History { limit } => {
            let db = Database::new(&cli.database).await?;
            let runs = db.recent_runs(limit).await?;

            if runs.is_empty() {
                println!("No runs journaled yet. Use 'kalshi-copier run' to start.");
                return Ok(());
            }

            println!(
                "\n{:>5} {:<26} {:<10} {:>8} {:>10} {:>8}",
                "RUN", "FINISHED", "OUTCOME", "TRADERS", "QUALIFYING", "DECIDED"
            );
            println!("{}", "-".repeat(72));
            for run in &runs {
                let outcome = if run.is_initial {
                    format!("{}*", run.outcome)
                } else {
                    run.outcome.clone()
                };
                println!(
                    "{:>5} {:<26} {:<10} {:>8} {:>10} {:>8}",
                    run.id,
                    truncate(&run.finished_at, 25),
                    outcome,
                    run.unique_traders,
                    run.qualifying_markets,
                    run.decided_markets()
                );
            }
            println!("(* = observation-only initial run; DECIDED = qualifying markets not skipped by the ledger)");

            let orders = db.recent_orders(limit).await?;
            println!("\n{:<30} {:<5} {:>5} {:<10} {:<20}", "MARKET", "SIDE", "QTY", "STATUS", "ORDER ID");
            println!("{}", "-".repeat(74));
            for order in &orders {
                println!(
                    "{:<30} {:<5} {:>5} {:<10} {:<20}",
                    truncate(&order.market_ticker, 28),
                    order.side,
                    order.count,
                    order.status,
                    order.order_id.as_deref().unwrap_or("-")
                );
            }

            let (total, placed, failed) = db.order_stats().await?;
            println!("\nTotal: {} (Placed: {}, Failed: {})", total, placed, failed);
        }

        Commands::Config => {
            let config = BotConfig::default();
            println!("=== Bot Configuration ===");
            println!("{}", serde_json::to_string_pretty(&config)?);
            println!("\nDatabase: {}", cli.database);
        }
    }

    Ok(())
}

/// Build an authenticated client from the credential file or environment.
fn connect(config: Option<&std::path::Path>) -> Result<ExchangeClient> {
    let credentials = match config {
        Some(path) => Credentials::from_file(path)?,
        None => Credentials::from_env().context("No --config given and environment is incomplete")?,
    };
    let pipeline = RequestPipeline::new(&credentials, Arc::new(RateLimiter::default()))?;
    Ok(ExchangeClient::new(pipeline))
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let head: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", head)
    }
}
