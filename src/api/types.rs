//! Request and response types for the Kalshi trade and social APIs.

use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Response from `GET /trade-api/v2/portfolio/balance`. Amounts in cents.
#[derive(Debug, Clone, Deserialize)]
pub struct PortfolioBalance {
    pub balance: i64,
    #[serde(default)]
    pub portfolio_value: i64,
    #[serde(default)]
    pub updated_ts: i64,
}

impl PortfolioBalance {
    pub fn balance_dollars(&self) -> Decimal {
        Decimal::new(self.balance, 2)
    }

    pub fn portfolio_value_dollars(&self) -> Decimal {
        Decimal::new(self.portfolio_value, 2)
    }
}

/// Contract side of a binary market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Yes,
    No,
}

impl Side {
    /// Positive positions hold "yes"; zero and negative map to "no".
    pub fn from_signed_position(position: i64) -> Self {
        if position > 0 {
            Side::Yes
        } else {
            Side::No
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Side::Yes => "yes",
            Side::No => "no",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Limit,
    Market,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeInForce {
    FillOrKill,
    GoodTillCanceled,
    ImmediateOrCancel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelfTradePrevention {
    TakerAtCross,
    Maker,
}

/// Body of `POST /trade-api/v2/portfolio/orders`.
#[derive(Debug, Clone, Serialize)]
pub struct OrderRequest {
    pub ticker: String,
    pub side: Side,
    pub action: OrderAction,
    pub count: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_order_id: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub order_type: Option<OrderType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub yes_price: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub no_price: Option<u32>,
    #[serde(
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub yes_price_dollars: Option<Decimal>,
    #[serde(
        with = "rust_decimal::serde::str_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub no_price_dollars: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration_ts: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_in_force: Option<TimeInForce>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_max_cost: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub post_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reduce_only: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sell_position_floor: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub self_trade_prevention_type: Option<SelfTradePrevention>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_group_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancel_order_on_pause: Option<bool>,
}

impl OrderRequest {
    /// A plain request; every optional field is unset.
    pub fn new(ticker: impl Into<String>, side: Side, action: OrderAction, count: u32) -> Self {
        Self {
            ticker: ticker.into(),
            side,
            action,
            count,
            client_order_id: None,
            order_type: None,
            yes_price: None,
            no_price: None,
            yes_price_dollars: None,
            no_price_dollars: None,
            expiration_ts: None,
            time_in_force: None,
            buy_max_cost: None,
            post_only: None,
            reduce_only: None,
            sell_position_floor: None,
            self_trade_prevention_type: None,
            order_group_id: None,
            cancel_order_on_pause: None,
        }
    }

    /// Market buy capped at `limit_cents` on the chosen side.
    pub fn market_buy(ticker: impl Into<String>, side: Side, count: u32, limit_cents: u32) -> Self {
        let mut order = Self::new(ticker, side, OrderAction::Buy, count);
        order.order_type = Some(OrderType::Market);
        match side {
            Side::Yes => order.yes_price = Some(limit_cents),
            Side::No => order.no_price = Some(limit_cents),
        }
        order
    }

    pub fn with_client_order_id(mut self, id: impl Into<String>) -> Self {
        self.client_order_id = Some(id.into());
        self
    }
}

/// Response from order placement.
#[derive(Debug, Clone, Deserialize)]
pub struct OrderResponse {
    pub order: Order,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub order_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub client_order_id: String,
    pub ticker: String,
    pub side: Side,
    pub action: OrderAction,
    #[serde(rename = "type")]
    pub order_type: OrderType,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub yes_price: i64,
    #[serde(default)]
    pub no_price: i64,
    #[serde(default)]
    pub fill_count: i64,
    #[serde(default)]
    pub remaining_count: i64,
    #[serde(default)]
    pub initial_count: i64,
    #[serde(default)]
    pub taker_fees: i64,
    #[serde(default)]
    pub maker_fees: i64,
    #[serde(default)]
    pub taker_fill_cost: i64,
    #[serde(default)]
    pub maker_fill_cost: i64,
    #[serde(default)]
    pub queue_position: i64,
    #[serde(default)]
    pub expiration_time: Option<String>,
    #[serde(default)]
    pub created_time: Option<String>,
    #[serde(default)]
    pub last_update_time: Option<String>,
    #[serde(default)]
    pub self_trade_prevention_type: Option<SelfTradePrevention>,
    #[serde(default)]
    pub order_group_id: Option<String>,
    #[serde(default)]
    pub cancel_order_on_pause: bool,
}

/// Response from `GET /trade-api/v2/events/{ticker}`.
#[derive(Debug, Clone, Deserialize)]
pub struct EventResponse {
    pub event: Event,
    #[serde(default)]
    pub markets: Vec<Market>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Event {
    pub event_ticker: String,
    #[serde(default)]
    pub series_ticker: String,
    #[serde(default)]
    pub sub_title: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub collateral_return_type: String,
    #[serde(default)]
    pub mutually_exclusive: bool,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub strike_date: Option<String>,
    #[serde(default)]
    pub strike_period: Option<String>,
    #[serde(default)]
    pub markets: Vec<Market>,
    #[serde(default)]
    pub available_on_brokers: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Market {
    pub ticker: String,
    #[serde(default)]
    pub event_ticker: String,
    #[serde(default)]
    pub market_type: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub yes_sub_title: String,
    #[serde(default)]
    pub no_sub_title: String,
    #[serde(default)]
    pub open_time: Option<String>,
    #[serde(default)]
    pub close_time: Option<String>,
    #[serde(default)]
    pub expiration_time: Option<String>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub yes_bid: i64,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub yes_bid_dollars: Option<Decimal>,
    #[serde(default)]
    pub yes_ask: i64,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub yes_ask_dollars: Option<Decimal>,
    #[serde(default)]
    pub no_bid: i64,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub no_bid_dollars: Option<Decimal>,
    #[serde(default)]
    pub no_ask: i64,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub no_ask_dollars: Option<Decimal>,
    #[serde(default)]
    pub last_price: i64,
    #[serde(default, with = "rust_decimal::serde::str_option")]
    pub last_price_dollars: Option<Decimal>,
    #[serde(default)]
    pub volume: i64,
    #[serde(default)]
    pub volume_24h: i64,
    #[serde(default)]
    pub open_interest: i64,
    #[serde(default)]
    pub liquidity: i64,
    #[serde(default)]
    pub result: String,
    #[serde(default)]
    pub can_close_early: bool,
    #[serde(default)]
    pub tick_size: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub rules_primary: String,
}

/// Response from `GET /v1/social/profile/metrics`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileMetricsResponse {
    pub metrics: ProfileMetrics,
    #[serde(default)]
    pub social_id: String,
}

/// Aggregate performance of one trader. Any field may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileMetrics {
    pub signed_open_position: Option<i64>,
    pub open_interest: Option<i64>,
    pub volume: Option<i64>,
    pub dollars_traded: Option<f64>,
    pub dollars_investment: Option<f64>,
    pub pnl: Option<f64>,
    pub portfolio_value: Option<f64>,
    pub roi: Option<f64>,
    pub num_markets_traded: Option<i64>,
}

/// Ranking metric for the social leaderboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LeaderboardMetric {
    Volume,
    ProjectedPnl,
    NumMarketsTraded,
}

impl LeaderboardMetric {
    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardMetric::Volume => "volume",
            LeaderboardMetric::ProjectedPnl => "projected_pnl",
            LeaderboardMetric::NumMarketsTraded => "num_markets_traded",
        }
    }
}

impl FromStr for LeaderboardMetric {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "volume" => Ok(Self::Volume),
            "projected_pnl" | "pnl" => Ok(Self::ProjectedPnl),
            "num_markets_traded" | "markets" => Ok(Self::NumMarketsTraded),
            other => Err(format!("unknown leaderboard metric: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    AllTime,
    Yearly,
    Monthly,
    Weekly,
    Daily,
}

impl TimePeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimePeriod::AllTime => "all_time",
            TimePeriod::Yearly => "yearly",
            TimePeriod::Monthly => "monthly",
            TimePeriod::Weekly => "weekly",
            TimePeriod::Daily => "daily",
        }
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePeriod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "all_time" | "all" => Ok(Self::AllTime),
            "yearly" | "year" => Ok(Self::Yearly),
            "monthly" | "month" => Ok(Self::Monthly),
            "weekly" | "week" => Ok(Self::Weekly),
            "daily" | "day" => Ok(Self::Daily),
            other => Err(format!("unknown time period: {}", other)),
        }
    }
}

/// Leaderboard category filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LeaderboardCategory {
    Politics,
    Sports,
    /// Shown as "Culture" on the website.
    Entertainment,
    Crypto,
    /// Shown as "Climate" on the website.
    ClimateAndWeather,
    Economics,
    Mentions,
    Companies,
    Financials,
    ScienceAndTechnology,
    Health,
    World,
    Elections,
}

impl LeaderboardCategory {
    /// Query-string spelling; already form-encoded.
    pub fn as_query_value(&self) -> &'static str {
        match self {
            Self::Politics => "Politics",
            Self::Sports => "Sports",
            Self::Entertainment => "Entertainment",
            Self::Crypto => "Crypto",
            Self::ClimateAndWeather => "Climate+and+Weather",
            Self::Economics => "Economics",
            Self::Mentions => "Mentions",
            Self::Companies => "Companies",
            Self::Financials => "Financials",
            Self::ScienceAndTechnology => "Science+and+Technology",
            Self::Health => "Health",
            Self::World => "World",
            Self::Elections => "Elections",
        }
    }
}

impl FromStr for LeaderboardCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        match normalized.as_str() {
            "politics" => Ok(Self::Politics),
            "sports" => Ok(Self::Sports),
            "entertainment" | "culture" => Ok(Self::Entertainment),
            "crypto" => Ok(Self::Crypto),
            "climateandweather" | "climate" => Ok(Self::ClimateAndWeather),
            "economics" => Ok(Self::Economics),
            "mentions" => Ok(Self::Mentions),
            "companies" => Ok(Self::Companies),
            "financials" => Ok(Self::Financials),
            "scienceandtechnology" | "science" => Ok(Self::ScienceAndTechnology),
            "health" => Ok(Self::Health),
            "world" => Ok(Self::World),
            "elections" => Ok(Self::Elections),
            _ => Err(format!("unknown leaderboard category: {}", s)),
        }
    }
}

/// Parameters for `GET /v1/social/leaderboard`.
#[derive(Debug, Clone)]
pub struct LeaderboardRequest {
    pub metric: LeaderboardMetric,
    pub limit: u32,
    pub category: Option<LeaderboardCategory>,
    pub time_period: TimePeriod,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardResponse {
    #[serde(default)]
    pub rank_list: Vec<LeaderboardEntry>,
}

/// One ranked trader. Nickname is the identity used everywhere else.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardEntry {
    pub nickname: String,
    #[serde(default)]
    pub social_id: String,
    #[serde(default)]
    pub profile_image_path: String,
    #[serde(default)]
    pub value: f64,
    #[serde(default)]
    pub rank: u32,
    #[serde(default)]
    pub is_anonymous: bool,
}

/// Response from `GET /v1/social/profile/holdings`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProfileHoldingsResponse {
    #[serde(default)]
    pub holdings: Vec<Holding>,
    #[serde(default)]
    pub social_id: String,
}

/// A trader's holdings within one event.
#[derive(Debug, Clone, Deserialize)]
pub struct Holding {
    pub event_ticker: String,
    #[serde(default)]
    pub series_ticker: String,
    #[serde(default)]
    pub total_absolute_position: i64,
    #[serde(default)]
    pub market_holdings: Vec<MarketHolding>,
}

/// Net position in one market: positive is "yes", negative is "no".
#[derive(Debug, Clone, Deserialize)]
pub struct MarketHolding {
    #[serde(default)]
    pub market_id: String,
    pub market_ticker: String,
    pub signed_open_position: i64,
    #[serde(default)]
    pub pnl: f64,
}
