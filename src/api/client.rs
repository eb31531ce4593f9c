//! Named Kalshi operations over the request pipeline.

use async_trait::async_trait;
use url::form_urlencoded::byte_serialize;

use super::outcome::RequestOutcome;
use super::pipeline::RequestPipeline;
use super::types::*;

pub const BALANCE_PATH: &str = "/trade-api/v2/portfolio/balance";
pub const ORDERS_PATH: &str = "/trade-api/v2/portfolio/orders";

/// Holdings page size; the exchange caps it below 100.
pub const HOLDINGS_LIMIT: u32 = 99;

/// Exchange operations the copy engine depends on.
#[async_trait]
pub trait ExchangeApi: Send + Sync {
    async fn get_portfolio_balance(&self) -> RequestOutcome<PortfolioBalance>;

    async fn order(&self, request: &OrderRequest) -> RequestOutcome<OrderResponse>;

    async fn get_event(&self, event_ticker: &str) -> RequestOutcome<EventResponse>;

    async fn get_profile_metrics(&self, nickname: &str) -> RequestOutcome<ProfileMetricsResponse>;

    async fn get_social_leaderboard(
        &self,
        request: &LeaderboardRequest,
    ) -> RequestOutcome<LeaderboardResponse>;

    async fn get_profile_holdings(&self, nickname: &str) -> RequestOutcome<ProfileHoldingsResponse>;
}

/// Kalshi REST client.
pub struct ExchangeClient {
    pipeline: RequestPipeline,
}

impl ExchangeClient {
    pub fn new(pipeline: RequestPipeline) -> Self {
        Self { pipeline }
    }

    pub fn base_url(&self) -> &str {
        self.pipeline.base_url()
    }
}

#[async_trait]
impl ExchangeApi for ExchangeClient {
    async fn get_portfolio_balance(&self) -> RequestOutcome<PortfolioBalance> {
        self.pipeline.get(BALANCE_PATH).await
    }

    async fn order(&self, request: &OrderRequest) -> RequestOutcome<OrderResponse> {
        self.pipeline.post(ORDERS_PATH, request).await
    }

    async fn get_event(&self, event_ticker: &str) -> RequestOutcome<EventResponse> {
        self.pipeline.get(&event_path(event_ticker)).await
    }

    async fn get_profile_metrics(&self, nickname: &str) -> RequestOutcome<ProfileMetricsResponse> {
        self.pipeline.get(&profile_metrics_path(nickname)).await
    }

    async fn get_social_leaderboard(
        &self,
        request: &LeaderboardRequest,
    ) -> RequestOutcome<LeaderboardResponse> {
        self.pipeline.get(&leaderboard_path(request)).await
    }

    async fn get_profile_holdings(&self, nickname: &str) -> RequestOutcome<ProfileHoldingsResponse> {
        self.pipeline.get(&profile_holdings_path(nickname)).await
    }
}

fn encode(value: &str) -> String {
    byte_serialize(value.as_bytes()).collect()
}

pub fn event_path(event_ticker: &str) -> String {
    format!("/trade-api/v2/events/{}", encode(event_ticker))
}

pub fn profile_metrics_path(nickname: &str) -> String {
    format!(
        "/v1/social/profile/metrics?nickname={}&since_day_before=0",
        encode(nickname)
    )
}

pub fn leaderboard_path(request: &LeaderboardRequest) -> String {
    let mut path = format!(
        "/v1/social/leaderboard?metric_name={}&limit={}",
        request.metric.as_str(),
        request.limit
    );
    if let Some(category) = request.category {
        path.push_str("&category=");
        path.push_str(category.as_query_value());
    }
    path.push_str("&time_period=");
    path.push_str(request.time_period.as_str());
    path
}

pub fn profile_holdings_path(nickname: &str) -> String {
    format!(
        "/v1/social/profile/holdings?nickname={}&limit={}&closed_positions=false",
        encode(nickname),
        HOLDINGS_LIMIT
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::credentials::Credentials;
    use crate::api::rate_limiter::RateLimiter;
    use crate::api::signer::tests::test_pem;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> ExchangeClient {
        let creds = Credentials::new("key-id".to_string(), test_pem(), Some(base_url.to_string()));
        let pipeline = RequestPipeline::new(&creds, Arc::new(RateLimiter::default())).unwrap();
        ExchangeClient::new(pipeline)
    }

    #[test]
    fn test_leaderboard_path() {
        let request = LeaderboardRequest {
            metric: LeaderboardMetric::ProjectedPnl,
            limit: 99,
            category: None,
            time_period: TimePeriod::AllTime,
        };
        assert_eq!(
            leaderboard_path(&request),
            "/v1/social/leaderboard?metric_name=projected_pnl&limit=99&time_period=all_time"
        );

        let request = LeaderboardRequest {
            category: Some(LeaderboardCategory::ClimateAndWeather),
            time_period: TimePeriod::Monthly,
            ..request
        };
        assert_eq!(
            leaderboard_path(&request),
            "/v1/social/leaderboard?metric_name=projected_pnl&limit=99&category=Climate+and+Weather&time_period=monthly"
        );
    }

    #[test]
    fn test_profile_paths_encode_nickname() {
        assert_eq!(
            profile_holdings_path("big fish&co"),
            "/v1/social/profile/holdings?nickname=big+fish%26co&limit=99&closed_positions=false"
        );
        assert_eq!(
            profile_metrics_path("alice"),
            "/v1/social/profile/metrics?nickname=alice&since_day_before=0"
        );
        assert_eq!(event_path("KXFED-25DEC"), "/trade-api/v2/events/KXFED-25DEC");
    }

    #[tokio::test]
    async fn test_holdings_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/social/profile/holdings"))
            .and(query_param("nickname", "alice"))
            .and(query_param("limit", "99"))
            .and(query_param("closed_positions", "false"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "holdings": [{
                    "event_ticker": "EVT",
                    "series_ticker": "SER",
                    "total_absolute_position": 10,
                    "market_holdings": [
                        { "market_id": "m1", "market_ticker": "EVT-A", "signed_open_position": 10, "pnl": 1.0 }
                    ]
                }],
                "social_id": "s-alice"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let holdings = client(&server.uri())
            .get_profile_holdings("alice")
            .await
            .into_data()
            .unwrap();
        assert_eq!(holdings.social_id, "s-alice");
        assert_eq!(holdings.holdings[0].market_holdings[0].market_ticker, "EVT-A");
    }

    #[tokio::test]
    async fn test_order_posts_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(ORDERS_PATH))
            .and(body_partial_json(json!({
                "ticker": "EVT-A",
                "side": "yes",
                "action": "buy",
                "count": 2,
                "type": "market",
                "yes_price": 95
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "order": {
                    "order_id": "ord-1",
                    "ticker": "EVT-A",
                    "side": "yes",
                    "action": "buy",
                    "type": "market",
                    "status": "executed"
                }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = OrderRequest::market_buy("EVT-A", Side::Yes, 2, 95);
        let resp = client(&server.uri()).order(&request).await.into_result().unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(resp.data.order.order_id, "ord-1");
        assert_eq!(resp.data.order.status, "executed");
    }

    #[tokio::test]
    async fn test_leaderboard_and_balance() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/social/leaderboard"))
            .and(query_param("time_period", "yearly"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "rank_list": [
                    { "nickname": "alice", "social_id": "1", "value": 10.5, "rank": 1 },
                    { "nickname": "bob", "social_id": "2", "value": 9.0, "rank": 2 }
                ]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(BALANCE_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "balance": 1000, "portfolio_value": 250, "updated_ts": 1
            })))
            .mount(&server)
            .await;

        let client = client(&server.uri());
        let request = LeaderboardRequest {
            metric: LeaderboardMetric::ProjectedPnl,
            limit: 2,
            category: None,
            time_period: TimePeriod::Yearly,
        };
        let board = client.get_social_leaderboard(&request).await.into_data().unwrap();
        let names: Vec<_> = board.rank_list.iter().map(|e| e.nickname.as_str()).collect();
        assert_eq!(names, vec!["alice", "bob"]);

        let balance = client.get_portfolio_balance().await.into_data().unwrap();
        assert_eq!(balance.balance, 1000);
    }
}
