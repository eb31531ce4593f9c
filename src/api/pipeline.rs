//! Authenticated, rate-limited request execution.
//!
//! Every call waits for a rate limiter slot, signs the request, sends it and
//! folds whatever happens into a [`RequestOutcome`]. Nothing here returns an
//! error to the caller.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::credentials::Credentials;
use super::outcome::{RequestFailure, RequestOutcome, Response};
use super::rate_limiter::RateLimiter;
use super::signer::Signer;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const ACCESS_KEY: HeaderName = HeaderName::from_static("kalshi-access-key");
const ACCESS_SIGNATURE: HeaderName = HeaderName::from_static("kalshi-access-signature");
const ACCESS_TIMESTAMP: HeaderName = HeaderName::from_static("kalshi-access-timestamp");

/// Sends signed requests to one exchange base URL.
pub struct RequestPipeline {
    http: Client,
    api_key: String,
    base_url: String,
    signer: Signer,
    limiter: Arc<RateLimiter>,
}

impl RequestPipeline {
    /// Build a pipeline. Fails if the private key cannot be parsed.
    pub fn new(credentials: &Credentials, limiter: Arc<RateLimiter>) -> Result<Self> {
        let signer = credentials
            .signer()
            .context("Invalid private signing key")?;

        let http = Client::builder()
            .timeout(DEFAULT_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            api_key: credentials.api_key.clone(),
            base_url: credentials.base_url.clone(),
            signer,
            limiter,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> RequestOutcome<T> {
        self.execute(Method::GET, path, None).await
    }

    pub async fn post<T, B>(&self, path: &str, body: &B) -> RequestOutcome<T>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let body = match serde_json::to_vec(body) {
            Ok(body) => body,
            Err(e) => {
                return RequestFailure::setup_failed(
                    "ERR_SERIALIZE",
                    format!("could not serialize request body: {}", e),
                )
                .into()
            }
        };

        self.execute(Method::POST, path, Some(body)).await
    }

    /// Send one request and classify the result.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> RequestOutcome<T> {
        self.limiter.wait_for_slot().await;

        let timestamp = Utc::now().timestamp_millis().to_string();
        let signature = match self.signer.sign(&timestamp, method.as_str(), path) {
            Ok(signature) => signature,
            Err(e) => return RequestFailure::setup_failed("ERR_SIGNING", e.to_string()).into(),
        };

        let has_body = body.is_some() && is_write(&method);
        let headers = match self.build_headers(&timestamp, &signature, has_body) {
            Ok(headers) => headers,
            Err(e) => return RequestFailure::setup_failed("ERR_BAD_OPTION_VALUE", e).into(),
        };

        let url = format!("{}{}", self.base_url, path);
        debug!(method = %method, url = %url, "Sending request");

        let mut request = self.http.request(method, &url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => return classify_send_error(&e).into(),
        };

        let status = response.status();
        let status_text = status.canonical_reason().unwrap_or("").to_string();
        let headers = response.headers().clone();

        let bytes = match response.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => return RequestFailure::no_response(error_code(&e), error_chain(&e)).into(),
        };

        if !status.is_success() {
            debug!(status = status.as_u16(), "Request rejected");
            return RequestFailure::rejected(status.as_u16(), &status_text, headers, body_value(&bytes))
                .into();
        }

        match serde_json::from_slice::<T>(&bytes) {
            Ok(data) => Response {
                status: status.as_u16(),
                status_text,
                headers,
                data,
            }
            .into(),
            Err(e) => RequestFailure::undecodable(
                status.as_u16(),
                &status_text,
                headers,
                e.to_string(),
                body_value(&bytes),
            )
            .into(),
        }
    }

    fn build_headers(
        &self,
        timestamp: &str,
        signature: &str,
        has_body: bool,
    ) -> std::result::Result<HeaderMap, String> {
        let value = |v: &str| HeaderValue::from_str(v).map_err(|e| format!("invalid header value: {}", e));

        let mut headers = HeaderMap::new();
        headers.insert(ACCESS_KEY, value(&self.api_key)?);
        headers.insert(ACCESS_SIGNATURE, value(signature)?);
        headers.insert(ACCESS_TIMESTAMP, value(timestamp)?);
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        if has_body {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(headers)
    }
}

fn is_write(method: &Method) -> bool {
    matches!(*method, Method::POST | Method::PUT | Method::PATCH)
}

/// Builder errors never left the process; everything else was dispatched
/// and simply got no usable response.
fn classify_send_error(e: &reqwest::Error) -> RequestFailure {
    if e.is_builder() {
        RequestFailure::setup_failed("ERR_BAD_OPTION", error_chain(e))
    } else {
        RequestFailure::no_response(error_code(e), error_chain(e))
    }
}

fn error_code(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "ETIMEDOUT"
    } else if e.is_connect() {
        "ECONNREFUSED"
    } else {
        "ERR_NETWORK"
    }
}

fn error_chain(e: &(dyn std::error::Error + 'static)) -> String {
    let mut message = e.to_string();
    let mut source = e.source();
    while let Some(inner) = source {
        message.push_str(": ");
        message.push_str(&inner.to_string());
        source = inner.source();
    }
    message
}

fn body_value(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::outcome::FailureKind;
    use crate::api::signer::tests::test_pem;
    use serde::Deserialize;
    use serde_json::json;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Balance {
        balance: i64,
    }

    fn pipeline(base_url: &str) -> RequestPipeline {
        let creds = Credentials::new("key-id".to_string(), test_pem(), Some(base_url.to_string()));
        RequestPipeline::new(&creds, Arc::new(RateLimiter::default())).unwrap()
    }

    #[test]
    fn test_new_rejects_bad_key() {
        let creds = Credentials::new("key-id".to_string(), "not a key".to_string(), None);
        assert!(RequestPipeline::new(&creds, Arc::new(RateLimiter::default())).is_err());
    }

    #[tokio::test]
    async fn test_success_decodes_payload_and_sends_auth_headers() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/trade-api/v2/portfolio/balance"))
            .and(header("kalshi-access-key", "key-id"))
            .and(header_exists("kalshi-access-signature"))
            .and(header_exists("kalshi-access-timestamp"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "balance": 1234 })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome: RequestOutcome<Balance> =
            pipeline(&server.uri()).get("/trade-api/v2/portfolio/balance").await;

        let resp = outcome.into_result().unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.status_text, "OK");
        assert_eq!(resp.data.balance, 1234);
    }

    #[tokio::test]
    async fn test_get_has_no_content_type() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/social/leaderboard"))
            .and(query_param("limit", "5"))
            .respond_with(|req: &Request| {
                let status = if req.headers.contains_key("content-type") { 400 } else { 200 };
                ResponseTemplate::new(status).set_body_json(json!({ "balance": 1 }))
            })
            .mount(&server)
            .await;

        let outcome: RequestOutcome<Balance> =
            pipeline(&server.uri()).get("/v1/social/leaderboard?limit=5").await;
        assert!(outcome.is_success());
    }

    #[tokio::test]
    async fn test_post_sends_json_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/trade-api/v2/portfolio/orders"))
            .and(header("content-type", "application/json"))
            .respond_with(|req: &Request| {
                let body: Value = serde_json::from_slice(&req.body).unwrap();
                ResponseTemplate::new(201).set_body_json(json!({ "balance": body["count"] }))
            })
            .mount(&server)
            .await;

        let outcome: RequestOutcome<Balance> = pipeline(&server.uri())
            .post("/trade-api/v2/portfolio/orders", &json!({ "count": 3 }))
            .await;

        let resp = outcome.into_result().unwrap();
        assert_eq!(resp.status, 201);
        assert_eq!(resp.data.balance, 3);
    }

    #[tokio::test]
    async fn test_429_is_rejected_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(429)
                    .insert_header("retry-after", "1")
                    .set_body_json(json!({ "error": { "code": "too_many_requests" } })),
            )
            .mount(&server)
            .await;

        let outcome: RequestOutcome<Balance> =
            pipeline(&server.uri()).get("/trade-api/v2/portfolio/balance").await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.status(), 429);
        let failure = outcome.into_data().unwrap_err();
        assert_eq!(failure.kind, FailureKind::Rejected);
        assert_eq!(failure.status_text, "Too Many Requests");
        assert_eq!(failure.error.details["error"]["code"], "too_many_requests");
        assert!(failure.headers.contains_key("retry-after"));
    }

    #[tokio::test]
    async fn test_non_json_error_body_kept_as_text() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
            .mount(&server)
            .await;

        let failure = pipeline(&server.uri())
            .get::<Balance>("/x")
            .await
            .into_data()
            .unwrap_err();
        assert_eq!(failure.status, 502);
        assert_eq!(failure.error.details, Value::String("bad gateway".to_string()));
    }

    #[tokio::test]
    async fn test_undecodable_success_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "unexpected": true })))
            .mount(&server)
            .await;

        let failure = pipeline(&server.uri())
            .get::<Balance>("/x")
            .await
            .into_data()
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::Rejected);
        assert_eq!(failure.status, 200);
        assert_eq!(failure.error.details["unexpected"], true);
    }

    #[tokio::test]
    async fn test_connection_reset_is_no_response() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                let mut buf = [0u8; 1024];
                let _ = socket.read(&mut buf).await;
                drop(socket);
            }
        });

        let outcome: RequestOutcome<Balance> =
            pipeline(&format!("http://{}", addr)).get("/trade-api/v2/portfolio/balance").await;

        assert_eq!(outcome.status(), 0);
        let failure = outcome.into_data().unwrap_err();
        assert_eq!(failure.kind, FailureKind::NoResponse);
        assert_eq!(failure.status_text, "No Response");
    }

    #[tokio::test]
    async fn test_invalid_url_is_setup_failure() {
        let failure = pipeline("not a url")
            .get::<Balance>("/trade-api/v2/portfolio/balance")
            .await
            .into_data()
            .unwrap_err();
        assert_eq!(failure.kind, FailureKind::SetupFailed);
        assert_eq!(failure.status, 0);
        assert_eq!(failure.status_text, "Request Setup Failed");
    }
}
