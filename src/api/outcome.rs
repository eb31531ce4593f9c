//! Uniform result shape for every exchange request.

use reqwest::header::HeaderMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Result of one exchange call. Exactly one variant is populated.
#[derive(Debug, Clone)]
pub enum RequestOutcome<T> {
    Success(Response<T>),
    Failure(RequestFailure),
}

/// A 2xx response with a decoded payload.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub data: T,
}

/// Which stage of the request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// A response arrived but could not be accepted: non-2xx status, or a
    /// body that does not match the expected payload.
    Rejected,
    /// The request was sent but no response came back.
    NoResponse,
    /// The request could not be built or dispatched.
    SetupFailed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorDetails {
    pub message: String,
    pub code: Option<String>,
    pub details: Value,
}

/// The failure variant of [`RequestOutcome`].
#[derive(Debug, Clone, Error)]
#[error("{} (status {} {})", .error.message, .status, .status_text)]
pub struct RequestFailure {
    pub kind: FailureKind,
    pub status: u16,
    pub status_text: String,
    pub headers: HeaderMap,
    pub error: ErrorDetails,
}

impl RequestFailure {
    pub fn rejected(status: u16, status_text: &str, headers: HeaderMap, body: Value) -> Self {
        let code = if status >= 500 {
            "ERR_BAD_RESPONSE"
        } else {
            "ERR_BAD_REQUEST"
        };

        Self {
            kind: FailureKind::Rejected,
            status,
            status_text: status_text.to_string(),
            headers,
            error: ErrorDetails {
                message: format!("Request failed: {} {}", status, status_text),
                code: Some(code.to_string()),
                details: body,
            },
        }
    }

    /// A 2xx response whose body did not decode into the expected type.
    pub fn undecodable(
        status: u16,
        status_text: &str,
        headers: HeaderMap,
        reason: String,
        body: Value,
    ) -> Self {
        Self {
            kind: FailureKind::Rejected,
            status,
            status_text: status_text.to_string(),
            headers,
            error: ErrorDetails {
                message: format!("Request failed: could not decode response body: {}", reason),
                code: Some("ERR_BAD_RESPONSE".to_string()),
                details: body,
            },
        }
    }

    pub fn no_response(code: &str, details: String) -> Self {
        Self {
            kind: FailureKind::NoResponse,
            status: 0,
            status_text: "No Response".to_string(),
            headers: HeaderMap::new(),
            error: ErrorDetails {
                message: "Request failed: No response received".to_string(),
                code: Some(code.to_string()),
                details: Value::String(details),
            },
        }
    }

    pub fn setup_failed(code: &str, message: String) -> Self {
        Self {
            kind: FailureKind::SetupFailed,
            status: 0,
            status_text: "Request Setup Failed".to_string(),
            headers: HeaderMap::new(),
            error: ErrorDetails {
                message: format!("Request failed: {}", message),
                code: Some(code.to_string()),
                details: Value::String(message),
            },
        }
    }

    /// One-line summary for logs: status, code and details.
    pub fn summary(&self) -> String {
        format!(
            "status={} code={} details={}",
            self.status,
            self.error.code.as_deref().unwrap_or("-"),
            self.error.details
        )
    }
}

impl<T> RequestOutcome<T> {
    #[cfg(test)]
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    /// HTTP status, or 0 when no response was received.
    #[cfg(test)]
    pub fn status(&self) -> u16 {
        match self {
            RequestOutcome::Success(resp) => resp.status,
            RequestOutcome::Failure(failure) => failure.status,
        }
    }

    pub fn into_result(self) -> Result<Response<T>, RequestFailure> {
        match self {
            RequestOutcome::Success(resp) => Ok(resp),
            RequestOutcome::Failure(failure) => Err(failure),
        }
    }

    /// Discard response metadata and keep only the payload.
    pub fn into_data(self) -> Result<T, RequestFailure> {
        self.into_result().map(|resp| resp.data)
    }
}

impl<T> From<Response<T>> for RequestOutcome<T> {
    fn from(resp: Response<T>) -> Self {
        RequestOutcome::Success(resp)
    }
}

impl<T> From<RequestFailure> for RequestOutcome<T> {
    fn from(failure: RequestFailure) -> Self {
        RequestOutcome::Failure(failure)
    }
}

#[cfg(test)]
impl<T> Response<T> {
    /// A bare 200 response, used by in-memory exchanges.
    pub fn ok(data: T) -> Self {
        Self {
            status: 200,
            status_text: "OK".to_string(),
            headers: HeaderMap::new(),
            data,
        }
    }
}
