//! Kalshi API access: signing, rate limiting, request execution and the
//! named exchange operations built on top.

mod client;
mod credentials;
mod outcome;
mod pipeline;
mod rate_limiter;
mod signer;
mod types;

pub use client::{ExchangeApi, ExchangeClient};
pub use credentials::Credentials;
pub use outcome::RequestOutcome;
pub use pipeline::RequestPipeline;
pub use rate_limiter::RateLimiter;
pub use types::*;

#[cfg(test)]
pub use outcome::{RequestFailure, Response};
