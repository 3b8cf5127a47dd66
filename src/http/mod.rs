//! HTTP client module
//!
//! The transport the auth interceptor sits on.
//!
//! # Features
//!
//! - **Transport trait**: the continuation the interceptor hands requests to
//! - **Automatic Retries**: timeouts, connect errors and 502/503/504 only
//! - **Rate Limiting**: Token bucket rate limiter using governor
//! - **Status Mapping**: 4xx/5xx become `Error::HttpStatus`

mod client;
mod rate_limit;
mod transport;

pub use client::{HttpClient, HttpClientConfig, HttpClientConfigBuilder, RequestConfig};
pub use rate_limit::{RateLimiter, RateLimiterConfig};
pub use transport::Transport;
