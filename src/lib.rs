// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::unused_self)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Gallery Kit
//!
//! Client plumbing and infrastructure definitions for a photographer's
//! gallery service.
//!
//! ## Features
//!
//! - **Bearer Auth**: Attach the stored id token to every API request
//! - **Session Invalidation**: Clear credentials and notify on 401
//! - **HTTP Transport**: Retries for transient failures, rate limiting
//! - **Infrastructure**: DynamoDB tables, hosted zone and wildcard certificate as templates
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use gallery_kit::auth::{AuthInterceptor, FileTokenStore, LogListener};
//! use gallery_kit::http::{HttpClient, HttpClientConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> gallery_kit::Result<()> {
//!     let store = Arc::new(FileTokenStore::new(".gallery/tokens.json"));
//!     let interceptor = AuthInterceptor::new(store, Arc::new(LogListener));
//!
//!     let config = HttpClientConfig::builder()
//!         .base_url("https://api.example.com")
//!         .build();
//!     let client = HttpClient::with_interceptor(config, interceptor)?;
//!
//!     let galleries: serde_json::Value = client.get_json("/galleries").await?;
//!     println!("{galleries}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │                          HttpClient                           │
//! │        request() → AuthInterceptor → Transport (retry)        │
//! └───────────────────────────────────────────────────────────────┘
//!                 │                              │
//! ┌───────────────┴──────────────┐  ┌────────────┴────────────────┐
//! │             Auth             │  │           Infra             │
//! ├──────────────────────────────┤  ├─────────────────────────────┤
//! │ TokenStore (memory, file)    │  │ DatabaseStack (5 tables)    │
//! │ BypassRules                  │  │ DnsStack (zone, cert)       │
//! │ SessionListener              │  │ Template (CloudFormation)   │
//! └──────────────────────────────┘  └─────────────────────────────┘
//! ```

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Token storage and the bearer interceptor
pub mod auth;

/// HTTP client with retry and rate limiting
pub mod http;

/// Application configuration
pub mod config;

/// Infrastructure stacks and template synthesis
pub mod infra;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, Result};
pub use types::*;

pub use auth::{AuthInterceptor, AuthTokens, TokenStore};
pub use config::AppConfig;
pub use http::HttpClient;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
