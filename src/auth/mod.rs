//! Authentication module
//!
//! Bearer token injection for outgoing API requests.
//!
//! The `AuthInterceptor` reads the signed-in user's tokens from an injected
//! `TokenStore`, attaches the id token to each request that is not exempt,
//! and drops the session when the API answers 401.

mod interceptor;
mod store;
mod types;

pub use interceptor::{
    AuthInterceptor, BypassRules, ChannelListener, LogListener, SessionInvalidated,
    SessionListener, DEFAULT_BYPASS_PATTERNS, DEFAULT_LOGIN_REDIRECT,
};
pub use store::{
    clear_tokens, read_tokens, save_tokens, FileTokenStore, MemoryTokenStore, TokenStore,
    AUTH_TOKENS_KEY,
};
pub use types::{AuthTokens, IdTokenClaims};
