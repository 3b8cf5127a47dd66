//! Request authorization interceptor
//!
//! Attaches the stored id token as a bearer credential to outgoing requests
//! and invalidates the session when an authenticated request comes back 401.

use super::store::{clear_tokens, read_tokens, TokenStore, AUTH_TOKENS_KEY};
use super::types::AuthTokens;
use crate::error::Result;
use crate::http::Transport;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Request, Response};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// URL substrings exempt from bearer injection by default: the Cognito
/// token endpoint and the client-session API.
pub const DEFAULT_BYPASS_PATTERNS: [&str; 2] = ["amazoncognito.com/oauth2/token", "/client/"];

/// Where the shell should send the user after the session is dropped
pub const DEFAULT_LOGIN_REDIRECT: &str = "/";

// ============================================================================
// Bypass rules
// ============================================================================

/// URL patterns for which no authorization is attached.
///
/// Matching is a plain substring test against the full URL, query string
/// included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BypassRules {
    patterns: Vec<String>,
}

impl BypassRules {
    /// Create rules from a list of substrings
    pub fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }

    /// Rules that bypass nothing
    pub fn none() -> Self {
        Self {
            patterns: Vec::new(),
        }
    }

    /// Check whether the URL is exempt
    pub fn matches(&self, url: &str) -> bool {
        self.patterns.iter().any(|p| url.contains(p.as_str()))
    }

    /// The configured patterns
    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }
}

impl Default for BypassRules {
    fn default() -> Self {
        Self::new(DEFAULT_BYPASS_PATTERNS)
    }
}

// ============================================================================
// Session invalidation
// ============================================================================

/// Emitted once when an authenticated request is rejected with 401
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionInvalidated {
    /// Path the shell should navigate to
    pub redirect_to: String,
    /// URL of the rejected request
    pub request_url: String,
}

/// Receives session invalidation events.
///
/// This replaces a hard page redirect: the caller decides whether to
/// navigate, show a modal, or exit.
pub trait SessionListener: Send + Sync {
    /// Called after the stored credentials have been removed
    fn session_invalidated(&self, event: &SessionInvalidated);
}

/// Listener that only logs
#[derive(Debug, Clone, Copy, Default)]
pub struct LogListener;

impl SessionListener for LogListener {
    fn session_invalidated(&self, event: &SessionInvalidated) {
        warn!(
            "Session invalidated by {}; redirecting to {}",
            event.request_url, event.redirect_to
        );
    }
}

/// Listener forwarding events into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelListener {
    tx: mpsc::UnboundedSender<SessionInvalidated>,
}

impl ChannelListener {
    /// Create a listener and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<SessionInvalidated>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl SessionListener for ChannelListener {
    fn session_invalidated(&self, event: &SessionInvalidated) {
        if self.tx.send(event.clone()).is_err() {
            debug!("Session listener channel closed, dropping event");
        }
    }
}

// ============================================================================
// Interceptor
// ============================================================================

/// Bearer token interceptor
#[derive(Clone)]
pub struct AuthInterceptor {
    store: Arc<dyn TokenStore>,
    listener: Arc<dyn SessionListener>,
    bypass: BypassRules,
    token_key: String,
    redirect_to: String,
}

impl AuthInterceptor {
    /// Create an interceptor with default bypass rules, key and redirect
    pub fn new(store: Arc<dyn TokenStore>, listener: Arc<dyn SessionListener>) -> Self {
        Self {
            store,
            listener,
            bypass: BypassRules::default(),
            token_key: AUTH_TOKENS_KEY.to_string(),
            redirect_to: DEFAULT_LOGIN_REDIRECT.to_string(),
        }
    }

    /// Replace the bypass rules
    #[must_use]
    pub fn with_bypass(mut self, bypass: BypassRules) -> Self {
        self.bypass = bypass;
        self
    }

    /// Use a different storage key for the token record
    #[must_use]
    pub fn with_token_key(mut self, key: impl Into<String>) -> Self {
        self.token_key = key.into();
        self
    }

    /// Use a different redirect target on invalidation
    #[must_use]
    pub fn with_redirect(mut self, path: impl Into<String>) -> Self {
        self.redirect_to = path.into();
        self
    }

    /// Run `request` through the interceptor, sending it with `next`.
    ///
    /// The result of `next` is always returned as-is; a 401 on an
    /// authenticated request additionally clears the stored tokens and
    /// notifies the listener.
    pub async fn intercept(&self, mut request: Request, next: &dyn Transport) -> Result<Response> {
        let url = request.url().to_string();

        if self.bypass.matches(&url) {
            debug!("Bypassing authorization for {}", request.url().path());
            return next.send(request).await;
        }

        let authenticated = self.authorize(&mut request).await;

        let result = next.send(request).await;

        if let Err(ref e) = result {
            if authenticated && e.is_unauthorized() {
                self.invalidate_session(&url).await;
            }
        }

        result
    }

    /// Attach the bearer header if a token is stored. Returns whether one was attached.
    async fn authorize(&self, request: &mut Request) -> bool {
        let tokens = read_tokens(self.store.as_ref(), &self.token_key).await;
        let Some(token) = tokens.as_ref().and_then(AuthTokens::bearer) else {
            debug!("No stored token, sending {} anonymously", request.url().path());
            return false;
        };

        match HeaderValue::from_str(&format!("Bearer {token}")) {
            Ok(mut value) => {
                value.set_sensitive(true);
                request.headers_mut().insert(AUTHORIZATION, value);
                true
            }
            Err(_) => {
                warn!("Stored id token is not a valid header value, sending anonymously");
                false
            }
        }
    }

    async fn invalidate_session(&self, url: &str) {
        warn!("Authenticated request was rejected with 401, clearing stored tokens");

        if let Err(e) = clear_tokens(self.store.as_ref(), &self.token_key).await {
            warn!("Failed to clear stored tokens: {e}");
        }

        self.listener.session_invalidated(&SessionInvalidated {
            redirect_to: self.redirect_to.clone(),
            request_url: url.to_string(),
        });
    }
}

impl std::fmt::Debug for AuthInterceptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthInterceptor")
            .field("bypass", &self.bypass)
            .field("token_key", &self.token_key)
            .field("redirect_to", &self.redirect_to)
            .finish_non_exhaustive()
    }
}
