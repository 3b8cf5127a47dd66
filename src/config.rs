//! Application configuration
//!
//! The gallery's per-environment settings, loaded from YAML:
//!
//! ```yaml
//! environment:
//!   production: false
//!   api_url: https://api.dev.example.com
//!   cognito:
//!     domain: gallery-dev.auth.us-east-1.amazoncognito.com
//!     client_id: abc123
//!     redirect_uri: https://app.dev.example.com/callback
//! auth:
//!   token_file: ~/.gallery/tokens.json
//! http:
//!   timeout_secs: 30
//! infra:
//!   app_name: gallery
//!   base_domain: example.com
//!   stage: dev
//! ```

use crate::auth::{BypassRules, AUTH_TOKENS_KEY, DEFAULT_BYPASS_PATTERNS, DEFAULT_LOGIN_REDIRECT};
use crate::error::{Error, Result};
use crate::http::{HttpClientConfig, RateLimiterConfig};
use crate::infra::{normalize_domain, validate_domain};
use crate::types::Stage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Environment variable overriding `infra.stage`
pub const ENV_STAGE: &str = "GALLERY_STAGE";
/// Environment variable overriding `environment.api_url`
pub const ENV_API_URL: &str = "GALLERY_API_URL";
/// Environment variable overriding `infra.base_domain`
pub const ENV_BASE_DOMAIN: &str = "GALLERY_BASE_DOMAIN";

const MAX_RETRIES_LIMIT: u32 = 10;

// ============================================================================
// Top-Level Config
// ============================================================================

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Frontend environment settings
    pub environment: EnvironmentConfig,

    /// Request authorization settings
    #[serde(default)]
    pub auth: AuthSettings,

    /// HTTP client settings
    #[serde(default)]
    pub http: HttpSettings,

    /// Infrastructure settings
    pub infra: InfraSettings,
}

impl AppConfig {
    /// Load configuration from a YAML file and apply environment overrides
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let contents = std::fs::read_to_string(path)?;
        let mut config = Self::from_yaml(&contents)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Parse configuration from a YAML string (no overrides)
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Serialize back to YAML
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply overrides read through `lookup` (normally the process environment)
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(stage) = lookup(ENV_STAGE) {
            self.infra.stage = stage.parse()?;
        }
        if let Some(api_url) = lookup(ENV_API_URL) {
            self.environment.api_url = api_url;
        }
        if let Some(domain) = lookup(ENV_BASE_DOMAIN) {
            self.infra.base_domain = domain;
        }
        Ok(())
    }

    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<()> {
        parse_url("environment.api_url", &self.environment.api_url)?;

        let cognito = &self.environment.cognito;
        if cognito.domain.trim().is_empty() {
            return Err(Error::missing_field("environment.cognito.domain"));
        }
        if cognito.client_id.trim().is_empty() {
            return Err(Error::missing_field("environment.cognito.client_id"));
        }
        parse_url("environment.cognito.redirect_uri", &cognito.redirect_uri)?;
        if let Some(ref logout) = cognito.logout_uri {
            parse_url("environment.cognito.logout_uri", logout)?;
        }

        if self.auth.token_key.is_empty() {
            return Err(Error::missing_field("auth.token_key"));
        }
        if !self.auth.login_redirect.starts_with('/') {
            return Err(Error::invalid_value(
                "auth.login_redirect",
                "must be an absolute path",
            ));
        }

        if self.http.max_retries > MAX_RETRIES_LIMIT {
            return Err(Error::invalid_value(
                "http.max_retries",
                format!("must be at most {MAX_RETRIES_LIMIT}"),
            ));
        }

        if let Some(ref limit) = self.http.rate_limit {
            if limit.requests_per_second == 0 || limit.burst() == 0 {
                return Err(Error::invalid_value(
                    "http.rate_limit",
                    "rate and burst must be positive",
                ));
            }
        }

        if self.infra.app_name.trim().is_empty() {
            return Err(Error::missing_field("infra.app_name"));
        }
        validate_domain(&normalize_domain(&self.infra.base_domain))
            .map_err(|e| Error::invalid_value("infra.base_domain", e.to_string()))?;

        Ok(())
    }

    /// HTTP client configuration derived from these settings
    pub fn http_client_config(&self) -> HttpClientConfig {
        let mut builder = HttpClientConfig::builder()
            .base_url(self.environment.api_url.clone())
            .timeout(Duration::from_secs(self.http.timeout_secs))
            .max_retries(self.http.max_retries);

        if let Some(ref limit) = self.http.rate_limit {
            builder = builder.rate_limit(limit.clone());
        }

        builder.build()
    }
}

fn parse_url(field: &str, value: &str) -> Result<Url> {
    Url::parse(value).map_err(|e| Error::invalid_value(field, e.to_string()))
}

// ============================================================================
// Environment
// ============================================================================

/// Frontend environment settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Production build flag
    #[serde(default)]
    pub production: bool,

    /// Base URL of the gallery API
    pub api_url: String,

    /// Cognito hosted UI settings
    pub cognito: CognitoConfig,
}

/// Cognito user pool client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CognitoConfig {
    /// Hosted UI domain, e.g. `gallery.auth.us-east-1.amazoncognito.com`
    pub domain: String,

    /// App client id
    pub client_id: String,

    /// Where Cognito sends the user after sign-in
    pub redirect_uri: String,

    /// Where Cognito sends the user after sign-out
    #[serde(default)]
    pub logout_uri: Option<String>,

    /// OAuth scopes
    #[serde(default = "default_scopes")]
    pub scopes: Vec<String>,
}

fn default_scopes() -> Vec<String> {
    ["openid", "email", "profile"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl CognitoConfig {
    fn base(&self) -> String {
        let domain = self.domain.trim_end_matches('/');
        if domain.starts_with("https://") || domain.starts_with("http://") {
            domain.to_string()
        } else {
            format!("https://{domain}")
        }
    }

    /// The OAuth2 token endpoint
    pub fn token_url(&self) -> String {
        format!("{}/oauth2/token", self.base())
    }

    /// The hosted UI authorize URL for the authorization code flow
    pub fn authorize_url(&self) -> Result<Url> {
        let authorize = format!("{}/oauth2/authorize", self.base());
        let mut url = parse_url("environment.cognito.domain", &authorize)?;
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &self.client_id)
            .append_pair("redirect_uri", &self.redirect_uri)
            .append_pair("scope", &self.scopes.join(" "));
        Ok(url)
    }
}

// ============================================================================
// Auth
// ============================================================================

/// Request authorization settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthSettings {
    /// Storage key of the token record
    #[serde(default = "default_token_key")]
    pub token_key: String,

    /// URL substrings exempt from bearer injection
    #[serde(default = "default_bypass_patterns")]
    pub bypass_patterns: Vec<String>,

    /// Path the user is sent to when the session is invalidated
    #[serde(default = "default_login_redirect")]
    pub login_redirect: String,

    /// File backing the token store
    #[serde(default)]
    pub token_file: Option<PathBuf>,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            token_key: default_token_key(),
            bypass_patterns: default_bypass_patterns(),
            login_redirect: default_login_redirect(),
            token_file: None,
        }
    }
}

impl AuthSettings {
    /// Bypass rules built from the configured patterns
    pub fn bypass_rules(&self) -> BypassRules {
        BypassRules::new(self.bypass_patterns.iter().cloned())
    }
}

fn default_token_key() -> String {
    AUTH_TOKENS_KEY.to_string()
}

fn default_bypass_patterns() -> Vec<String> {
    DEFAULT_BYPASS_PATTERNS
        .into_iter()
        .map(String::from)
        .collect()
}

fn default_login_redirect() -> String {
    DEFAULT_LOGIN_REDIRECT.to_string()
}

// ============================================================================
// HTTP
// ============================================================================

/// HTTP client settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSettings {
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transport retries for transient failures
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Optional client-side rate limit
    #[serde(default)]
    pub rate_limit: Option<RateLimiterConfig>,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            rate_limit: None,
        }
    }
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_retries() -> u32 {
    3
}

// ============================================================================
// Infra
// ============================================================================

/// Infrastructure settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InfraSettings {
    /// Prefix for physical resource names
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Apex domain the hosted zone serves
    pub base_domain: String,

    /// Deployment stage
    #[serde(default)]
    pub stage: Stage,
}

fn default_app_name() -> String {
    "gallery".to_string()
}
