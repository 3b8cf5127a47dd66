//! Auth token types
//!
//! `AuthTokens` is the record persisted in the token store after a
//! successful sign-in. Field names match the JSON the web frontend writes.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Credentials obtained from the OAuth2/OIDC exchange
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthTokens {
    /// Opaque access token
    pub access_token: String,
    /// ID token, sent as the bearer credential on API calls
    pub id_token: String,
    /// Refresh token, if the identity provider issued one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl AuthTokens {
    /// Create a token record without a refresh token
    pub fn new(access_token: impl Into<String>, id_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            id_token: id_token.into(),
            refresh_token: None,
        }
    }

    /// Attach a refresh token
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// The bearer credential, if one is usable.
    ///
    /// An empty id token counts as absent.
    pub fn bearer(&self) -> Option<&str> {
        let token = self.id_token.as_str();
        (!token.is_empty()).then_some(token)
    }

    /// Decode the id token's claims without verifying the signature
    pub fn id_claims(&self) -> Option<IdTokenClaims> {
        IdTokenClaims::decode_unverified(&self.id_token)
    }
}

/// Subset of OIDC id token claims, for display only
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdTokenClaims {
    /// Subject (user id)
    #[serde(default)]
    pub sub: Option<String>,
    /// Email address
    #[serde(default)]
    pub email: Option<String>,
    /// Cognito user name
    #[serde(default, rename = "cognito:username")]
    pub username: Option<String>,
    /// Expiration (seconds since epoch)
    #[serde(default)]
    pub exp: Option<i64>,
    /// Issued at (seconds since epoch)
    #[serde(default)]
    pub iat: Option<i64>,
}

impl IdTokenClaims {
    /// Decode the payload segment of a JWT.
    ///
    /// The signature is NOT checked. Never use the result for authorization.
    pub fn decode_unverified(token: &str) -> Option<Self> {
        let mut parts = token.split('.');
        let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
        if parts.next().is_some() {
            return None;
        }

        let bytes = URL_SAFE_NO_PAD
            .decode(payload.trim_end_matches('='))
            .ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    /// Expiration as a timestamp
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp?, 0)
    }

    /// Check whether the token has expired
    pub fn is_expired(&self) -> bool {
        self.expires_at().is_some_and(|at| at <= Utc::now())
    }
}
