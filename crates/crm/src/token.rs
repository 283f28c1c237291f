//! Access token providers for the CRM API.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::client::endpoint;
use crate::error::TokenError;

/// Tokens are refreshed this long before they actually expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// Source of CRM access tokens.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a currently valid access token.
    async fn access_token(&self) -> Result<String, TokenError>;
}

/// Provider that always returns the same token.
#[derive(Debug, Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, TokenError> {
        Ok(self.0.clone())
    }
}

/// OAuth client credentials for the refresh-token grant.
#[derive(Debug, Clone)]
pub struct RefreshCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone)]
struct CachedToken {
    token: String,
    expires_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    error: Option<String>,
}

/// Provider that exchanges a refresh token for access tokens and caches them
/// until shortly before expiry.
///
/// One instance is meant to be shared by all requests of the process.
pub struct RefreshTokenProvider {
    http: reqwest::Client,
    token_url: Url,
    credentials: RefreshCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshTokenProvider {
    /// Creates a provider for the accounts server at `accounts_url`.
    pub fn new(
        accounts_url: &Url,
        credentials: RefreshCredentials,
        timeout: Duration,
    ) -> Result<Self, TokenError> {
        let token_url = endpoint(accounts_url, &["oauth", "v2", "token"])
            .ok_or_else(|| TokenError::Rejected(format!("invalid accounts url: {accounts_url}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            token_url,
            credentials,
            cached: Mutex::new(None),
        })
    }

    async fn refresh(&self) -> Result<CachedToken, TokenError> {
        let params = [
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response: TokenResponse = self
            .http
            .post(self.token_url.clone())
            .form(&params)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if let Some(error) = response.error {
            return Err(TokenError::Rejected(error));
        }

        let token = response
            .access_token
            .ok_or_else(|| TokenError::Rejected("response has no access_token".to_string()))?;
        let expires_in = response.expires_in.unwrap_or(3600);

        tracing::debug!(expires_in, "refreshed CRM access token");

        Ok(CachedToken {
            token,
            expires_at: Utc::now() + chrono::Duration::seconds(expires_in - EXPIRY_MARGIN_SECS),
        })
    }
}

#[async_trait]
impl TokenProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Result<String, TokenError> {
        let mut cached = self.cached.lock().await;

        if let Some(current) = cached.as_ref()
            && current.expires_at > Utc::now()
        {
            return Ok(current.token.clone());
        }

        let fresh = self.refresh().await?;
        let token = fresh.token.clone();
        *cached = Some(fresh);
        Ok(token)
    }
}
