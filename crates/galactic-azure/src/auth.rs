//! OAuth2 client-credentials tokens for Microsoft Graph

use crate::config::AzureConfig;
use crate::error::{AzureError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use galactic_rest::{RestError, TokenProvider};
use serde::Deserialize;
use std::time::Duration as StdDuration;
use tokio::sync::RwLock;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_expired(&self, grace_period: Duration) -> bool {
        Utc::now() + grace_period >= self.expires_at
    }
}

/// Caches one access token and renews it inside the grace period
#[derive(Debug)]
pub struct TokenCache {
    config: AzureConfig,
    http: reqwest::Client,
    cached: RwLock<Option<CachedToken>>,
    grace_period: Duration,
}

impl TokenCache {
    pub fn new(config: AzureConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(StdDuration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AzureError::config(format!("Failed to create HTTP client: {}", e)))?;
        let grace_period = Duration::seconds(config.token_grace_secs);
        Ok(Self {
            config,
            http,
            cached: RwLock::new(None),
            grace_period,
        })
    }

    /// A valid access token, fetched when missing or about to expire
    pub async fn get_token(&self) -> Result<String> {
        {
            let cached = self.cached.read().await;
            if let Some(token) = cached.as_ref() {
                if !token.is_expired(self.grace_period) {
                    return Ok(token.access_token.clone());
                }
            }
        }

        debug!(tenant_id = %self.config.tenant_id, "Acquiring Graph access token");
        let token = self.acquire_token().await?;
        let access_token = token.access_token.clone();
        *self.cached.write().await = Some(token);
        Ok(access_token)
    }

    async fn acquire_token(&self) -> Result<CachedToken> {
        let scope = self.config.scope();
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("scope", scope.as_str()),
        ];

        let response = self
            .http
            .post(self.config.token_url())
            .form(&params)
            .send()
            .await
            .map_err(|e| AzureError::Auth(format!("Token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AzureError::Auth(format!(
                "Token request failed with status {}: {}",
                status, body
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AzureError::Auth(format!("Failed to parse token response: {}", e)))?;

        Ok(CachedToken {
            access_token: token.access_token,
            expires_at: Utc::now() + Duration::seconds(token.expires_in),
        })
    }

    pub async fn invalidate(&self) {
        *self.cached.write().await = None;
    }
}

#[async_trait]
impl TokenProvider for TokenCache {
    async fn token(&self) -> galactic_rest::Result<String> {
        self.get_token()
            .await
            .map_err(|e| RestError::Token(e.to_string()))
    }

    async fn invalidate(&self) {
        TokenCache::invalidate(self).await;
    }
}
