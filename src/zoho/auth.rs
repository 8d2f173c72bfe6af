//! OAuth access tokens for the Zoho API.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::Method;
use serde::Deserialize;
use tokio::sync::Mutex;

use crate::http::HttpClient;
use crate::GatewayError;

const SERVICE: &str = "Zoho";

/// Tokens are treated as expired this long before Zoho says they are.
pub const REFRESH_MARGIN_SECS: i64 = 60;

#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self) -> Result<String, GatewayError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

impl CachedToken {
    pub fn issued(token: String, expires_in_secs: i64, now: DateTime<Utc>) -> Self {
        Self { token, expires_at: now + Duration::seconds(expires_in_secs) }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at - Duration::seconds(REFRESH_MARGIN_SECS)
    }
}

#[derive(Debug, Clone)]
pub struct OAuthCredentials {
    pub client_id: String,
    pub client_secret: String,
    pub refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    error: Option<String>,
}

fn default_expires_in() -> i64 {
    3600
}

/// Exchanges the long-lived refresh token for access tokens and caches the
/// current one until shortly before it expires.
pub struct RefreshTokenProvider {
    http: HttpClient,
    token_url: String,
    credentials: OAuthCredentials,
    cached: Mutex<Option<CachedToken>>,
}

impl RefreshTokenProvider {
    pub fn new(http: HttpClient, accounts_url: &str, credentials: OAuthCredentials) -> Self {
        Self {
            http,
            token_url: format!("{}/oauth/v2/token", accounts_url.trim_end_matches('/')),
            credentials,
            cached: Mutex::new(None),
        }
    }

    async fn refresh(&self) -> Result<CachedToken, GatewayError> {
        let request = self.http.request(Method::POST, &self.token_url).query(&[
            ("refresh_token", self.credentials.refresh_token.as_str()),
            ("client_id", self.credentials.client_id.as_str()),
            ("client_secret", self.credentials.client_secret.as_str()),
            ("grant_type", "refresh_token"),
        ]);
        let body = self.http.send_json(request, "oauth/v2/token").await.map_err(|e| match e {
            GatewayError::Status { message, .. } => GatewayError::Auth { service: SERVICE, message },
            other => other,
        })?;
        let response: TokenResponse = serde_json::from_value(body).map_err(|e| GatewayError::Decode {
            endpoint: "oauth/v2/token".into(),
            reason: e.to_string(),
        })?;
        match (response.access_token, response.error) {
            (Some(token), _) => {
                tracing::debug!(expires_in = response.expires_in, "refreshed Zoho access token");
                Ok(CachedToken::issued(token, response.expires_in, Utc::now()))
            }
            (None, error) => Err(GatewayError::Auth {
                service: SERVICE,
                message: error.unwrap_or_else(|| "no access token in response".to_string()),
            }),
        }
    }
}

#[async_trait]
impl TokenProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Result<String, GatewayError> {
        // held across the refresh so concurrent callers share one request
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.token.clone());
        }
        let token = self.refresh().await?;
        let value = token.token.clone();
        *cached = Some(token);
        Ok(value)
    }
}

/// Always hands out the same token.
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> Result<String, GatewayError> {
        Ok(self.0.clone())
    }
}
