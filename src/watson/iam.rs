use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::RwLock;
use tracing::{error, info};

use crate::error::AssistantError;

const GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Upper bound on the lifetime trusted from a token response.
const MAX_TOKEN_LIFETIME_SECS: i64 = 86_400;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: DateTime<Utc>,
}

/// Exchanges an IBM Cloud API key for IAM bearer tokens and caches them.
pub struct IamTokenManager {
    client: Client,
    url: String,
    api_key: String,
    token: RwLock<Option<CachedToken>>,
}

impl IamTokenManager {
    pub fn new(client: Client, url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client,
            url: url.into(),
            api_key: api_key.into(),
            token: RwLock::new(None),
        }
    }

    /// Returns a valid access token, requesting a new one once 80% of the
    /// previous token's lifetime has elapsed.
    pub async fn token(&self) -> Result<String, AssistantError> {
        if let Some(cached) = self.token.read().await.as_ref() {
            if Utc::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
        }

        let mut slot = self.token.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if let Some(cached) = slot.as_ref() {
            if Utc::now() < cached.refresh_at {
                return Ok(cached.access_token.clone());
            }
        }

        let fresh = self.request_token().await?;
        let access_token = fresh.access_token.clone();
        *slot = Some(fresh);
        Ok(access_token)
    }

    /// Drops the cached token so the next call fetches a new one.
    pub async fn invalidate(&self) {
        *self.token.write().await = None;
    }

    async fn request_token(&self) -> Result<CachedToken, AssistantError> {
        let res = self
            .client
            .post(&self.url)
            .header(reqwest::header::ACCEPT, "application/json")
            .form(&[("grant_type", GRANT_TYPE), ("apikey", self.api_key.as_str())])
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            error!("IAM token request failed with {}: {}", status, body);
            return Err(AssistantError::Auth(format!("IAM returned {}: {}", status, body)));
        }

        let token: TokenResponse = serde_json::from_str(&body)
            .map_err(|e| AssistantError::Auth(format!("Invalid token response: {}", e)))?;

        info!("Obtained IAM token valid for {}s", token.expires_in);

        Ok(CachedToken {
            access_token: token.access_token,
            refresh_at: refresh_at(Utc::now(), token.expires_in),
        })
    }
}

/// When a token issued at `issued` with a lifetime of `expires_in` seconds
/// should be replaced: after 80% of its (bounded) lifetime.
fn refresh_at(issued: DateTime<Utc>, expires_in: i64) -> DateTime<Utc> {
    let lifetime_ms = expires_in.clamp(0, MAX_TOKEN_LIFETIME_SECS) * 800;
    issued + Duration::milliseconds(lifetime_ms)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_refresh_at_is_eighty_percent_of_lifetime() {
        let issued = Utc::now();
        assert_eq!(refresh_at(issued, 3600), issued + Duration::seconds(2880));
        assert_eq!(refresh_at(issued, 0), issued);
        assert_eq!(refresh_at(issued, -5), issued);
    }

    #[test]
    fn test_refresh_at_bounds_absurd_lifetimes() {
        let issued = Utc::now();
        let bounded = issued + Duration::seconds(MAX_TOKEN_LIFETIME_SECS * 8 / 10);
        assert_eq!(refresh_at(issued, i64::MAX), bounded);
        assert_eq!(refresh_at(issued, MAX_TOKEN_LIFETIME_SECS + 1), bounded);
    }
}
