use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, error};

use crate::config::WatsonConfig;
use crate::error::AssistantError;
use crate::watson::iam::IamTokenManager;
use crate::watson::{AssistantService, MessageRequest, MessageResponse, SessionResponse};

/// REST client for the Watson Assistant v2 API.
pub struct WatsonClient {
    http: Client,
    iam: IamTokenManager,
    service_url: String,
    api_version: String,
    assistant_id: String,
}

impl WatsonClient {
    pub fn new(config: &WatsonConfig) -> Result<Self, AssistantError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            iam: IamTokenManager::new(http.clone(), config.iam_url.clone(), config.api_key.clone()),
            http,
            service_url: config.service_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            assistant_id: config.assistant_id.clone(),
        })
    }

    fn sessions_url(&self) -> String {
        format!("{}/v2/assistants/{}/sessions", self.service_url, self.assistant_id)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
    ) -> Result<T, AssistantError> {
        let token = self.iam.token().await?;
        let res = request
            .query(&[("version", self.api_version.as_str())])
            .bearer_auth(token)
            .send()
            .await?;

        let status = res.status();
        let body = res.text().await?;

        if !status.is_success() {
            let err = Self::classify(status, &body);
            if matches!(err, AssistantError::Auth(_)) {
                self.iam.invalidate().await;
            }
            error!("Watson request failed: {}", err);
            return Err(err);
        }

        serde_json::from_str(&body).map_err(|e| AssistantError::MalformedReply(e.to_string()))
    }

    fn classify(status: StatusCode, body: &str) -> AssistantError {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
            .unwrap_or_else(|| body.to_string());

        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => AssistantError::Auth(message),
            StatusCode::NOT_FOUND if message.to_lowercase().contains("session") => {
                AssistantError::SessionExpired(message)
            }
            _ => AssistantError::Api {
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl AssistantService for WatsonClient {
    async fn create_session(&self) -> Result<String, AssistantError> {
        let request = self.http.post(self.sessions_url()).json(&serde_json::json!({}));
        let session: SessionResponse = self.send(request).await?;
        debug!("Created Watson session {}", session.session_id);
        Ok(session.session_id)
    }

    async fn message(
        &self,
        session_id: &str,
        text: &str,
        user_id: &str,
    ) -> Result<Vec<Value>, AssistantError> {
        let url = format!("{}/{}/message", self.sessions_url(), session_id);
        let request = self.http.post(url).json(&MessageRequest::text(text, user_id));
        let response: MessageResponse = self.send(request).await?;
        Ok(response.output.generic)
    }
}
