//! Power agent HTTP client

use crate::error::PowerError;
use crate::models::{PowerAction, PowerParam, PowerRequest};
use crate::power_trait::PowerControl;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};

/// Power agent client
///
/// Posts power requests to `<base_url>/api/v1/machines/<system_id>/power/<action>`.
/// The agent answers with a 2xx status once it has queued the request.
#[derive(Debug, Clone)]
pub struct PowerAgentClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl PowerAgentClient {
    /// Create a new power agent client
    ///
    /// # Arguments
    /// * `base_url` - Power agent base URL (e.g., "http://power-agent:5248")
    /// * `token` - Optional API token sent as `Authorization: Token <token>`
    pub fn new(base_url: String, token: Option<String>) -> Result<Self, PowerError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn action_url(&self, system_id: &str, action: PowerAction) -> String {
        format!(
            "{}/api/v1/machines/{}/power/{}",
            self.base_url,
            urlencoding::encode(system_id),
            action.as_str()
        )
    }

    async fn submit(&self, body: &PowerParam) -> Result<(), PowerError> {
        let url = self.action_url(&body.system_id, body.action);
        debug!("POST {}", url);

        let mut request = self
            .client
            .post(&url)
            .header("Accept", "application/json")
            .json(body);
        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("Token {token}"));
        }
        let response = request.send().await?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            return Err(PowerError::Api(format!(
                "POST {url} failed: {status} - {body_text}"
            )));
        }

        info!(
            "Power agent accepted {} for {}",
            body.action.as_str(),
            body.system_id
        );
        Ok(())
    }
}

#[async_trait::async_trait]
impl PowerControl for PowerAgentClient {
    async fn request_start(
        &self,
        request: &PowerRequest,
        user_data: Option<&[u8]>,
    ) -> Result<(), PowerError> {
        let encoded = user_data.map(|data| STANDARD.encode(data));
        self.submit(&PowerParam::new(request, PowerAction::PowerOn, encoded))
            .await
    }

    async fn request_stop(&self, request: &PowerRequest) -> Result<(), PowerError> {
        self.submit(&PowerParam::new(request, PowerAction::PowerOff, None))
            .await
    }
}
