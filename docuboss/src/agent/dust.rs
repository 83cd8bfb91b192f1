//! Dust API client implementation
//!
//! Calls the Dust agent endpoints directly with a bearer token. There are no
//! retries: every failure goes straight back to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, warn};

use super::{AgentClient, AgentError, AgentRole, AgentTarget, ResponseEnvelope};
use crate::config::AgentConfig;

/// Dust API client
pub struct DustClient {
    base_url: String,
    http: Client,
}

impl DustClient {
    /// Create a client with no request timeout
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            http: Client::new(),
        }
    }

    /// Create a new client from configuration
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        debug!(?config, "from_config: called");
        let mut builder = Client::builder();
        if let Some(ms) = config.timeout_ms {
            debug!(ms, "from_config: applying request timeout");
            builder = builder.timeout(Duration::from_millis(ms));
        }
        let http = builder.build().map_err(AgentError::Network)?;

        Ok(Self {
            base_url: config.base_url.clone(),
            http,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl AgentClient for DustClient {
    async fn invoke(&self, role: AgentRole, target: &AgentTarget, text: &str) -> Result<String, AgentError> {
        debug!(%role, ?target, text_len = text.len(), "invoke: called");
        target.validate(text)?;

        let url = role.endpoint(&self.base_url, target);
        let body = role.request_body(target, text);

        info!(
            role = %role,
            workspace_id = %target.workspace_id,
            agent_id = %target.agent_id,
            text_len = text.len(),
            "Calling Dust agent"
        );

        let response = self
            .http
            .post(&url)
            .header("Authorization", format!("Bearer {}", target.api_key))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!(%role, error = %e, "invoke: network error");
                AgentError::Network(e)
            })?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%role, status, %message, "invoke: Dust API error");
            return Err(AgentError::Api { status, message });
        }

        let raw = response.text().await?;
        debug!(%role, body_len = raw.len(), "invoke: response received");

        let content = ResponseEnvelope::parse(role, &raw)?.into_content().inspect_err(|e| {
            warn!(%role, error = %e, "invoke: no content in response");
        })?;

        debug!(%role, content_len = content.len(), "invoke: success");
        Ok(content)
    }
}
