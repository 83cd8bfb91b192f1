//! Relay client implementation
//!
//! Sends agent calls through a relay server (see [`crate::relay`]) instead of
//! talking to Dust directly. The relay answers `{content}` or `{error}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, warn};

use super::{AgentClient, AgentError, AgentRole, AgentTarget};
use crate::config::AgentConfig;
use crate::relay::{RelayRequest, RelayResponse};

/// Client for a DocuBoss relay
pub struct RelayClient {
    relay_url: String,
    http: Client,
}

impl RelayClient {
    pub fn new(relay_url: impl Into<String>) -> Self {
        Self {
            relay_url: relay_url.into(),
            http: Client::new(),
        }
    }

    /// Create a new client from configuration
    pub fn from_config(config: &AgentConfig) -> Result<Self, AgentError> {
        debug!(?config, "RelayClient::from_config: called");
        let mut builder = Client::builder();
        if let Some(ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        Ok(Self {
            relay_url: config.relay_url.clone(),
            http: builder.build().map_err(AgentError::Network)?,
        })
    }

    fn function_url(&self, role: AgentRole) -> String {
        format!("{}/{}", self.relay_url.trim_end_matches('/'), role.relay_function())
    }
}

#[async_trait]
impl AgentClient for RelayClient {
    async fn invoke(&self, role: AgentRole, target: &AgentTarget, text: &str) -> Result<String, AgentError> {
        debug!(%role, ?target, text_len = text.len(), "RelayClient::invoke: called");
        target.validate(text)?;

        let response = self
            .http
            .post(self.function_url(role))
            .json(&RelayRequest::new(target, text))
            .send()
            .await?;

        let status = response.status();
        let raw = response.text().await?;
        let body: RelayResponse = serde_json::from_str(&raw).unwrap_or_default();

        if !status.is_success() {
            let message = body.error.unwrap_or(raw);
            warn!(%role, status = status.as_u16(), %message, "RelayClient::invoke: relay returned error");
            return Err(AgentError::Api {
                status: status.as_u16(),
                message,
            });
        }

        match body.content {
            Some(content) if !content.is_empty() => Ok(content),
            _ => {
                debug!(%role, "RelayClient::invoke: no content in relay response");
                Err(AgentError::Shape(format!("No content returned from {}", role.label().to_lowercase())))
            }
        }
    }
}
