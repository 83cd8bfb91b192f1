//! Relay server
//!
//! A thin HTTP pass-through that keeps the Dust API key off the client's
//! direct network path. Each agent role is exposed as one function:
//!
//! - `POST /dust-planning`
//! - `POST /dust-short-ask`
//! - `POST /dust-generic`
//!
//! The body is `{workspaceId, apiKey, agentId, text}`; the reply is either
//! `{content}` (200) or `{error}` with a matching status.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;
use tracing::{debug, info, warn};

use crate::agent::{AgentClient, AgentError, AgentRole, AgentTarget};

/// Relay request body
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayRequest {
    #[serde(default)]
    pub workspace_id: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub text: String,
}

impl RelayRequest {
    pub fn new(target: &AgentTarget, text: &str) -> Self {
        Self {
            workspace_id: target.workspace_id.clone(),
            api_key: target.api_key.clone(),
            agent_id: target.agent_id.clone(),
            text: text.to_string(),
        }
    }

    pub fn target(&self) -> AgentTarget {
        AgentTarget::new(&self.workspace_id, &self.api_key, &self.agent_id)
    }
}

/// Relay response body: exactly one of the two fields is set
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RelayResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RelayResponse {
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            error: None,
        }
    }

    pub fn error(error: impl Into<String>) -> Self {
        Self {
            content: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Clone)]
struct RelayState {
    client: Arc<dyn AgentClient>,
}

/// Build the relay router around an upstream client
pub fn router(client: Arc<dyn AgentClient>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/{function}", post(relay_call))
        .layer(CorsLayer::permissive())
        .with_state(RelayState { client })
}

/// Serve the relay until Ctrl-C
pub async fn serve(bind: &str, client: Arc<dyn AgentClient>) -> Result<()> {
    debug!(%bind, "serve: called");
    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .context(format!("Failed to bind relay to {}", bind))?;
    info!("Relay listening on {}", listener.local_addr()?);

    axum::serve(listener, router(client))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Relay shutting down");
        })
        .await
        .context("Relay server failed")?;
    Ok(())
}

async fn health_check() -> &'static str {
    "OK"
}

async fn relay_call(
    State(state): State<RelayState>,
    Path(function): Path<String>,
    body: Result<Json<RelayRequest>, JsonRejection>,
) -> (StatusCode, Json<RelayResponse>) {
    debug!(%function, "relay_call: called");
    let Some(role) = AgentRole::from_relay_function(&function) else {
        debug!(%function, "relay_call: unknown function");
        return (
            StatusCode::NOT_FOUND,
            Json(RelayResponse::error(format!("Unknown function: {}", function))),
        );
    };

    let request = match body {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(%function, error = %rejection, "relay_call: unreadable body");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(RelayResponse::error(rejection.body_text())),
            );
        }
    };

    let target = request.target();
    if target.validate(&request.text).is_err() {
        return (
            StatusCode::BAD_REQUEST,
            Json(RelayResponse::error("Missing required parameters")),
        );
    }

    info!(%role, workspace_id = %target.workspace_id, agent_id = %target.agent_id, text_len = request.text.len(), "Relaying agent call");

    match state.client.invoke(role, &target, &request.text).await {
        Ok(content) => (StatusCode::OK, Json(RelayResponse::content(content))),
        Err(e) => {
            warn!(%role, error = %e, "relay_call: upstream failed");
            (error_status(&e), Json(RelayResponse::error(e.to_string())))
        }
    }
}

fn error_status(error: &AgentError) -> StatusCode {
    match error {
        AgentError::MissingParameters(_) => StatusCode::BAD_REQUEST,
        AgentError::Api { status, .. } => StatusCode::from_u16(*status).unwrap_or(StatusCode::BAD_GATEWAY),
        AgentError::Network(_) | AgentError::Shape(_) | AgentError::Config(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::RelayClient;
    use crate::agent::client::mock::MockAgentClient;

    async fn spawn_relay(client: Arc<dyn AgentClient>) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router(client)).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn target() -> AgentTarget {
        AgentTarget::new("ws", "sk", "agent")
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(
            error_status(&AgentError::MissingParameters("text".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            error_status(&AgentError::Api {
                status: 429,
                message: String::new()
            }),
            StatusCode::TOO_MANY_REQUESTS
        );
        assert_eq!(
            error_status(&AgentError::Shape("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_relay_response_serializes_one_field() {
        let ok = serde_json::to_value(RelayResponse::content("hi")).unwrap();
        assert_eq!(ok, serde_json::json!({"content": "hi"}));
        let err = serde_json::to_value(RelayResponse::error("boom")).unwrap();
        assert_eq!(err, serde_json::json!({"error": "boom"}));
    }

    #[tokio::test]
    async fn test_relay_round_trip_through_client() {
        let upstream = Arc::new(MockAgentClient::replying("refined"));
        let base = spawn_relay(upstream.clone()).await;

        let client = RelayClient::new(base);
        let content = client.invoke(AgentRole::ShortAsk, &target(), "tighten").await.unwrap();

        assert_eq!(content, "refined");
        let calls = upstream.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].role, AgentRole::ShortAsk);
        assert_eq!(calls[0].text, "tighten");
    }

    #[tokio::test]
    async fn test_relay_passes_upstream_status_through() {
        let upstream = Arc::new(MockAgentClient::new(vec![Err(AgentError::Api {
            status: 429,
            message: "slow down".to_string(),
        })]));
        let base = spawn_relay(upstream).await;

        let client = RelayClient::new(base);
        let err = client.invoke(AgentRole::Planning, &target(), "plan").await.unwrap_err();
        assert_eq!(err.status(), Some(429));
        assert!(err.is_transport());
    }

    #[tokio::test]
    async fn test_relay_rejects_missing_parameters_with_400() {
        let upstream = Arc::new(MockAgentClient::replying("never"));
        let base = spawn_relay(upstream.clone()).await;

        let response = reqwest::Client::new()
            .post(format!("{}/dust-generic", base))
            .json(&serde_json::json!({"workspaceId": "ws", "apiKey": "sk", "agentId": "agent"}))
            .send()
            .await
            .unwrap();

        assert_eq!(response.status().as_u16(), 400);
        let body: RelayResponse = response.json().await.unwrap();
        assert_eq!(body.error.as_deref(), Some("Missing required parameters"));
        assert_eq!(upstream.call_count(), 0);
    }

    #[tokio::test]
    async fn test_relay_unknown_function_is_404() {
        let base = spawn_relay(Arc::new(MockAgentClient::new(vec![]))).await;
        let response = reqwest::Client::new()
            .post(format!("{}/dust-nope", base))
            .json(&RelayRequest::new(&target(), "x"))
            .send()
            .await
            .unwrap();
        assert_eq!(response.status().as_u16(), 404);
    }

    #[tokio::test]
    async fn test_health_check() {
        let base = spawn_relay(Arc::new(MockAgentClient::new(vec![]))).await;
        let body = reqwest::get(format!("{}/health", base)).await.unwrap().text().await.unwrap();
        assert_eq!(body, "OK");
    }
}
