//! Agent roles, targets and the Dust wire formats
//!
//! The planning agent is reached through the conversations endpoint, while the
//! short-ask and generic agents share the single-shot run endpoint. The two
//! envelopes differ and are kept distinct here.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::AgentError;

/// One of the three configured upstream agents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    Planning,
    ShortAsk,
    Generic,
}

impl AgentRole {
    pub const ALL: [AgentRole; 3] = [AgentRole::Planning, AgentRole::ShortAsk, AgentRole::Generic];

    pub fn name(&self) -> &'static str {
        match self {
            AgentRole::Planning => "planning",
            AgentRole::ShortAsk => "short-ask",
            AgentRole::Generic => "generic",
        }
    }

    /// Human label used in notices and the TUI
    pub fn label(&self) -> &'static str {
        match self {
            AgentRole::Planning => "Planning Agent",
            AgentRole::ShortAsk => "Short Ask Agent",
            AgentRole::Generic => "Generic Agent",
        }
    }

    /// Relay function name serving this role
    pub fn relay_function(&self) -> &'static str {
        match self {
            AgentRole::Planning => "dust-planning",
            AgentRole::ShortAsk => "dust-short-ask",
            AgentRole::Generic => "dust-generic",
        }
    }

    pub fn from_relay_function(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|r| r.relay_function() == name)
    }

    /// Full upstream URL for this role
    pub fn endpoint(&self, base_url: &str, target: &AgentTarget) -> String {
        let base = base_url.trim_end_matches('/');
        match self {
            AgentRole::Planning => format!("{}/api/v1/w/{}/assistant/conversations", base, target.workspace_id),
            AgentRole::ShortAsk | AgentRole::Generic => {
                format!("{}/api/v1/w/{}/agents/{}/run", base, target.workspace_id, target.agent_id)
            }
        }
    }

    /// Request body for this role
    pub fn request_body(&self, target: &AgentTarget, text: &str) -> Value {
        debug!(role = %self, text_len = text.len(), "request_body: called");
        let body = match self {
            AgentRole::Planning => serde_json::to_value(ConversationRequest::new(&target.agent_id, text)),
            AgentRole::ShortAsk | AgentRole::Generic => serde_json::to_value(RunRequest {
                input: RunInput { text },
            }),
        };
        // Both request types are plain structs of strings and cannot fail to serialize
        body.unwrap_or(Value::Null)
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for AgentRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        debug!(%s, "AgentRole::from_str: called");
        match s.to_lowercase().as_str() {
            "planning" | "plan" => Ok(Self::Planning),
            "short-ask" | "short_ask" | "shortask" => Ok(Self::ShortAsk),
            "generic" | "chat" => Ok(Self::Generic),
            _ => Err(format!("Unknown agent role: {}. Use: planning, short-ask, or generic", s)),
        }
    }
}

/// Workspace, key and agent a call is addressed to
#[derive(Clone, PartialEq, Eq, Default)]
pub struct AgentTarget {
    pub workspace_id: String,
    pub api_key: String,
    pub agent_id: String,
}

impl AgentTarget {
    pub fn new(workspace_id: impl Into<String>, api_key: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            workspace_id: workspace_id.into(),
            api_key: api_key.into(),
            agent_id: agent_id.into(),
        }
    }

    /// Reject the call before any network traffic if anything is blank
    pub fn validate(&self, text: &str) -> Result<(), AgentError> {
        let missing: Vec<&str> = [
            ("workspaceId", self.workspace_id.as_str()),
            ("apiKey", self.api_key.as_str()),
            ("agentId", self.agent_id.as_str()),
            ("text", text),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            debug!(?missing, "AgentTarget::validate: rejecting call");
            Err(AgentError::MissingParameters(missing.join(", ")))
        }
    }
}

impl fmt::Debug for AgentTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AgentTarget")
            .field("workspace_id", &self.workspace_id)
            .field("api_key", &"<redacted>")
            .field("agent_id", &self.agent_id)
            .finish()
    }
}

// Request types

#[derive(Debug, Serialize)]
struct ConversationRequest<'a> {
    title: Option<&'a str>,
    visibility: &'static str,
    message: ConversationMessage<'a>,
    blocking: bool,
}

impl<'a> ConversationRequest<'a> {
    fn new(agent_id: &'a str, text: &'a str) -> Self {
        Self {
            title: None,
            visibility: "unlisted",
            message: ConversationMessage {
                content: text,
                mentions: vec![Mention {
                    configuration_id: agent_id,
                }],
                context: MessageContext {
                    timezone: "UTC",
                    username: "User",
                    origin: "api",
                },
            },
            blocking: true,
        }
    }
}

#[derive(Debug, Serialize)]
struct ConversationMessage<'a> {
    content: &'a str,
    mentions: Vec<Mention<'a>>,
    context: MessageContext,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Mention<'a> {
    configuration_id: &'a str,
}

#[derive(Debug, Serialize)]
struct MessageContext {
    timezone: &'static str,
    username: &'static str,
    origin: &'static str,
}

#[derive(Debug, Serialize)]
struct RunRequest<'a> {
    input: RunInput<'a>,
}

#[derive(Debug, Serialize)]
struct RunInput<'a> {
    text: &'a str,
}

// Response envelopes

/// `{conversation: {content: [[message, ...], ...]}}`
#[derive(Debug, Default, Deserialize)]
pub struct ConversationResponse {
    #[serde(default)]
    conversation: Option<Conversation>,
}

#[derive(Debug, Default, Deserialize)]
struct Conversation {
    #[serde(default)]
    content: Vec<Value>,
}

/// `{actions: [{content}, ...]}`
#[derive(Debug, Default, Deserialize)]
pub struct RunResponse {
    #[serde(default)]
    actions: Vec<RunAction>,
}

#[derive(Debug, Default, Deserialize)]
struct RunAction {
    #[serde(default)]
    content: Option<Value>,
}

/// Upstream response, tagged by the endpoint family that produced it
#[derive(Debug)]
pub enum ResponseEnvelope {
    Conversation(ConversationResponse),
    Run(RunResponse),
}

impl ResponseEnvelope {
    /// Decode a 2xx response body for the given role
    pub fn parse(role: AgentRole, body: &str) -> Result<Self, AgentError> {
        debug!(%role, body_len = body.len(), "ResponseEnvelope::parse: called");
        let envelope = match role {
            AgentRole::Planning => serde_json::from_str(body).map(ResponseEnvelope::Conversation),
            AgentRole::ShortAsk | AgentRole::Generic => serde_json::from_str(body).map(ResponseEnvelope::Run),
        };
        envelope.map_err(|e| AgentError::Shape(format!("response body could not be decoded: {}", e)))
    }

    /// Extract the single text result
    pub fn into_content(self) -> Result<String, AgentError> {
        match self {
            ResponseEnvelope::Conversation(response) => {
                let messages = response.conversation.map(|c| c.content).unwrap_or_default();
                last_agent_message(&messages)
                    .ok_or_else(|| AgentError::Shape("No content returned from Dust API".to_string()))
            }
            ResponseEnvelope::Run(response) => response
                .actions
                .into_iter()
                .next()
                .and_then(|action| action.content)
                .and_then(|content| content.as_str().filter(|s| !s.is_empty()).map(str::to_string))
                .ok_or_else(|| AgentError::Shape("Unexpected response format from Dust API".to_string())),
        }
    }
}

/// Flatten one level and return the last agent message with non-empty content
fn last_agent_message(content: &[Value]) -> Option<String> {
    let flattened = content.iter().flat_map(|entry| match entry {
        Value::Array(items) => items.iter().collect::<Vec<_>>(),
        other => vec![other],
    });

    flattened
        .filter(|msg| msg.get("type").and_then(Value::as_str) == Some("agent_message"))
        .filter_map(|msg| msg.get("content").and_then(Value::as_str))
        .filter(|content| !content.is_empty())
        .last()
        .map(str::to_string)
}
