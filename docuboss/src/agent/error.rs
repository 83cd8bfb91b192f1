//! Agent error types

use thiserror::Error;

/// Coarse classification used for user-facing notices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected before any network call
    Precondition,
    /// Network failure or non-2xx status
    Transport,
    /// 2xx response without the expected text field
    Shape,
}

/// Errors that can occur while invoking an agent
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("Missing required parameters: {0}")]
    MissingParameters(String),

    #[error("Dust API error: {status}")]
    Api { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected response format: {0}")]
    Shape(String),

    #[error("Invalid agent configuration: {0}")]
    Config(String),
}

impl AgentError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AgentError::MissingParameters(_) | AgentError::Config(_) => ErrorKind::Precondition,
            AgentError::Api { .. } | AgentError::Network(_) => ErrorKind::Transport,
            AgentError::Shape(_) => ErrorKind::Shape,
        }
    }

    /// HTTP status carried by the failure, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            AgentError::Api { status, .. } => Some(*status),
            AgentError::Network(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    pub fn is_transport(&self) -> bool {
        self.kind() == ErrorKind::Transport
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_is_transport_with_status() {
        let err = AgentError::Api {
            status: 429,
            message: "slow down".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::Transport);
        assert_eq!(err.status(), Some(429));
        assert!(err.is_transport());
        assert_eq!(err.to_string(), "Dust API error: 429");
    }

    #[test]
    fn test_missing_parameters_is_precondition() {
        let err = AgentError::MissingParameters("apiKey".to_string());
        assert_eq!(err.kind(), ErrorKind::Precondition);
        assert_eq!(err.status(), None);
        assert!(err.to_string().contains("Missing required parameters"));
    }

    #[test]
    fn test_shape_error_kind() {
        let err = AgentError::Shape("no actions".to_string());
        assert_eq!(err.kind(), ErrorKind::Shape);
        assert!(!err.is_transport());
    }
}
