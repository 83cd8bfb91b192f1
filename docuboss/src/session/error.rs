//! Session error types

use thiserror::Error;

use super::ActionKind;
use crate::agent::{AgentError, ErrorKind};
use crate::credentials::CredentialError;

/// Errors raised by session operations
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Please configure your Dust API credentials in settings first.")]
    MissingCredentials,

    #[error("Please select a template or enter custom text.")]
    InputRequired,

    #[error("Please enter some text to refine.")]
    NoText,

    #[error("Please enter a question.")]
    EmptyQuestion,

    #[error("No plan has been generated yet.")]
    NoPlan,

    #[error("The plan is read-only; toggle editing first.")]
    PlanReadOnly,

    #[error("The document is empty; nothing to export.")]
    EmptyDocument,

    #[error("{0} is already in progress")]
    Busy(ActionKind),

    #[error("Please fill in all fields.")]
    IncompleteCredentials(#[source] CredentialError),

    #[error(transparent)]
    Agent(#[from] AgentError),

    #[error("Credential store failed: {0}")]
    Store(#[source] CredentialError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SessionError {
    /// Taxonomy bucket, shared with agent errors
    ///
    /// Local I/O and store failures land in `Transport`: they happen after
    /// preconditions pass and are outside the session's control.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Agent(e) => e.kind(),
            Self::Store(_) | Self::Io(_) => ErrorKind::Transport,
            _ => ErrorKind::Precondition,
        }
    }

    /// Short title for the user-visible notice
    pub fn title(&self) -> &'static str {
        match self {
            Self::MissingCredentials => "Missing Credentials",
            Self::InputRequired => "Input Required",
            Self::NoText => "No Text",
            Self::EmptyQuestion => "No Question",
            Self::NoPlan => "No Plan",
            Self::PlanReadOnly => "Read Only",
            Self::EmptyDocument => "Nothing To Export",
            Self::Busy(_) => "Busy",
            Self::IncompleteCredentials(_) => "Incomplete",
            Self::Agent(_) | Self::Store(_) | Self::Io(_) => "Error",
        }
    }
}

impl From<CredentialError> for SessionError {
    fn from(e: CredentialError) -> Self {
        match e {
            CredentialError::Incomplete(_) => Self::IncompleteCredentials(e),
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_mapping() {
        assert_eq!(SessionError::MissingCredentials.kind(), ErrorKind::Precondition);
        assert_eq!(SessionError::Busy(ActionKind::Refine).kind(), ErrorKind::Precondition);
        assert_eq!(
            SessionError::Agent(AgentError::Shape("x".into())).kind(),
            ErrorKind::Shape
        );
        assert_eq!(
            SessionError::Agent(AgentError::Api {
                status: 500,
                message: String::new()
            })
            .kind(),
            ErrorKind::Transport
        );
        assert_eq!(
            SessionError::Agent(AgentError::MissingParameters("text".into())).kind(),
            ErrorKind::Precondition
        );
    }

    #[test]
    fn test_credential_error_conversion() {
        let err: SessionError = CredentialError::Incomplete("api-key".into()).into();
        assert!(matches!(err, SessionError::IncompleteCredentials(_)));
        assert_eq!(err.title(), "Incomplete");

        let io = std::io::Error::other("disk full");
        let err: SessionError = CredentialError::Io(io).into();
        assert!(matches!(err, SessionError::Store(_)));
        assert_eq!(err.kind(), ErrorKind::Transport);
    }

    #[test]
    fn test_busy_message_names_action() {
        assert_eq!(SessionError::Busy(ActionKind::Ask).to_string(), "ask is already in progress");
    }
}
