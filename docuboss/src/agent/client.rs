//! AgentClient trait definition

use async_trait::async_trait;

use super::{AgentError, AgentRole, AgentTarget};

/// Stateless agent client - each call is independent
///
/// The upstream agents keep no memory between invocations from this side; all
/// context the agent needs travels inside `text`.
#[async_trait]
pub trait AgentClient: Send + Sync {
    /// Invoke one agent and return its text reply
    async fn invoke(&self, role: AgentRole, target: &AgentTarget, text: &str) -> Result<String, AgentError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use tracing::debug;

    /// A call observed by the mock
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct RecordedCall {
        pub role: AgentRole,
        pub agent_id: String,
        pub text: String,
    }

    /// Mock agent client for unit tests
    ///
    /// Replies are consumed in order. Preconditions are checked exactly like the
    /// real clients so a rejected call is never recorded.
    pub struct MockAgentClient {
        replies: Mutex<VecDeque<Result<String, AgentError>>>,
        calls: Mutex<Vec<RecordedCall>>,
    }

    impl MockAgentClient {
        pub fn new(replies: Vec<Result<String, AgentError>>) -> Self {
            debug!(reply_count = %replies.len(), "MockAgentClient::new: called");
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        pub fn replying(content: &str) -> Self {
            Self::new(vec![Ok(content.to_string())])
        }

        pub fn calls(&self) -> Vec<RecordedCall> {
            self.calls.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl AgentClient for MockAgentClient {
        async fn invoke(&self, role: AgentRole, target: &AgentTarget, text: &str) -> Result<String, AgentError> {
            debug!(%role, "MockAgentClient::invoke: called");
            target.validate(text)?;
            self.calls.lock().unwrap().push(RecordedCall {
                role,
                agent_id: target.agent_id.clone(),
                text: text.to_string(),
            });
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(AgentError::Shape("No more mock replies".to_string())))
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[tokio::test]
        async fn test_mock_client_returns_replies_in_order() {
            let client = MockAgentClient::new(vec![Ok("one".to_string()), Ok("two".to_string())]);
            let target = AgentTarget::new("ws", "key", "agent");

            assert_eq!(client.invoke(AgentRole::Generic, &target, "a").await.unwrap(), "one");
            assert_eq!(client.invoke(AgentRole::ShortAsk, &target, "b").await.unwrap(), "two");
            assert_eq!(client.call_count(), 2);
            assert_eq!(client.calls()[1].role, AgentRole::ShortAsk);
        }

        #[tokio::test]
        async fn test_mock_client_errors_when_exhausted() {
            let client = MockAgentClient::new(vec![]);
            let target = AgentTarget::new("ws", "key", "agent");
            assert!(client.invoke(AgentRole::Generic, &target, "a").await.is_err());
        }

        #[tokio::test]
        async fn test_mock_client_rejects_missing_parameters() {
            let client = MockAgentClient::replying("never");
            let target = AgentTarget::new("ws", "", "agent");
            let err = client.invoke(AgentRole::Planning, &target, "a").await.unwrap_err();
            assert!(matches!(err, AgentError::MissingParameters(_)));
            assert_eq!(client.call_count(), 0);
        }
    }
}
