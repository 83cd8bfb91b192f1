//! Agent client module for DocuBoss
//!
//! Invokes the three Dust agents (planning, short-ask, generic) and
//! normalizes their responses into a single text result.

use std::sync::Arc;

use tracing::debug;

pub mod client;
mod dust;
mod error;
mod relay_client;
mod types;

pub use client::AgentClient;
pub use dust::DustClient;
pub use error::{AgentError, ErrorKind};
pub use relay_client::RelayClient;
pub use types::{AgentRole, AgentTarget, ConversationResponse, ResponseEnvelope, RunResponse};

use crate::config::AgentConfig;

/// Create an agent client based on the mode specified in config
///
/// Supports "direct" and "relay" modes.
pub fn create_client(config: &AgentConfig) -> Result<Arc<dyn AgentClient>, AgentError> {
    debug!(mode = %config.mode, "create_client: called");
    match config.mode.as_str() {
        "direct" => {
            debug!("create_client: creating Dust client");
            Ok(Arc::new(DustClient::from_config(config)?))
        }
        "relay" => {
            debug!("create_client: creating relay client");
            Ok(Arc::new(RelayClient::from_config(config)?))
        }
        other => {
            debug!(mode = %other, "create_client: unknown mode");
            Err(AgentError::Config(format!(
                "Unknown agent mode: '{}'. Supported: direct, relay",
                other
            )))
        }
    }
}
