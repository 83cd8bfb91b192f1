//! DocuBoss - plan-first document drafting backed by Dust agents
//!
//! A user describes a document (optionally from a template), a planning
//! agent turns that into an execution plan, and the user drafts the
//! document next to the plan with help from two more agents: one that
//! refines the draft and one that answers questions about it.
//!
//! # Modules
//!
//! - [`agent`] - Agent client trait, the direct Dust client and the relay client
//! - [`prompt`] - Composes the context block sent with every request
//! - [`session`] - The working set: plan, document, chat, and action state
//! - [`credentials`] - Per-profile Dust credentials and their storage
//! - [`relay`] - HTTP relay that forwards agent calls to Dust
//! - [`config`] - Configuration types and loading
//! - [`cli`] - Command-line interface
//! - [`tui`] - Interactive terminal interface

pub mod agent;
pub mod cli;
pub mod config;
pub mod credentials;
pub mod prompt;
pub mod relay;
pub mod session;
pub mod tui;

// Re-export commonly used types
pub use agent::{AgentClient, AgentError, AgentRole, AgentTarget, DustClient, RelayClient, create_client};
pub use config::{AgentConfig, Config, CredentialsConfig, RelayConfig};
pub use credentials::{CredentialError, CredentialStore, Credentials, FileCredentialStore, MemoryCredentialStore};
pub use prompt::{Section, compose, refine_task};
pub use session::{ActionKind, Notice, Request, Screen, Session, SessionError, Template};
