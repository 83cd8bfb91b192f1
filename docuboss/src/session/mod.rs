//! Session - the working set behind both screens
//!
//! Holds the plan, the document, the chat transcript and the credentials for
//! one process. All mutation goes through the methods here; the TUI and the
//! CLI only render and forward.
//!
//! Agent-backed actions are split in two so the TUI can run the network call
//! on a spawned task:
//!
//! - [`Session::begin`] checks the busy guard and preconditions, builds the
//!   prompt and marks the action in flight
//! - [`Session::complete`] applies the agent's answer and clears the guard
//!
//! [`Session::run`] drives both halves around a single `invoke`.

use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

mod error;
mod template;

pub use error::SessionError;
pub use template::{Template, build_input};

use crate::agent::{AgentClient, AgentError, AgentRole, AgentTarget};
use crate::credentials::{CredentialStore, Credentials};
use crate::prompt::{self, SECTION_SEPARATOR};

/// Default file name used by export
pub const DEFAULT_EXPORT_FILE: &str = "document.txt";

/// Agent-backed actions guarded against re-entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionKind {
    Submit,
    Regenerate,
    Refine,
    Ask,
}

impl ActionKind {
    pub const ALL: [ActionKind; 4] = [
        ActionKind::Submit,
        ActionKind::Regenerate,
        ActionKind::Refine,
        ActionKind::Ask,
    ];

    /// Whether `self` must wait while `other` is in flight
    ///
    /// Submit and Regenerate both write the plan; Refine and Ask both touch
    /// the document and chat. Every action conflicts with itself.
    pub fn conflicts_with(self, other: ActionKind) -> bool {
        use ActionKind::*;
        matches!(
            (self, other),
            (Submit | Regenerate, Submit | Regenerate) | (Refine | Ask, Refine | Ask)
        )
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submit => write!(f, "submit"),
            Self::Regenerate => write!(f, "regenerate"),
            Self::Refine => write!(f, "refine"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

/// Per-action busy flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ActionState {
    #[default]
    Idle,
    InFlight,
}

/// Which screen the session resolves to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Screen {
    #[default]
    Input,
    Execution,
}

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

/// One entry in the chat transcript
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Error,
}

/// User-visible outcome of an operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub title: String,
    pub description: String,
    pub severity: Severity,
}

impl Notice {
    pub fn info(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Info,
        }
    }

    pub fn error(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: Severity::Error,
        }
    }

    /// Notice for a failed action
    ///
    /// Agent failures get a per-action summary followed by the cause; every
    /// other error speaks for itself.
    pub fn from_error(action: Option<ActionKind>, err: &SessionError) -> Self {
        let description = match (action, err) {
            (Some(action), SessionError::Agent(cause)) => {
                let summary = match action {
                    ActionKind::Submit => "Failed to generate plan",
                    ActionKind::Regenerate => "Failed to regenerate plan",
                    ActionKind::Refine => "Failed to refine text",
                    ActionKind::Ask => "Failed to get response",
                };
                format!("{}: {}", summary, cause)
            }
            _ => err.to_string(),
        };
        Self::error(err.title(), description)
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.title, self.description)
    }
}

/// An agent-backed action requested by the user
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Submit { template: Option<Template>, custom: String },
    Regenerate,
    Refine { role: AgentRole },
    Ask { question: String, role: AgentRole },
}

impl Request {
    pub fn submit(template: Option<Template>, custom: impl Into<String>) -> Self {
        Self::Submit {
            template,
            custom: custom.into(),
        }
    }

    pub fn refine() -> Self {
        Self::Refine {
            role: AgentRole::ShortAsk,
        }
    }

    pub fn ask(question: impl Into<String>) -> Self {
        Self::Ask {
            question: question.into(),
            role: AgentRole::Generic,
        }
    }

    pub fn action(&self) -> ActionKind {
        match self {
            Self::Submit { .. } => ActionKind::Submit,
            Self::Regenerate => ActionKind::Regenerate,
            Self::Refine { .. } => ActionKind::Refine,
            Self::Ask { .. } => ActionKind::Ask,
        }
    }
}

/// A prepared agent invocation, ready to hand to an [`AgentClient`]
#[derive(Debug, Clone)]
pub struct AgentCall {
    pub action: ActionKind,
    pub role: AgentRole,
    pub target: AgentTarget,
    pub text: String,
}

impl AgentCall {
    pub async fn invoke(&self, client: &dyn AgentClient) -> Result<String, AgentError> {
        client.invoke(self.role, &self.target, &self.text).await
    }
}

/// Process-lifetime application state
#[derive(Debug, Default)]
pub struct Session {
    credentials: Option<Credentials>,
    original_input: Option<String>,
    template: Option<Template>,
    plan: Option<String>,
    editing_plan: bool,
    document: String,
    chat: Vec<ChatMessage>,
    requested_screen: Screen,
    actions: HashMap<ActionKind, ActionState>,
    pending_submit: Option<(String, Option<Template>)>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_credentials(credentials: Option<Credentials>) -> Self {
        let mut session = Self::new();
        session.set_credentials(credentials);
        session
    }

    // === Accessors ===

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    pub fn original_input(&self) -> Option<&str> {
        self.original_input.as_deref()
    }

    pub fn template(&self) -> Option<Template> {
        self.template
    }

    pub fn plan(&self) -> Option<&str> {
        self.plan.as_deref()
    }

    pub fn is_editing_plan(&self) -> bool {
        self.editing_plan
    }

    pub fn document(&self) -> &str {
        &self.document
    }

    /// Document length in characters, as shown under the editor
    pub fn char_count(&self) -> usize {
        self.document.chars().count()
    }

    pub fn chat(&self) -> &[ChatMessage] {
        &self.chat
    }

    /// Content of the most recent assistant reply
    pub fn last_response(&self) -> Option<&str> {
        self.chat
            .iter()
            .rev()
            .find(|m| m.role == ChatRole::Assistant)
            .map(|m| m.content.as_str())
    }

    pub fn action_state(&self, action: ActionKind) -> ActionState {
        self.actions.get(&action).copied().unwrap_or_default()
    }

    pub fn is_busy(&self, action: ActionKind) -> bool {
        self.action_state(action) == ActionState::InFlight
    }

    pub fn any_in_flight(&self) -> bool {
        ActionKind::ALL.into_iter().any(|a| self.is_busy(a))
    }

    // === Screens ===

    /// Resolved screen: execution needs a plan and credentials
    pub fn screen(&self) -> Screen {
        match self.requested_screen {
            Screen::Execution if self.has_plan() && self.credentials.is_some() => Screen::Execution,
            _ => Screen::Input,
        }
    }

    pub fn show_input(&mut self) {
        debug!("show_input: called");
        self.requested_screen = Screen::Input;
    }

    pub fn show_execution(&mut self) {
        debug!("show_execution: called");
        self.requested_screen = Screen::Execution;
    }

    fn has_plan(&self) -> bool {
        self.plan.as_deref().is_some_and(|p| !p.trim().is_empty())
    }

    // === Credentials ===

    /// Install credentials loaded from a store; incomplete records are dropped
    pub fn set_credentials(&mut self, credentials: Option<Credentials>) {
        debug!(present = credentials.is_some(), "set_credentials: called");
        self.credentials = credentials.filter(Credentials::is_complete);
    }

    /// Validate, persist and install credentials from the settings form
    pub fn save_credentials(
        &mut self,
        store: &dyn CredentialStore,
        credentials: Credentials,
    ) -> Result<Notice, SessionError> {
        debug!("save_credentials: called");
        credentials.validate()?;
        store.put(&credentials)?;
        self.credentials = Some(credentials);
        info!("Credentials saved");
        Ok(Notice::info("Saved", "Credentials saved successfully."))
    }

    fn require_credentials(&self) -> Result<&Credentials, SessionError> {
        self.credentials.as_ref().ok_or(SessionError::MissingCredentials)
    }

    // === Agent-backed actions ===

    /// Start an agent-backed action
    ///
    /// On success the action is in flight and the returned call must be
    /// passed to an agent client, with its result handed to [`Session::complete`].
    /// On error nothing changed.
    pub fn begin(&mut self, request: Request) -> Result<AgentCall, SessionError> {
        let action = request.action();
        debug!(%action, "begin: called");

        if let Some(busy) = ActionKind::ALL
            .into_iter()
            .find(|other| self.is_busy(*other) && action.conflicts_with(*other))
        {
            debug!(%action, %busy, "begin: rejected, conflicting action in flight");
            return Err(SessionError::Busy(busy));
        }

        let credentials = self.require_credentials()?;
        let call = match request {
            Request::Submit { template, custom } => {
                let input = build_input(template, &custom);
                if input.trim().is_empty() {
                    return Err(SessionError::InputRequired);
                }
                let call = AgentCall {
                    action,
                    role: AgentRole::Planning,
                    target: credentials.target(AgentRole::Planning),
                    text: input.clone(),
                };
                self.pending_submit = Some((input, template));
                call
            }
            Request::Regenerate => {
                let input = self
                    .original_input
                    .as_deref()
                    .filter(|i| !i.trim().is_empty())
                    .ok_or(SessionError::NoPlan)?;
                AgentCall {
                    action,
                    role: AgentRole::Planning,
                    target: credentials.target(AgentRole::Planning),
                    text: input.to_string(),
                }
            }
            Request::Refine { role } => {
                if self.document.trim().is_empty() {
                    return Err(SessionError::NoText);
                }
                let task = prompt::refine_task(&self.document);
                AgentCall {
                    action,
                    role,
                    target: credentials.target(role),
                    text: prompt::compose(&task, self.plan.as_deref(), None),
                }
            }
            Request::Ask { question, role } => {
                if question.trim().is_empty() {
                    return Err(SessionError::EmptyQuestion);
                }
                let call = AgentCall {
                    action,
                    role,
                    target: credentials.target(role),
                    text: prompt::compose(&question, self.plan.as_deref(), Some(&self.document)),
                };
                self.chat.push(ChatMessage::user(question));
                call
            }
        };

        self.actions.insert(action, ActionState::InFlight);
        info!(%action, role = %call.role, text_len = call.text.len(), "Agent action started");
        Ok(call)
    }

    /// Finish an action started with [`Session::begin`]
    ///
    /// Always clears the busy guard. On failure the working set is left as it
    /// was, apart from the user message an `Ask` already appended.
    pub fn complete(&mut self, action: ActionKind, result: Result<String, AgentError>) -> Result<Notice, SessionError> {
        debug!(%action, ok = result.is_ok(), "complete: called");
        self.actions.insert(action, ActionState::Idle);
        let pending = if action == ActionKind::Submit {
            self.pending_submit.take()
        } else {
            None
        };

        let content = match result {
            Ok(content) => content,
            Err(e) => {
                warn!(%action, error = %e, "Agent action failed");
                return Err(e.into());
            }
        };

        let notice = match action {
            ActionKind::Submit => {
                if let Some((input, template)) = pending {
                    self.original_input = Some(input);
                    self.template = template;
                }
                self.replace_plan(content);
                self.requested_screen = Screen::Execution;
                Notice::info("Plan Ready", "The execution plan has been generated.")
            }
            ActionKind::Regenerate => {
                self.replace_plan(content);
                Notice::info("Plan Regenerated", "The execution plan has been regenerated successfully.")
            }
            ActionKind::Refine => {
                self.document = content;
                Notice::info("Text Refined", "Your text has been refined successfully.")
            }
            ActionKind::Ask => {
                self.chat.push(ChatMessage::assistant(content));
                Notice::info("Response Received", "The agent replied in the chat.")
            }
        };
        info!(%action, "Agent action completed");
        Ok(notice)
    }

    /// Run one action end to end against `client`
    pub async fn run(&mut self, request: Request, client: &dyn AgentClient) -> Result<Notice, SessionError> {
        let call = self.begin(request)?;
        let result = call.invoke(client).await;
        self.complete(call.action, result)
    }

    fn replace_plan(&mut self, plan: String) {
        self.plan = Some(plan);
        self.editing_plan = false;
    }

    // === Local edits ===

    pub fn toggle_plan_editing(&mut self) -> bool {
        self.editing_plan = !self.editing_plan;
        debug!(editing = self.editing_plan, "toggle_plan_editing: called");
        self.editing_plan
    }

    /// Replace the plan text; only allowed while editing
    pub fn set_plan(&mut self, text: impl Into<String>) -> Result<(), SessionError> {
        if !self.editing_plan {
            return Err(SessionError::PlanReadOnly);
        }
        self.plan = Some(text.into());
        Ok(())
    }

    /// Install a plan produced elsewhere, such as one saved to a file
    ///
    /// No original input comes with it, so the plan cannot be regenerated.
    pub fn load_plan(&mut self, plan: impl Into<String>) {
        debug!("load_plan: called");
        self.replace_plan(plan.into());
    }

    pub fn set_document(&mut self, text: impl Into<String>) {
        self.document = text.into();
    }

    /// Overwrite the document with the plan minus its clarifying questions
    pub fn copy_plan_to_editor(&mut self) -> Result<Notice, SessionError> {
        debug!("copy_plan_to_editor: called");
        let plan = self.plan.as_deref().ok_or(SessionError::NoPlan)?;
        self.document = strip_clarifying_questions(plan);
        Ok(Notice::info("Plan Copied", "The plan has been copied to the editor."))
    }

    /// Append agent output to the document, separated from prior text
    pub fn apply_response_to_document(&mut self, content: &str) {
        debug!(content_len = content.len(), "apply_response_to_document: called");
        if self.document.is_empty() {
            self.document = content.to_string();
        } else {
            self.document = format!("{}{}{}", self.document, SECTION_SEPARATOR, content);
        }
    }

    /// Apply the latest assistant reply, if there is one
    pub fn apply_last_response(&mut self) -> Option<Notice> {
        let content = self.last_response()?.to_string();
        self.apply_response_to_document(&content);
        Some(Notice::info("Applied", "The response has been added to the document."))
    }

    /// Write the document to `path`
    pub fn export_document(&self, path: &Path) -> Result<Notice, SessionError> {
        debug!(path = %path.display(), "export_document: called");
        if self.document.trim().is_empty() {
            return Err(SessionError::EmptyDocument);
        }
        std::fs::write(path, &self.document)?;
        info!(path = %path.display(), chars = self.char_count(), "Exported document");
        Ok(Notice::info(
            "Exported",
            format!("Document exported to {}.", path.display()),
        ))
    }
}

/// Drop everything from the first clarifying-questions heading onward
///
/// Matches a level 1 or 2 markdown heading whose text contains "clarifying
/// questions" in any case. The remainder is trimmed.
pub fn strip_clarifying_questions(plan: &str) -> String {
    static CLARIFYING_HEADING: LazyLock<Regex> = LazyLock::new(|| {
        Regex::new(r"(?im)^#{1,2}[ \t]+[^\n]*clarifying questions").expect("invalid clarifying heading regex")
    });
    let end = CLARIFYING_HEADING.find(plan).map_or(plan.len(), |m| m.start());
    plan[..end].trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::client::mock::MockAgentClient;
    use crate::credentials::{MemoryCredentialStore, sample_credentials};
    use tempfile::TempDir;

    fn ready_session() -> Session {
        Session::with_credentials(Some(sample_credentials()))
    }

    async fn session_with_plan(plan: &str) -> Session {
        let mut session = ready_session();
        let client = MockAgentClient::replying(plan);
        session
            .run(Request::submit(Some(Template::Prd), "for a todo app"), &client)
            .await
            .unwrap();
        session
    }

    #[test]
    fn test_conflict_table() {
        use ActionKind::*;
        for action in ActionKind::ALL {
            assert!(action.conflicts_with(action));
        }
        assert!(Submit.conflicts_with(Regenerate));
        assert!(Regenerate.conflicts_with(Submit));
        assert!(Refine.conflicts_with(Ask));
        assert!(Ask.conflicts_with(Refine));
        assert!(!Submit.conflicts_with(Refine));
        assert!(!Ask.conflicts_with(Regenerate));
    }

    #[tokio::test]
    async fn test_submit_sets_plan_and_switches_screen() {
        let mut session = ready_session();
        assert_eq!(session.screen(), Screen::Input);

        let client = MockAgentClient::replying("1. Research\n2. Draft");
        let notice = session
            .run(Request::submit(Some(Template::PitchDeck), "for a coffee startup"), &client)
            .await
            .unwrap();

        assert_eq!(notice.severity, Severity::Info);
        assert_eq!(session.plan(), Some("1. Research\n2. Draft"));
        assert_eq!(session.original_input(), Some("Create a Pitch Deck: for a coffee startup"));
        assert_eq!(session.template(), Some(Template::PitchDeck));
        assert_eq!(session.screen(), Screen::Execution);

        let calls = client.calls();
        assert_eq!(calls[0].role, AgentRole::Planning);
        assert_eq!(calls[0].agent_id, "plan-agent");
        assert_eq!(calls[0].text, "Create a Pitch Deck: for a coffee startup");
    }

    #[tokio::test]
    async fn test_submit_without_credentials_makes_no_call() {
        let mut session = Session::new();
        let client = MockAgentClient::replying("never");
        let err = session.run(Request::submit(None, "anything"), &client).await.unwrap_err();

        assert!(matches!(err, SessionError::MissingCredentials));
        assert_eq!(err.title(), "Missing Credentials");
        assert_eq!(client.call_count(), 0);
        assert!(!session.is_busy(ActionKind::Submit));
    }

    #[tokio::test]
    async fn test_submit_requires_input() {
        let mut session = ready_session();
        let client = MockAgentClient::replying("never");
        let err = session.run(Request::submit(None, "  \n"), &client).await.unwrap_err();
        assert!(matches!(err, SessionError::InputRequired));
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_submit_failure_leaves_state_unchanged() {
        let mut session = session_with_plan("old plan").await;
        let client = MockAgentClient::new(vec![Err(AgentError::Api {
            status: 429,
            message: String::new(),
        })]);

        let err = session.run(Request::submit(None, "a new idea"), &client).await.unwrap_err();

        assert_eq!(err.kind(), crate::agent::ErrorKind::Transport);
        assert_eq!(session.plan(), Some("old plan"));
        assert_eq!(session.original_input(), Some("Create a Product Requirements Document: for a todo app"));
        assert!(!session.is_busy(ActionKind::Submit));
    }

    #[tokio::test]
    async fn test_regenerate_uses_original_input() {
        let mut session = session_with_plan("first plan").await;
        session.toggle_plan_editing();
        session.set_plan("hand edited").unwrap();

        let client = MockAgentClient::replying("second plan");
        let notice = session.run(Request::Regenerate, &client).await.unwrap();

        assert_eq!(notice.title, "Plan Regenerated");
        assert_eq!(session.plan(), Some("second plan"));
        assert!(!session.is_editing_plan());
        assert_eq!(
            client.calls()[0].text,
            "Create a Product Requirements Document: for a todo app"
        );
    }

    #[tokio::test]
    async fn test_regenerate_without_input_is_rejected() {
        let mut session = ready_session();
        let client = MockAgentClient::replying("never");
        let err = session.run(Request::Regenerate, &client).await.unwrap_err();
        assert!(matches!(err, SessionError::NoPlan));
    }

    #[tokio::test]
    async fn test_refine_replaces_document_with_plan_context() {
        let mut session = session_with_plan("1. Outline").await;
        session.set_document("rough draft");

        let client = MockAgentClient::replying("polished draft");
        let notice = session.run(Request::refine(), &client).await.unwrap();

        assert_eq!(notice.title, "Text Refined");
        assert_eq!(session.document(), "polished draft");
        let call = &client.calls()[0];
        assert_eq!(call.role, AgentRole::ShortAsk);
        assert_eq!(call.agent_id, "ask-agent");
        assert_eq!(
            call.text,
            "**Execution Plan:**\n1. Outline\n\n---\n\n**Task:**\nrefine this text: rough draft"
        );
    }

    #[tokio::test]
    async fn test_refine_with_empty_document() {
        let mut session = session_with_plan("plan").await;
        let client = MockAgentClient::replying("never");
        let err = session.run(Request::refine(), &client).await.unwrap_err();
        assert!(matches!(err, SessionError::NoText));
        assert_eq!(Notice::from_error(Some(ActionKind::Refine), &err).title, "No Text");
        assert_eq!(client.call_count(), 0);
    }

    #[tokio::test]
    async fn test_refine_shape_error_keeps_document() {
        let mut session = session_with_plan("plan").await;
        session.set_document("keep me");
        let client = MockAgentClient::new(vec![Err(AgentError::Shape("no actions".into()))]);

        let err = session.run(Request::refine(), &client).await.unwrap_err();

        assert_eq!(err.kind(), crate::agent::ErrorKind::Shape);
        assert_eq!(session.document(), "keep me");
        let notice = Notice::from_error(Some(ActionKind::Refine), &err);
        assert!(notice.is_error());
        assert!(notice.description.starts_with("Failed to refine text"));
    }

    #[tokio::test]
    async fn test_ask_appends_both_messages_with_full_context() {
        let mut session = session_with_plan("the plan").await;
        session.set_document("the doc");

        let client = MockAgentClient::replying("an answer");
        session.run(Request::ask("what next?"), &client).await.unwrap();

        let chat = session.chat();
        assert_eq!(chat.len(), 2);
        assert_eq!(chat[0].role, ChatRole::User);
        assert_eq!(chat[0].content, "what next?");
        assert_eq!(chat[1].role, ChatRole::Assistant);
        assert_eq!(chat[1].content, "an answer");
        assert_eq!(session.last_response(), Some("an answer"));

        let call = &client.calls()[0];
        assert_eq!(call.role, AgentRole::Generic);
        assert_eq!(
            call.text,
            "**Execution Plan:**\nthe plan\n\n---\n\n**Current Document:**\nthe doc\n\n---\n\n**Task:**\nwhat next?"
        );
    }

    #[tokio::test]
    async fn test_ask_failure_keeps_optimistic_message() {
        let mut session = session_with_plan("plan").await;
        let client = MockAgentClient::new(vec![Err(AgentError::Api {
            status: 500,
            message: String::new(),
        })]);

        assert!(session.run(Request::ask("hello?"), &client).await.is_err());

        assert_eq!(session.chat().len(), 1);
        assert_eq!(session.chat()[0].role, ChatRole::User);
        assert!(session.last_response().is_none());
        assert!(!session.is_busy(ActionKind::Ask));
    }

    #[test]
    fn test_ask_rejects_blank_question() {
        let mut session = ready_session();
        let err = session.begin(Request::ask("   ")).unwrap_err();
        assert!(matches!(err, SessionError::EmptyQuestion));
        assert!(session.chat().is_empty());
    }

    #[test]
    fn test_busy_guard_blocks_conflicting_actions() {
        let mut session = ready_session();
        session.set_document("draft");

        let call = session.begin(Request::refine()).unwrap();
        assert!(session.is_busy(ActionKind::Refine));

        let err = session.begin(Request::refine()).unwrap_err();
        assert!(matches!(err, SessionError::Busy(ActionKind::Refine)));
        let err = session.begin(Request::ask("q")).unwrap_err();
        assert!(matches!(err, SessionError::Busy(ActionKind::Refine)));
        assert!(session.chat().is_empty());

        // planning actions are independent of document actions
        let submit = session.begin(Request::submit(None, "idea")).unwrap();
        assert!(matches!(
            session.begin(Request::Regenerate),
            Err(SessionError::Busy(ActionKind::Submit))
        ));

        session.complete(call.action, Ok("done".into())).unwrap();
        session.complete(submit.action, Ok("plan".into())).unwrap();
        assert!(!session.any_in_flight());
        assert!(session.begin(Request::ask("q")).is_ok());
    }

    #[test]
    fn test_complete_clears_guard_on_error() {
        let mut session = ready_session();
        session.set_document("draft");
        let call = session.begin(Request::refine()).unwrap();
        assert!(session.complete(call.action, Err(AgentError::Shape("x".into()))).is_err());
        assert_eq!(session.action_state(ActionKind::Refine), ActionState::Idle);
    }

    #[tokio::test]
    async fn test_screen_redirects_without_credentials() {
        let mut session = session_with_plan("plan").await;
        assert_eq!(session.screen(), Screen::Execution);

        session.set_credentials(None);
        assert_eq!(session.screen(), Screen::Input);

        session.set_credentials(Some(sample_credentials()));
        assert_eq!(session.screen(), Screen::Execution);
        session.show_input();
        assert_eq!(session.screen(), Screen::Input);
    }

    #[test]
    fn test_show_execution_without_plan_resolves_to_input() {
        let mut session = ready_session();
        session.show_execution();
        assert_eq!(session.screen(), Screen::Input);
    }

    #[test]
    fn test_set_plan_requires_editing() {
        let mut session = ready_session();
        assert!(matches!(session.set_plan("x"), Err(SessionError::PlanReadOnly)));
        assert!(session.toggle_plan_editing());
        session.set_plan("edited").unwrap();
        assert_eq!(session.plan(), Some("edited"));
        assert!(!session.toggle_plan_editing());
    }

    #[test]
    fn test_strip_clarifying_questions() {
        let plan = "1. Intro\n2. Body\n\n## Quick clarifying questions\n- Who is the audience?";
        assert_eq!(strip_clarifying_questions(plan), "1. Intro\n2. Body");

        let plan = "# Plan\nStep one\n# CLARIFYING QUESTIONS\n- Budget?";
        assert_eq!(strip_clarifying_questions(plan), "# Plan\nStep one");

        assert_eq!(strip_clarifying_questions("  just a plan \n"), "just a plan");
        // level three headings are part of the plan
        let plan = "Steps\n### Clarifying questions\n- x";
        assert_eq!(strip_clarifying_questions(plan), plan);
    }

    #[test]
    fn test_copy_plan_to_editor_is_idempotent() {
        let mut session = ready_session();
        assert!(matches!(session.copy_plan_to_editor(), Err(SessionError::NoPlan)));

        session.toggle_plan_editing();
        session.set_plan("Outline\n\n## Clarifying Questions\n- Tone?").unwrap();
        session.set_document("old text");

        session.copy_plan_to_editor().unwrap();
        assert_eq!(session.document(), "Outline");
        session.copy_plan_to_editor().unwrap();
        assert_eq!(session.document(), "Outline");
    }

    #[test]
    fn test_apply_response_to_document() {
        let mut session = Session::new();
        session.apply_response_to_document("first");
        assert_eq!(session.document(), "first");
        session.apply_response_to_document("second");
        assert_eq!(session.document(), "first\n\n---\n\nsecond");
    }

    #[test]
    fn test_apply_last_response_without_chat() {
        let mut session = Session::new();
        assert!(session.apply_last_response().is_none());
        assert_eq!(session.document(), "");
    }

    #[test]
    fn test_export_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_EXPORT_FILE);
        let mut session = Session::new();

        assert!(matches!(
            session.export_document(&path),
            Err(SessionError::EmptyDocument)
        ));
        assert!(!path.exists());

        session.set_document("Ünïcode text");
        assert_eq!(session.char_count(), 12);
        let notice = session.export_document(&path).unwrap();
        assert_eq!(notice.title, "Exported");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "Ünïcode text");
    }

    #[test]
    fn test_save_credentials() {
        let store = MemoryCredentialStore::new();
        let mut session = Session::new();

        let mut partial = sample_credentials();
        partial.short_ask_agent_id.clear();
        let err = session.save_credentials(&store, partial).unwrap_err();
        assert_eq!(err.title(), "Incomplete");
        assert!(session.credentials().is_none());
        assert!(store.get().unwrap().is_none());

        let notice = session.save_credentials(&store, sample_credentials()).unwrap();
        assert_eq!(notice.title, "Saved");
        assert!(session.credentials().is_some());
        assert_eq!(store.get().unwrap(), Some(sample_credentials()));
    }

    #[test]
    fn test_set_credentials_drops_incomplete() {
        let mut creds = sample_credentials();
        creds.workspace_id.clear();
        let session = Session::with_credentials(Some(creds));
        assert!(session.credentials().is_none());
    }
}
