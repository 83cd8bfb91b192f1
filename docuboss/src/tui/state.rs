//! TUI state
//!
//! Everything the views need to draw a frame. The [`Session`] holds the
//! working set; the rest is editor buffers, focus and overlay state.

use std::path::PathBuf;

use tracing::debug;

use crate::agent::AgentRole;
use crate::credentials::Credentials;
use crate::session::{AgentCall, DEFAULT_EXPORT_FILE, Notice, Screen, Session, Template};

/// Pane focused on the execution screen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Pane {
    #[default]
    Plan,
    Document,
    Chat,
}

impl Pane {
    pub fn next(self) -> Self {
        match self {
            Pane::Plan => Pane::Document,
            Pane::Document => Pane::Chat,
            Pane::Chat => Pane::Plan,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Pane::Plan => Pane::Chat,
            Pane::Document => Pane::Plan,
            Pane::Chat => Pane::Document,
        }
    }
}

/// Text field currently receiving keystrokes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Custom,
    Plan,
    Document,
    Question,
    ExportPath,
}

impl Field {
    /// Multi-line fields take Enter as a newline
    pub fn is_multiline(self) -> bool {
        matches!(self, Field::Plan | Field::Document)
    }
}

/// Current interaction mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InteractionMode {
    #[default]
    Normal,
    Editing(Field),
    Settings,
    Help,
}

/// Editable text with a byte-offset cursor
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextInput {
    text: String,
    cursor: usize,
}

impl TextInput {
    pub fn new(text: impl Into<String>) -> Self {
        let text = text.into();
        let cursor = text.len();
        Self { text, cursor }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Replace the contents, cursor at the end
    pub fn set(&mut self, text: impl Into<String>) {
        self.text = text.into();
        self.cursor = self.text.len();
    }

    pub fn take(&mut self) -> String {
        self.cursor = 0;
        std::mem::take(&mut self.text)
    }

    pub fn insert(&mut self, c: char) {
        self.text.insert(self.cursor, c);
        self.cursor += c.len_utf8();
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            let start = self.prev_boundary();
            self.text.drain(start..self.cursor);
            self.cursor = start;
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.len() {
            let end = self.next_boundary();
            self.text.drain(self.cursor..end);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.prev_boundary();
    }

    pub fn right(&mut self) {
        self.cursor = self.next_boundary();
    }

    pub fn home(&mut self) {
        self.cursor = self.text[..self.cursor].rfind('\n').map_or(0, |i| i + 1);
    }

    pub fn end(&mut self) {
        self.cursor = self.text[self.cursor..]
            .find('\n')
            .map_or(self.text.len(), |i| self.cursor + i);
    }

    fn prev_boundary(&self) -> usize {
        self.text[..self.cursor]
            .char_indices()
            .next_back()
            .map_or(0, |(i, _)| i)
    }

    fn next_boundary(&self) -> usize {
        self.text[self.cursor..]
            .chars()
            .next()
            .map_or(self.cursor, |c| self.cursor + c.len_utf8())
    }
}

/// Settings overlay: one input per credential field
#[derive(Debug, Clone, Default)]
pub struct SettingsForm {
    pub fields: [TextInput; 5],
    pub selected: usize,
}

impl SettingsForm {
    pub const LABELS: [&'static str; 5] = [
        "Workspace ID",
        "API Key",
        "Planning Agent ID",
        "Short Ask Agent ID",
        "Generic Agent ID",
    ];

    /// Index of the secret field, masked when not selected
    pub const API_KEY: usize = 1;

    pub fn from_credentials(credentials: Option<&Credentials>) -> Self {
        let Some(c) = credentials else {
            return Self::default();
        };
        Self {
            fields: [
                TextInput::new(c.workspace_id.clone()),
                TextInput::new(c.api_key.clone()),
                TextInput::new(c.planning_agent_id.clone()),
                TextInput::new(c.short_ask_agent_id.clone()),
                TextInput::new(c.generic_agent_id.clone()),
            ],
            selected: 0,
        }
    }

    pub fn to_credentials(&self) -> Credentials {
        let value = |i: usize| self.fields[i].text().trim().to_string();
        Credentials {
            workspace_id: value(0),
            api_key: value(1),
            planning_agent_id: value(2),
            short_ask_agent_id: value(3),
            generic_agent_id: value(4),
        }
    }

    pub fn missing_count(&self) -> usize {
        self.fields.iter().filter(|f| f.is_blank()).count()
    }

    pub fn next(&mut self) {
        self.selected = (self.selected + 1) % self.fields.len();
    }

    pub fn prev(&mut self) {
        self.selected = (self.selected + self.fields.len() - 1) % self.fields.len();
    }

    pub fn selected_mut(&mut self) -> &mut TextInput {
        &mut self.fields[self.selected]
    }
}

/// Application state for the TUI
#[derive(Debug)]
pub struct AppState {
    pub session: Session,
    pub mode: InteractionMode,
    pub focus: Pane,

    // === Input screen ===
    /// Selected template; `None` sends the custom text as-is
    pub template: Option<Template>,
    pub custom_input: TextInput,

    // === Execution screen ===
    pub plan_input: TextInput,
    pub document_input: TextInput,
    pub question_input: TextInput,
    pub export_path: TextInput,
    pub refine_role: AgentRole,
    pub ask_role: AgentRole,

    pub settings: SettingsForm,

    /// Last operation outcome, shown in the footer
    pub notice: Option<Notice>,

    /// Calls accepted by the session, waiting to be spawned
    pub pending_calls: Vec<AgentCall>,

    pub should_quit: bool,
    pub frame_count: u64,
}

impl AppState {
    pub fn new(session: Session) -> Self {
        debug!("AppState::new: called");
        let mut state = Self {
            session,
            mode: InteractionMode::Normal,
            focus: Pane::Plan,
            template: None,
            custom_input: TextInput::default(),
            plan_input: TextInput::default(),
            document_input: TextInput::default(),
            question_input: TextInput::default(),
            export_path: TextInput::new(DEFAULT_EXPORT_FILE),
            refine_role: AgentRole::ShortAsk,
            ask_role: AgentRole::Generic,
            settings: SettingsForm::default(),
            notice: None,
            pending_calls: Vec::new(),
            should_quit: false,
            frame_count: 0,
        };
        state.sync_from_session();
        state
    }

    pub fn screen(&self) -> Screen {
        self.session.screen()
    }

    pub fn set_notice(&mut self, notice: Notice) {
        debug!(title = %notice.title, "AppState::set_notice: called");
        self.notice = Some(notice);
    }

    pub fn clear_notice(&mut self) {
        self.notice = None;
    }

    /// Reload editor buffers after the session changed underneath them
    pub fn sync_from_session(&mut self) {
        if self.plan_input.text() != self.session.plan().unwrap_or_default() {
            self.plan_input.set(self.session.plan().unwrap_or_default());
        }
        if self.document_input.text() != self.session.document() {
            self.document_input.set(self.session.document());
        }
    }

    /// Step through "no template" followed by every template
    pub fn next_template(&mut self) {
        self.template = match self.template {
            None => Some(Template::ALL[0]),
            Some(current) => {
                let idx = Template::ALL.iter().position(|t| *t == current).unwrap_or(0);
                Template::ALL.get(idx + 1).copied()
            }
        };
    }

    pub fn prev_template(&mut self) {
        self.template = match self.template {
            None => Template::ALL.last().copied(),
            Some(current) => {
                let idx = Template::ALL.iter().position(|t| *t == current).unwrap_or(0);
                idx.checked_sub(1).map(|i| Template::ALL[i])
            }
        };
    }

    pub fn export_target(&self) -> PathBuf {
        let path = self.export_path.text().trim();
        PathBuf::from(if path.is_empty() { DEFAULT_EXPORT_FILE } else { path })
    }

    pub fn tick(&mut self) {
        self.frame_count = self.frame_count.wrapping_add(1);
    }

    /// Spinner frame for in-flight actions
    pub fn spinner(&self) -> &'static str {
        const FRAMES: [&str; 4] = ["|", "/", "-", "\\"];
        FRAMES[(self.frame_count / 4 % FRAMES.len() as u64) as usize]
    }
}
