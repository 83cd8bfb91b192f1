//! TUI application - event handling and state management
//!
//! The App struct owns the AppState and handles all keyboard events.
//! It does not do any rendering - that's delegated to the views module.
//! Agent calls are only prepared here; the runner spawns them.

use std::sync::Arc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tracing::{debug, trace};

use super::state::{AppState, Field, InteractionMode, Pane, SettingsForm, TextInput};
use crate::agent::{AgentError, AgentRole};
use crate::credentials::CredentialStore;
use crate::session::{ActionKind, AgentCall, Notice, Request, Screen, Session};

/// TUI application
pub struct App {
    /// Application state
    state: AppState,
    /// Where the settings form saves to
    store: Arc<dyn CredentialStore>,
}

impl App {
    pub fn new(session: Session, store: Arc<dyn CredentialStore>) -> Self {
        debug!("App::new: called");
        Self {
            state: AppState::new(session),
            store,
        }
    }

    pub fn state(&self) -> &AppState {
        trace!("App::state: called");
        &self.state
    }

    pub fn state_mut(&mut self) -> &mut AppState {
        trace!("App::state_mut: called");
        &mut self.state
    }

    /// Calls accepted since the last drain
    pub fn take_pending_calls(&mut self) -> Vec<AgentCall> {
        std::mem::take(&mut self.state.pending_calls)
    }

    /// Apply a finished agent call
    pub fn complete(&mut self, action: ActionKind, result: Result<String, AgentError>) {
        debug!(%action, ok = result.is_ok(), "App::complete: called");
        let notice = match self.state.session.complete(action, result) {
            Ok(notice) => notice,
            Err(e) => Notice::from_error(Some(action), &e),
        };
        self.state.set_notice(notice);
        self.state.sync_from_session();

        if self.state.mode == InteractionMode::Editing(Field::Plan) && !self.state.session.is_editing_plan() {
            debug!("App::complete: plan replaced while editing, leaving edit mode");
            self.state.mode = InteractionMode::Normal;
        }
    }

    /// Handle a key event
    ///
    /// Returns true if the application should exit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        debug!(?key, "App::handle_key: called");
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            debug!("App::handle_key: Ctrl+C force quit");
            return true;
        }

        match self.state.mode {
            InteractionMode::Normal => {
                self.state.clear_notice();
                match self.state.screen() {
                    Screen::Input => self.handle_input_screen_key(key),
                    Screen::Execution => self.handle_execution_key(key),
                }
            }
            InteractionMode::Editing(field) => self.handle_edit_key(field, key),
            InteractionMode::Settings => self.handle_settings_key(key),
            InteractionMode::Help => {
                if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
                    self.state.mode = InteractionMode::Normal;
                }
            }
        }
        self.state.should_quit
    }

    /// Keys shared by both screens; returns true when consumed
    fn handle_global_key(&mut self, key: KeyEvent) -> bool {
        match key.code {
            KeyCode::Char('q') => {
                debug!("App::handle_global_key: quit requested");
                self.state.should_quit = true;
            }
            KeyCode::Char('?') | KeyCode::F(1) => {
                self.state.mode = InteractionMode::Help;
            }
            KeyCode::Char('s') => {
                debug!("App::handle_global_key: opening settings");
                self.state.settings = SettingsForm::from_credentials(self.state.session.credentials());
                self.state.mode = InteractionMode::Settings;
            }
            _ => return false,
        }
        true
    }

    fn handle_input_screen_key(&mut self, key: KeyEvent) {
        debug!(?key, "App::handle_input_screen_key: called");
        if self.handle_global_key(key) {
            return;
        }
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.state.prev_template(),
            KeyCode::Down | KeyCode::Char('j') => self.state.next_template(),
            KeyCode::Char('i') | KeyCode::Tab => {
                self.state.mode = InteractionMode::Editing(Field::Custom);
            }
            KeyCode::Enter => self.submit(),
            KeyCode::Char('o') => {
                debug!("App::handle_input_screen_key: reopening execution screen");
                self.state.session.show_execution();
            }
            _ => {}
        }
    }

    fn handle_execution_key(&mut self, key: KeyEvent) {
        debug!(?key, focus = ?self.state.focus, "App::handle_execution_key: called");
        if self.handle_global_key(key) {
            return;
        }
        match key.code {
            KeyCode::Tab => self.state.focus = self.state.focus.next(),
            KeyCode::BackTab => self.state.focus = self.state.focus.prev(),
            KeyCode::Esc | KeyCode::Char('b') => self.state.session.show_input(),
            KeyCode::Enter | KeyCode::Char('e') => self.edit_focused(),
            KeyCode::Char('r') => {
                self.start(Request::Regenerate);
            }
            KeyCode::Char('f') => {
                let role = self.state.refine_role;
                self.start(Request::Refine { role });
            }
            KeyCode::Char('c') => {
                let result = self.state.session.copy_plan_to_editor();
                self.report(None, result);
                self.state.sync_from_session();
            }
            KeyCode::Char('a') => {
                let notice = self.state.session.apply_last_response().unwrap_or_else(|| {
                    Notice::error("No Response", "Ask a question before applying a response.")
                });
                self.state.set_notice(notice);
                self.state.sync_from_session();
            }
            KeyCode::Char('x') => {
                self.state.mode = InteractionMode::Editing(Field::ExportPath);
            }
            KeyCode::Char('m') => self.cycle_role(),
            _ => {}
        }
    }

    fn edit_focused(&mut self) {
        match self.state.focus {
            Pane::Plan => {
                if self.state.session.plan().is_none() {
                    return;
                }
                if !self.state.session.is_editing_plan() {
                    self.state.session.toggle_plan_editing();
                }
                self.state.mode = InteractionMode::Editing(Field::Plan);
            }
            Pane::Document => self.state.mode = InteractionMode::Editing(Field::Document),
            Pane::Chat => self.state.mode = InteractionMode::Editing(Field::Question),
        }
    }

    /// Switch the agent used by the focused pane
    fn cycle_role(&mut self) {
        let next = |role: AgentRole| {
            let idx = AgentRole::ALL.iter().position(|r| *r == role).unwrap_or(0);
            AgentRole::ALL[(idx + 1) % AgentRole::ALL.len()]
        };
        match self.state.focus {
            Pane::Document => self.state.refine_role = next(self.state.refine_role),
            Pane::Chat => self.state.ask_role = next(self.state.ask_role),
            Pane::Plan => {}
        }
    }

    fn handle_edit_key(&mut self, field: Field, key: KeyEvent) {
        trace!(?field, ?key, "App::handle_edit_key: called");
        match key.code {
            KeyCode::Esc => {
                self.finish_editing(field);
                return;
            }
            KeyCode::Enter if !field.is_multiline() => {
                self.state.mode = InteractionMode::Normal;
                match field {
                    Field::Custom => self.submit(),
                    Field::Question => {
                        let question = self.state.question_input.text().to_string();
                        let role = self.state.ask_role;
                        if self.start(Request::Ask { question, role }) {
                            self.state.question_input.take();
                        }
                    }
                    Field::ExportPath => {
                        let path = self.state.export_target();
                        let result = self.state.session.export_document(&path);
                        self.report(None, result);
                    }
                    Field::Plan | Field::Document => {}
                }
                return;
            }
            _ => {}
        }

        edit_text(self.input_for(field), key);

        match field {
            Field::Plan => {
                let text = self.state.plan_input.text().to_string();
                if let Err(e) = self.state.session.set_plan(text) {
                    self.state.set_notice(Notice::from_error(None, &e));
                }
            }
            Field::Document => {
                let text = self.state.document_input.text().to_string();
                self.state.session.set_document(text);
            }
            _ => {}
        }
    }

    fn finish_editing(&mut self, field: Field) {
        debug!(?field, "App::finish_editing: called");
        if field == Field::Plan && self.state.session.is_editing_plan() {
            self.state.session.toggle_plan_editing();
        }
        self.state.mode = InteractionMode::Normal;
    }

    fn input_for(&mut self, field: Field) -> &mut TextInput {
        match field {
            Field::Custom => &mut self.state.custom_input,
            Field::Plan => &mut self.state.plan_input,
            Field::Document => &mut self.state.document_input,
            Field::Question => &mut self.state.question_input,
            Field::ExportPath => &mut self.state.export_path,
        }
    }

    fn handle_settings_key(&mut self, key: KeyEvent) {
        trace!(?key, "App::handle_settings_key: called");
        match key.code {
            KeyCode::Esc => self.state.mode = InteractionMode::Normal,
            KeyCode::Tab | KeyCode::Down => self.state.settings.next(),
            KeyCode::BackTab | KeyCode::Up => self.state.settings.prev(),
            KeyCode::Enter => {
                let credentials = self.state.settings.to_credentials();
                match self.state.session.save_credentials(self.store.as_ref(), credentials) {
                    Ok(notice) => {
                        self.state.set_notice(notice);
                        self.state.mode = InteractionMode::Normal;
                    }
                    Err(e) => self.state.set_notice(Notice::from_error(None, &e)),
                }
            }
            _ => edit_text(self.state.settings.selected_mut(), key),
        }
    }

    fn submit(&mut self) {
        let custom = self.state.custom_input.text().to_string();
        let template = self.state.template;
        self.start(Request::submit(template, custom));
    }

    /// Hand a request to the session; queue the call or surface the rejection
    fn start(&mut self, request: Request) -> bool {
        let action = request.action();
        debug!(%action, "App::start: called");
        match self.state.session.begin(request) {
            Ok(call) => {
                self.state.pending_calls.push(call);
                true
            }
            Err(e) => {
                self.state.set_notice(Notice::from_error(Some(action), &e));
                false
            }
        }
    }

    fn report(&mut self, action: Option<ActionKind>, result: Result<Notice, crate::session::SessionError>) {
        let notice = result.unwrap_or_else(|e| Notice::from_error(action, &e));
        self.state.set_notice(notice);
    }
}

/// Apply an editing key to a text buffer
fn edit_text(input: &mut TextInput, key: KeyEvent) {
    match key.code {
        KeyCode::Char(c) => input.insert(c),
        KeyCode::Enter => input.insert('\n'),
        KeyCode::Backspace => input.backspace(),
        KeyCode::Delete => input.delete(),
        KeyCode::Left => input.left(),
        KeyCode::Right => input.right(),
        KeyCode::Home => input.home(),
        KeyCode::End => input.end(),
        _ => {}
    }
}
