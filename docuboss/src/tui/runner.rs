//! TUI Runner - main loop that owns the terminal and the agent client
//!
//! The TuiRunner is responsible for:
//! - Dispatching terminal events to App
//! - Spawning agent calls the App queued and feeding results back
//! - Rendering after every event

use std::sync::Arc;
use std::time::Duration;

use eyre::Result;
use tokio::sync::mpsc;
use tracing::{debug, info};

use super::Tui;
use super::app::App;
use super::events::{Event, EventHandler};
use super::views;
use crate::agent::{AgentClient, AgentError};
use crate::credentials::CredentialStore;
use crate::session::{ActionKind, Session};

/// Render/tick interval (~30 FPS)
const TICK_RATE: Duration = Duration::from_millis(33);

/// Result reported by a spawned agent task
#[derive(Debug)]
struct AgentOutcome {
    action: ActionKind,
    result: Result<String, AgentError>,
}

/// TUI Runner that manages the terminal and event loop
pub struct TuiRunner {
    app: App,
    terminal: Tui,
    event_handler: EventHandler,
    client: Arc<dyn AgentClient>,
    outcome_tx: mpsc::UnboundedSender<AgentOutcome>,
    outcome_rx: mpsc::UnboundedReceiver<AgentOutcome>,
}

impl TuiRunner {
    pub fn new(terminal: Tui, session: Session, client: Arc<dyn AgentClient>, store: Arc<dyn CredentialStore>) -> Self {
        debug!("TuiRunner::new: called");
        let (outcome_tx, outcome_rx) = mpsc::unbounded_channel();
        Self {
            app: App::new(session, store),
            terminal,
            event_handler: EventHandler::new(TICK_RATE),
            client,
            outcome_tx,
            outcome_rx,
        }
    }

    /// Run the main loop until the user quits
    pub async fn run(&mut self) -> Result<()> {
        debug!("TuiRunner::run: entering main loop");
        loop {
            self.terminal.draw(|frame| views::render(self.app.state(), frame))?;

            tokio::select! {
                event = self.event_handler.next() => {
                    match event? {
                        Event::Tick => self.app.state_mut().tick(),
                        Event::Key(key) => {
                            if self.app.handle_key(key) {
                                break;
                            }
                        }
                        Event::Resize(width, height) => {
                            debug!(width, height, "TuiRunner::run: resize");
                        }
                    }
                }
                Some(outcome) = self.outcome_rx.recv() => {
                    debug!(action = %outcome.action, "TuiRunner::run: agent outcome received");
                    self.app.complete(outcome.action, outcome.result);
                }
            }

            self.spawn_pending_calls();

            if self.app.state().should_quit {
                debug!("TuiRunner::run: should_quit is true, breaking");
                break;
            }
        }

        if self.app.state().session.any_in_flight() {
            info!("Exiting with agent calls still in flight; their results are discarded");
        }
        debug!("TuiRunner::run: exiting");
        Ok(())
    }

    /// Spawn every call the App queued since the last pass
    fn spawn_pending_calls(&mut self) {
        for call in self.app.take_pending_calls() {
            info!(action = %call.action, role = %call.role, "Spawning agent call");
            let client = self.client.clone();
            let tx = self.outcome_tx.clone();
            tokio::spawn(async move {
                let result = call.invoke(client.as_ref()).await;
                // receiver is gone once the TUI exits
                let _ = tx.send(AgentOutcome {
                    action: call.action,
                    result,
                });
            });
        }
    }
}
