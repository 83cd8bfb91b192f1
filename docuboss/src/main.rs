//! DocuBoss - plan-first document drafting
//!
//! CLI entry point: one-shot agent commands, credential management,
//! the relay server, and the interactive TUI.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{CommandFactory, FromArgMatches};
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use docuboss::agent::{AgentClient, AgentRole, DustClient, create_client};
use docuboss::cli::{Cli, Command, CredentialsCommand, generate_after_help};
use docuboss::config::Config;
use docuboss::credentials::{CredentialStore, Credentials, FileCredentialStore};
use docuboss::relay;
use docuboss::session::{ActionKind, Notice, Request, Session, SessionError, Template};
use docuboss::tui;

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docuboss")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Priority: CLI --log-level > config file > default (INFO)
    let level = match cli_log_level.or(config_log_level) {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    };

    let log_file = fs::File::create(log_dir.join("docuboss.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    // Build command with dynamic after_help showing credential and log locations
    let cmd = Cli::command().after_help(generate_after_help());
    let cli = Cli::from_arg_matches(&cmd.get_matches())?;

    let config_log_level = Config::load_log_level(cli.config.as_ref());
    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    let profile = cli
        .profile
        .clone()
        .unwrap_or_else(|| config.credentials.profile.clone());
    let store = FileCredentialStore::new(config.credentials.resolved_path(), profile);
    info!(
        mode = %config.agent.mode,
        credentials = %store.path().display(),
        profile = %store.profile(),
        "DocuBoss loaded config"
    );

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Plan {
            task,
            template,
            output,
        }) => {
            debug!(?template, ?output, "main: matched Plan command");
            cmd_plan(&config, &store, template, &task, output.as_deref()).await
        }
        Some(Command::Refine {
            document,
            plan,
            role,
            output,
        }) => {
            debug!(?document, ?plan, %role, "main: matched Refine command");
            cmd_refine(&config, &store, &document, plan.as_deref(), role, output.as_deref()).await
        }
        Some(Command::Ask {
            question,
            plan,
            document,
            role,
        }) => {
            debug!(?plan, ?document, %role, "main: matched Ask command");
            cmd_ask(&config, &store, question, plan.as_deref(), document.as_deref(), role).await
        }
        Some(Command::Credentials { command }) => match command {
            CredentialsCommand::Set {
                workspace_id,
                api_key,
                planning_agent_id,
                short_ask_agent_id,
                generic_agent_id,
            } => {
                debug!("main: matched CredentialsCommand::Set");
                let credentials = Credentials {
                    workspace_id,
                    api_key,
                    planning_agent_id,
                    short_ask_agent_id,
                    generic_agent_id,
                };
                cmd_credentials_set(&store, credentials)
            }
            CredentialsCommand::Show => {
                debug!("main: matched CredentialsCommand::Show");
                cmd_credentials_show(&store)
            }
        },
        Some(Command::Templates) => {
            debug!("main: matched Templates command");
            cmd_templates();
            Ok(())
        }
        Some(Command::Relay { bind }) => {
            debug!(?bind, "main: matched Relay command");
            let bind = bind.unwrap_or_else(|| config.relay.bind.clone());
            cmd_relay(&config, &bind).await
        }
        None => {
            debug!("main: no command, launching TUI");
            cmd_tui(&config, store).await
        }
    }
}

/// Session seeded with whatever the store holds for the active profile
fn load_session(store: &FileCredentialStore) -> Result<Session> {
    let credentials = store
        .get()
        .context(format!("Failed to read credentials from {}", store.path().display()))?;
    debug!(found = credentials.is_some(), "load_session: credentials loaded");
    Ok(Session::with_credentials(credentials))
}

fn client_for(config: &Config) -> Result<Arc<dyn AgentClient>> {
    create_client(&config.agent).context("Failed to create agent client")
}

/// Print a session error the way the TUI shows it, then fail
fn report(action: Option<ActionKind>, err: SessionError) -> eyre::Report {
    let notice = Notice::from_error(action, &err);
    eprintln!("{} {}: {}", "✗".red(), notice.title.red().bold(), notice.description);
    eyre::Report::new(err)
}

fn read_input(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        debug!("read_input: reading stdin");
        return io::read_to_string(io::stdin()).context("Failed to read stdin");
    }
    fs::read_to_string(path).context(format!("Failed to read {}", path.display()))
}

fn write_output(text: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            fs::write(path, text).context(format!("Failed to write {}", path.display()))?;
            eprintln!("{} Wrote {}", "✓".green(), path.display());
        }
        None => {
            let mut stdout = io::stdout().lock();
            writeln!(stdout, "{}", text)?;
        }
    }
    Ok(())
}

async fn cmd_plan(
    config: &Config,
    store: &FileCredentialStore,
    template: Option<Template>,
    task: &str,
    output: Option<&Path>,
) -> Result<()> {
    debug!(?template, "cmd_plan: called");
    let mut session = load_session(store)?;
    let request = Request::submit(template, task);
    let action = request.action();
    // Preconditions first, so a missing-credentials run never builds a client
    let call = session.begin(request).map_err(|e| report(Some(action), e))?;
    let client = client_for(config)?;
    let result = call.invoke(client.as_ref()).await;
    session.complete(action, result).map_err(|e| report(Some(action), e))?;

    write_output(session.plan().unwrap_or_default(), output)
}

async fn cmd_refine(
    config: &Config,
    store: &FileCredentialStore,
    document: &Path,
    plan: Option<&Path>,
    role: AgentRole,
    output: Option<&Path>,
) -> Result<()> {
    debug!(?document, ?plan, %role, "cmd_refine: called");
    let mut session = load_session(store)?;
    if let Some(path) = plan {
        session.load_plan(read_input(path)?);
    }
    session.set_document(read_input(document)?);

    let request = Request::Refine { role };
    let action = request.action();
    let call = session.begin(request).map_err(|e| report(Some(action), e))?;
    let client = client_for(config)?;
    let result = call.invoke(client.as_ref()).await;
    session.complete(action, result).map_err(|e| report(Some(action), e))?;

    write_output(session.document(), output)
}

async fn cmd_ask(
    config: &Config,
    store: &FileCredentialStore,
    question: String,
    plan: Option<&Path>,
    document: Option<&Path>,
    role: AgentRole,
) -> Result<()> {
    debug!(?plan, ?document, %role, "cmd_ask: called");
    let mut session = load_session(store)?;
    if let Some(path) = plan {
        session.load_plan(read_input(path)?);
    }
    if let Some(path) = document {
        session.set_document(read_input(path)?);
    }

    let request = Request::Ask { question, role };
    let action = request.action();
    let call = session.begin(request).map_err(|e| report(Some(action), e))?;
    let client = client_for(config)?;
    let result = call.invoke(client.as_ref()).await;
    session.complete(action, result).map_err(|e| report(Some(action), e))?;

    write_output(session.last_response().unwrap_or_default(), None)
}

fn cmd_credentials_set(store: &FileCredentialStore, credentials: Credentials) -> Result<()> {
    debug!(profile = %store.profile(), "cmd_credentials_set: called");
    let mut session = Session::new();
    let notice = session
        .save_credentials(store, credentials)
        .map_err(|e| report(None, e))?;
    println!(
        "{} {} ({} → {})",
        "✓".green(),
        notice.description,
        store.profile().cyan(),
        store.path().display()
    );
    Ok(())
}

fn cmd_credentials_show(store: &FileCredentialStore) -> Result<()> {
    debug!(profile = %store.profile(), "cmd_credentials_show: called");
    let credentials = store
        .get()
        .context(format!("Failed to read credentials from {}", store.path().display()))?;
    let Some(credentials) = credentials else {
        println!(
            "No credentials stored for profile {} in {}",
            store.profile().cyan(),
            store.path().display().to_string().dimmed()
        );
        return Ok(());
    };

    println!("Profile: {}", store.profile().cyan());
    println!("  {:<20} {}", "workspace-id", credentials.workspace_id);
    println!("  {:<20} {}", "api-key", credentials.masked_api_key());
    for role in AgentRole::ALL {
        println!(
            "  {:<20} {}",
            format!("{}-agent-id", role.name()),
            credentials.agent_id(role)
        );
    }
    Ok(())
}

fn cmd_templates() {
    debug!("cmd_templates: called");
    for template in Template::ALL {
        println!("  {:<20} {}", template.slug().cyan(), template.label());
    }
}

async fn cmd_relay(config: &Config, bind: &str) -> Result<()> {
    debug!(%bind, "cmd_relay: called");
    // The relay always talks to Dust directly, whatever agent.mode says
    let client = DustClient::from_config(&config.agent).context("Failed to create Dust client")?;
    println!("{} Relay listening on {}", "●".green(), bind.cyan());
    relay::serve(bind, Arc::new(client)).await
}

async fn cmd_tui(config: &Config, store: FileCredentialStore) -> Result<()> {
    debug!("cmd_tui: called");
    let session = load_session(&store)?;
    let client = client_for(config)?;
    tui::run(session, client, Arc::new(store)).await
}
