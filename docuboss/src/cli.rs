//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::debug;

use crate::agent::AgentRole;
use crate::config::CredentialsConfig;
use crate::session::Template;

/// DocuBoss - plan-first document drafting
#[derive(Parser)]
#[command(
    name = "docuboss",
    about = "Plan-first document drafting backed by Dust agents",
    version
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Credentials profile (overrides credentials.profile in config)
    #[arg(long, global = true)]
    pub profile: Option<String>,

    /// Subcommand to execute; the TUI starts when omitted
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Generate an execution plan with the planning agent
    Plan {
        /// What the document should be about
        task: String,

        /// Document template (see `docuboss templates`)
        #[arg(short, long)]
        template: Option<Template>,

        /// Write the plan to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Refine a document, using a plan as context
    Refine {
        /// Document file to refine ("-" reads stdin)
        document: PathBuf,

        /// Plan file to include as context
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Agent to use (planning, short-ask, generic)
        #[arg(short, long, default_value = "short-ask")]
        role: AgentRole,

        /// Write the refined text to a file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Ask a question about a plan and document
    Ask {
        /// The question
        question: String,

        /// Plan file to include as context
        #[arg(short, long)]
        plan: Option<PathBuf>,

        /// Document file to include as context
        #[arg(short, long)]
        document: Option<PathBuf>,

        /// Agent to use (planning, short-ask, generic)
        #[arg(short, long, default_value = "generic")]
        role: AgentRole,
    },

    /// Manage Dust credentials
    Credentials {
        #[command(subcommand)]
        command: CredentialsCommand,
    },

    /// List available document templates
    Templates,

    /// Run the HTTP relay in front of the Dust API
    Relay {
        /// Address to listen on (overrides relay.bind in config)
        #[arg(short, long)]
        bind: Option<String>,
    },
}

/// Credential management subcommands
#[derive(Debug, Subcommand)]
pub enum CredentialsCommand {
    /// Save credentials for the active profile
    Set {
        #[arg(long)]
        workspace_id: String,

        #[arg(long)]
        api_key: String,

        #[arg(long)]
        planning_agent_id: String,

        #[arg(long)]
        short_ask_agent_id: String,

        #[arg(long)]
        generic_agent_id: String,
    },

    /// Show the stored credentials with the API key masked
    Show,
}

/// Get the log file path
pub fn get_log_path() -> PathBuf {
    debug!("get_log_path: called");
    let path = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("docuboss")
        .join("logs")
        .join("docuboss.log");
    debug!(?path, "get_log_path: returning path");
    path
}

/// Generate the after_help text with credential and log locations
pub fn generate_after_help() -> String {
    debug!("generate_after_help: called");
    let credentials_path = CredentialsConfig::default().resolved_path();
    let icon = if credentials_path.exists() {
        "\u{2705}"
    } else {
        "\u{274C}"
    };

    let mut help = String::new();
    help.push_str("Credentials:\n");
    help.push_str(&format!("  {} {}\n", icon, credentials_path.display()));
    help.push('\n');
    help.push_str(&format!("Logs are written to: {}\n", get_log_path().display()));
    help
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_no_command() {
        let cli = Cli::parse_from(["docuboss"]);
        assert!(cli.command.is_none());
        assert!(cli.profile.is_none());
    }

    #[test]
    fn test_cli_parse_plan_with_template() {
        let cli = Cli::parse_from(["docuboss", "plan", "a coffee startup", "--template", "pitch-deck"]);
        match cli.command {
            Some(Command::Plan { task, template, output }) => {
                assert_eq!(task, "a coffee startup");
                assert_eq!(template, Some(Template::PitchDeck));
                assert!(output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_template() {
        assert!(Cli::try_parse_from(["docuboss", "plan", "x", "-t", "novel"]).is_err());
    }

    #[test]
    fn test_cli_parse_refine_defaults_to_short_ask() {
        let cli = Cli::parse_from(["docuboss", "refine", "draft.md", "--plan", "plan.md"]);
        match cli.command {
            Some(Command::Refine { document, plan, role, .. }) => {
                assert_eq!(document, PathBuf::from("draft.md"));
                assert_eq!(plan, Some(PathBuf::from("plan.md")));
                assert_eq!(role, AgentRole::ShortAsk);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_ask_with_role() {
        let cli = Cli::parse_from(["docuboss", "ask", "what next?", "-r", "planning", "-d", "doc.txt"]);
        match cli.command {
            Some(Command::Ask {
                question,
                role,
                document,
                plan,
            }) => {
                assert_eq!(question, "what next?");
                assert_eq!(role, AgentRole::Planning);
                assert_eq!(document, Some(PathBuf::from("doc.txt")));
                assert!(plan.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_cli_parse_credentials_set() {
        let cli = Cli::parse_from([
            "docuboss",
            "--profile",
            "work",
            "credentials",
            "set",
            "--workspace-id",
            "ws",
            "--api-key",
            "sk",
            "--planning-agent-id",
            "p",
            "--short-ask-agent-id",
            "s",
            "--generic-agent-id",
            "g",
        ]);
        assert_eq!(cli.profile.as_deref(), Some("work"));
        assert!(matches!(
            cli.command,
            Some(Command::Credentials {
                command: CredentialsCommand::Set { .. }
            })
        ));
    }

    #[test]
    fn test_cli_parse_relay_bind() {
        let cli = Cli::parse_from(["docuboss", "relay", "--bind", "0.0.0.0:9000"]);
        assert!(matches!(cli.command, Some(Command::Relay { bind: Some(ref b) }) if b == "0.0.0.0:9000"));
    }

    #[test]
    fn test_cli_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["docuboss", "templates", "-l", "debug", "-c", "/tmp/c.yml"]);
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/c.yml")));
    }

    #[test]
    fn test_log_path_is_under_docuboss() {
        let path = get_log_path();
        assert!(path.ends_with("docuboss/logs/docuboss.log"));
    }
}
