//! AgenStock CLI
//!
//! Terminal chat client for the AgenStock research assistant.
//! Provides both TUI (ratatui) and headless modes.

use std::io;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing::info;

use agenstock_cli::auth_cmd::{self, AuthAction};
use agenstock_cli::config::CliConfig;
use agenstock_cli::headless::{self, HeadlessConfig};
use agenstock_cli::session::{self, SessionTarget};
use agenstock_cli::session_cmd::{self, SessionAction};
use agenstock_cli::tui;
use agenstock_core::config::{Config, load_config};
use agenstock_core::tracing_init::{init_file_tracing, init_tracing};

#[derive(Parser, Debug)]
#[command(name = "agenstock")]
#[command(version, about = "AgenStock research assistant CLI", long_about = None)]
struct Cli {
    /// Server base URL (e.g. `http://localhost:8000`)
    #[arg(long, global = true, env = "AGENSTOCK_BASE_URL")]
    base_url: Option<String>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Open the interactive chat (default)
    Chat {
        /// Resume an existing session instead of creating one
        #[arg(short, long)]
        resume: Option<String>,
        /// Title for a new session
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Send one prompt and print the streamed reply
    Ask {
        /// Prompt to send
        prompt: String,
        /// Resume an existing session instead of creating one
        #[arg(short, long)]
        resume: Option<String>,
        /// Title for a new session
        #[arg(short, long)]
        title: Option<String>,
    },
    /// Authentication management
    Auth {
        #[command(subcommand)]
        action: AuthAction,
    },
    /// Stored chat sessions
    Sessions {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cwd = std::env::current_dir().ok();
    let mut config = load_config(cwd.as_deref())?;
    let mut cli_config = CliConfig::load();
    if let Some(url) = cli.base_url.clone().or_else(|| cli_config.base_url.clone()) {
        config.client.base_url = url.trim_end_matches('/').to_string();
    }

    let command = cli.command.unwrap_or(Commands::Chat {
        resume: None,
        title: None,
    });

    // The TUI owns the terminal, so its logs go to a file.
    let filter = config.logging.default_filter();
    let log_json = cli.log_json || config.logging.json;
    if matches!(command, Commands::Chat { .. }) {
        if let Some(path) = CliConfig::config_dir().map(|d| d.join("agenstock.log")) {
            init_file_tracing(&filter, log_json, &path)?;
        }
    } else {
        init_tracing(&filter, log_json);
    }

    info!(version = env!("CARGO_PKG_VERSION"), base_url = %config.client.base_url, "Starting agenstock CLI");

    match command {
        Commands::Chat { resume, title } => {
            let target = session_target(&config, resume, title);
            let chat = session::establish(&config, &cli_config, target).await?;
            tui::run(chat).await?;
        }
        Commands::Ask {
            prompt,
            resume,
            title,
        } => {
            let target = session_target(&config, resume, title);
            let mut chat = session::establish(&config, &cli_config, target).await?;
            let headless_config = HeadlessConfig {
                prompt,
                response_timeout: Duration::from_secs(config.client.response_timeout_secs),
            };
            headless::run(
                &mut chat.relay,
                &mut chat.events,
                headless_config,
                &mut io::stdout(),
                &mut io::stderr(),
            )
            .await?;
        }
        Commands::Auth { action } => {
            auth_cmd::run(action, &mut cli_config, &config.client.base_url).await?;
        }
        Commands::Sessions { action } => {
            let api = session::api_client(&config, &cli_config)?;
            session_cmd::run(&api, action).await?;
        }
    }

    Ok(())
}

fn session_target(config: &Config, resume: Option<String>, title: Option<String>) -> SessionTarget {
    match resume {
        Some(session_id) => SessionTarget::Resume { session_id },
        None => SessionTarget::New {
            title: title.unwrap_or_else(|| config.client.session_title.clone()),
        },
    }
}
