//! VRChat CLI - Command-line interface for the VRChat client crates.
//!
//! Logs in against the REST API and follows the real-time event stream from
//! the terminal. Useful for scripting, debugging subscriptions, and as a
//! worked example of the library API.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use vrc_core::config::{AppConfig, ConfigHandle};
use vrc_core::error::VrcResult;
use vrc_core::logging::{self, LogOptions};
use vrc_core::paths::AppPaths;

/// VRChat - real-time event stream client.
#[derive(Parser)]
#[command(
    name = "vrchat",
    version,
    about = "VRChat API and event stream CLI",
    long_about = "A command-line client for the VRChat API.\n\
                   Log in and follow friend, notification, and group events as they happen."
)]
struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format (text, json).
    #[arg(short = 'f', long, global = true, default_value = "text")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

/// Output format for CLI responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    Text,
    /// JSON output for scripting.
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in and show the current user.
    Login {
        #[command(flatten)]
        login: commands::LoginArgs,
        /// Save the session so later commands skip the login.
        #[arg(long)]
        save: bool,
        /// Print the session token so it can be reused with `listen --token`.
        #[arg(long)]
        print_token: bool,
    },
    /// Connect to the event stream and print events until Ctrl+C.
    Listen {
        #[command(flatten)]
        login: commands::LoginArgs,
        /// Existing session token; skips the login step.
        #[arg(long, env = "VRCHAT_AUTH_TOKEN", hide_env_values = true)]
        token: Option<String>,
        /// Also print the raw `{type, content}` feed for every event.
        #[arg(long)]
        raw: bool,
    },
    /// Inspect or create the configuration file.
    Config {
        #[command(subcommand)]
        action: commands::config::ConfigAction,
    },
}

#[tokio::main]
async fn main() -> VrcResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let paths = AppPaths::resolve()?;
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let config = AppConfig::load_or_default(&config_path)?;

    // Initialize logging
    let options = LogOptions::from_config(&config.logging, config.effective_log_dir(&paths))
        .verbose(cli.verbose);
    let _guard = logging::init_logging(&options)?;

    let config_handle = ConfigHandle::new(config);

    info!("VRChat CLI v{}", vrc_core::constants::APP_VERSION);

    // Dispatch to command handlers
    match cli.command {
        Commands::Login { login, save, print_token } => {
            commands::login::run(config_handle, login, save, print_token, cli.format).await
        }
        Commands::Listen { login, token, raw } => {
            commands::listen::run(config_handle, login, token, raw, cli.format).await
        }
        Commands::Config { action } => {
            commands::config::run(config_handle, &config_path, action, cli.format).await
        }
    }
}
