//! Config commands.

use std::path::Path;

use clap::Subcommand;
use console::style;

use vrc_core::config::{AppConfig, ConfigHandle};
use vrc_core::error::{VrcError, VrcResult};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show the effective configuration.
    Show,
    /// Print the path of the configuration file.
    Path,
    /// Write a configuration file with default values.
    Init {
        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

/// Run a config subcommand.
pub async fn run(
    config: ConfigHandle,
    path: &Path,
    action: ConfigAction,
    format: OutputFormat,
) -> VrcResult<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config.read().await;
            match format {
                OutputFormat::Json => {
                    println!("{}", serde_json::to_string_pretty(&*cfg)?);
                }
                OutputFormat::Text => {
                    let text = toml::to_string_pretty(&*cfg)
                        .map_err(|e| VrcError::Config(format!("failed to render config: {e}")))?;
                    println!("{}", style(format!("# {}", path.display())).dim());
                    print!("{text}");
                }
            }
        }
        ConfigAction::Path => match format {
            OutputFormat::Json => {
                println!(
                    "{}",
                    serde_json::json!({ "path": path.display().to_string(), "exists": path.exists() })
                );
            }
            OutputFormat::Text => println!("{}", path.display()),
        },
        ConfigAction::Init { force } => {
            if path.exists() && !force {
                println!(
                    "  {} {} already exists (use --force to overwrite)",
                    style("SKIP").yellow(),
                    path.display()
                );
                return Ok(());
            }
            AppConfig::default().save_to_file(path)?;
            println!("  {} Config written to {}", style("OK").green(), path.display());
        }
    }
    Ok(())
}
