use std::path::Path;

use anyhow::Context;
use nursecat::storage::directory::{CONFIG_FILE, load_config};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, clap::Parser)]
pub struct Config {
    #[command(subcommand)]
    command: ConfigCommand,
}

#[derive(Debug, clap::Subcommand)]
enum ConfigCommand {
    /// Show current configuration
    Show,

    /// Set the edition given to sheets that name none
    ///
    /// Omit the value to clear it.
    Edition {
        /// The default edition
        value: Option<String>,
    },

    /// Strip an additional boilerplate line when importing
    Noise {
        /// The line to drop, matched ignoring case
        line: String,
    },
}

impl Config {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: &Path) -> anyhow::Result<()> {
        let path = root.join(CONFIG_FILE);
        let mut config = load_config(root);

        match self.command {
            ConfigCommand::Show => {
                println!("Configuration:");
                println!(
                    "  default_edition: {}",
                    config
                        .default_edition
                        .as_deref()
                        .map_or_else(|| "(none)".dim(), str::to_string)
                );
                println!("  extensions: {}", config.extensions().join(", "));
                if !config.extra_noise().is_empty() {
                    println!("  extra_noise:");
                    for line in config.extra_noise() {
                        println!("    {line}");
                    }
                }
                return Ok(());
            }
            ConfigCommand::Edition { value } => {
                let message = value.as_deref().map_or_else(
                    || "Cleared the default edition".to_string(),
                    |v| format!("Default edition: {v}"),
                );
                config.default_edition = value;
                save(&config, &path)?;
                println!("{}", message.success());
            }
            ConfigCommand::Noise { line } => {
                if config.add_noise(&line) {
                    save(&config, &path)?;
                    println!("{}", format!("Added noise line '{}'", line.trim()).success());
                } else {
                    println!("{}", "Noise line already configured".warning());
                }
            }
        }

        Ok(())
    }
}

fn save(config: &nursecat::Config, path: &Path) -> anyhow::Result<()> {
    config
        .save(path)
        .map_err(|e| anyhow::anyhow!("{e}"))
        .with_context(|| format!("failed to update {}", path.display()))
}
