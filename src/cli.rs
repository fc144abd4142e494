use std::path::PathBuf;

mod config;
mod import;
mod init;
mod link;
mod list;
mod remove;
mod show;
mod terminal;

use clap::ArgAction;
use nursecat::{DirectoryStore, RecordRef, Taxonomy};

/// Parse a taxonomy name, accepting the usual aliases (`nanda`, `nic`, ...).
fn parse_taxonomy(s: &str) -> Result<Taxonomy, String> {
    s.parse().map_err(|e| format!("{e}"))
}

/// Opens the catalog directory at `root`.
fn open(root: PathBuf) -> anyhow::Result<DirectoryStore> {
    Ok(DirectoryStore::open(root)?)
}

/// A root record named on the command line by taxonomy and code.
#[derive(Debug, Clone, clap::Args)]
pub struct RecordArg {
    /// The taxonomy of the record (diagnosis, intervention, outcome)
    #[arg(value_parser = parse_taxonomy)]
    taxonomy: Taxonomy,

    /// The code of the record
    code: String,
}

impl RecordArg {
    fn to_ref(&self) -> anyhow::Result<RecordRef> {
        Ok(RecordRef::new(self.taxonomy, &self.code)?)
    }
}

#[derive(Debug, clap::Parser)]
#[command(version, about)]
pub struct Cli {
    /// Verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    /// The path to the root of the catalog directory
    #[arg(short, long, default_value = ".", global = true)]
    root: PathBuf,

    #[command(subcommand)]
    command: Command,
}

impl Cli {
    pub fn run(self) -> anyhow::Result<()> {
        Self::setup_logging(self.verbose);
        self.command.run(self.root)
    }

    fn setup_logging(verbosity: u8) {
        use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

        let level = match verbosity {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        };

        let filter = tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_thread_names(false)
            .with_line_number(false);

        tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .init();
    }
}

#[derive(Debug, clap::Subcommand)]
pub enum Command {
    /// Initialize a new catalog directory
    Init,

    /// Import fact sheets
    ///
    /// Directories are searched recursively for files with a configured
    /// extension. Use `-` to read a single sheet from stdin.
    Import(import::Import),

    /// List the records of a taxonomy
    List(list::List),

    /// Show detailed information about a record
    Show(show::Show),

    /// Link two records of different taxonomies
    Link(link::Link),

    /// Remove the link between two records
    Unlink(link::Unlink),

    /// Delete a record that has no links
    Remove(remove::Remove),

    /// Show or modify configuration settings
    Config(config::Config),
}

impl Command {
    fn run(self, root: PathBuf) -> anyhow::Result<()> {
        match self {
            Self::Init => init::run(&root)?,
            Self::Import(command) => command.run(root)?,
            Self::List(command) => command.run(root)?,
            Self::Show(command) => command.run(root)?,
            Self::Link(command) => command.run(root)?,
            Self::Unlink(command) => command.run(root)?,
            Self::Remove(command) => command.run(root)?,
            Self::Config(command) => command.run(&root)?,
        }
        Ok(())
    }
}
