use std::{
    io::{self, Read},
    path::PathBuf,
};

use anyhow::Context;
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use nursecat::{Importer, RootRecord, Taxonomy, ingest::collect_sources};
use tracing::instrument;

use super::terminal::Colorize;

#[derive(Debug, Parser)]
pub struct Import {
    /// The taxonomy the sheets belong to (diagnosis, intervention, outcome)
    #[arg(value_parser = super::parse_taxonomy)]
    taxonomy: Taxonomy,

    /// Files or directories to import, or `-` for stdin
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

impl Import {
    #[instrument(level = "debug", skip(self), fields(taxonomy = %self.taxonomy))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open(root)?;
        let importer = Importer::new(&store, store.config());

        if self.paths.iter().any(|p| p.as_os_str() == "-") {
            anyhow::ensure!(
                self.paths.len() == 1,
                "'-' cannot be combined with other paths"
            );
            let mut raw = String::new();
            io::stdin()
                .read_to_string(&mut raw)
                .context("failed to read stdin")?;
            let record = importer.import(self.taxonomy, &raw)?;
            report(&record);
            return Ok(());
        }

        let sources = collect_sources(&self.paths, store.config());
        if sources.is_empty() {
            println!("{}", "No fact sheets found".warning());
            return Ok(());
        }

        let progress = progress_bar(sources.len());
        let result = importer.import_files(self.taxonomy, &sources, |path| {
            progress.set_message(path.display().to_string());
            progress.inc(1);
        });
        progress.finish_and_clear();

        match result {
            Ok(records) => {
                for record in &records {
                    report(record);
                }
                println!(
                    "{}",
                    format!("Imported {} record(s)", records.len()).success()
                );
                Ok(())
            }
            Err(e) => {
                tracing::error!(failed = e.failures.len(), "Batch import failed");
                Err(e.into())
            }
        }
    }
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    match ProgressStyle::with_template("{bar:40} {pos}/{len} {wide_msg}") {
        Ok(style) => bar.set_style(style),
        Err(e) => tracing::debug!("Invalid progress template: {e}"),
    }
    bar
}

fn report(record: &RootRecord) {
    println!(
        "{} {} {}",
        "+".success(),
        record.code().as_str().info(),
        record.name()
    );
}
