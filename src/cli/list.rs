use std::path::PathBuf;

use clap::Parser;
use nursecat::{Catalog, RootRecord, Store, Taxonomy, domain::Class};
use serde::Serialize;
use tracing::instrument;

use super::terminal::{self, Colorize};

/// Command arguments for `ncat list`.
#[derive(Debug, Parser)]
pub struct List {
    /// The taxonomy to list
    #[arg(value_parser = super::parse_taxonomy)]
    taxonomy: Taxonomy,

    /// Print the records as JSON
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Serialize)]
struct Entry<'a> {
    code: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    edition: Option<&'a str>,
    class: Option<&'a str>,
    links: usize,
}

impl<'a> Entry<'a> {
    fn new(catalog: &'a Catalog, record: &'a RootRecord) -> Self {
        let core = record.core();
        Self {
            code: core.code.as_str(),
            name: &core.name,
            edition: core.edition.as_deref(),
            class: catalog
                .get::<Class>(core.class_id)
                .map(|c| c.name.as_str()),
            links: core.links.iter().count(),
        }
    }
}

impl List {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open(root)?;
        let catalog = store.snapshot();
        let entries: Vec<Entry> = catalog
            .records(self.taxonomy)
            .map(|record| Entry::new(&catalog, record))
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&entries)?);
            return Ok(());
        }

        if entries.is_empty() {
            println!("{}", format!("No {} records", self.taxonomy).dim());
            return Ok(());
        }

        let narrow = terminal::is_narrow();
        let width = self.taxonomy.code_digits();
        for entry in &entries {
            let code = format!("{:<width$}", entry.code);
            if narrow {
                println!("{} {}", code.info(), entry.name);
            } else {
                let class = entry.class.unwrap_or_default();
                let links = if entry.links == 0 {
                    String::new()
                } else {
                    format!("[{} link(s)]", entry.links)
                };
                println!(
                    "{} {} {} {}",
                    code.info(),
                    entry.name,
                    class.dim(),
                    links.dim()
                );
            }
        }

        Ok(())
    }
}
