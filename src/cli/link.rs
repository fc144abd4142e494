use std::path::PathBuf;

use clap::Parser;
use nursecat::{LinkOutcome, RecordRef, Taxonomy, UnlinkOutcome, relations};
use tracing::instrument;

use super::terminal::Colorize;

/// The two ends of a link.
#[derive(Debug, Parser)]
pub struct Pair {
    /// The taxonomy of the first record
    #[arg(value_parser = super::parse_taxonomy, value_name = "TAXONOMY")]
    from_taxonomy: Taxonomy,

    /// The code of the first record
    #[arg(value_name = "CODE")]
    from_code: String,

    /// The taxonomy of the second record
    #[arg(value_parser = super::parse_taxonomy, value_name = "TAXONOMY")]
    to_taxonomy: Taxonomy,

    /// The code of the second record
    #[arg(value_name = "CODE")]
    to_code: String,
}

impl Pair {
    fn refs(&self) -> anyhow::Result<(RecordRef, RecordRef)> {
        Ok((
            RecordRef::new(self.from_taxonomy, &self.from_code)?,
            RecordRef::new(self.to_taxonomy, &self.to_code)?,
        ))
    }
}

#[derive(Debug, Parser)]
pub struct Link {
    #[command(flatten)]
    pair: Pair,
}

impl Link {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open(root)?;
        let (a, b) = self.pair.refs()?;

        match relations::link(&store, &a, &b)? {
            LinkOutcome::Linked => println!("{}", format!("Linked {a} to {b}").success()),
            LinkOutcome::AlreadyLinked => {
                println!("{}", format!("{a} is already linked to {b}").warning());
            }
        }

        Ok(())
    }
}

#[derive(Debug, Parser)]
pub struct Unlink {
    #[command(flatten)]
    pair: Pair,
}

impl Unlink {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open(root)?;
        let (a, b) = self.pair.refs()?;

        match relations::unlink(&store, &a, &b)? {
            UnlinkOutcome::Unlinked => println!("{}", format!("Unlinked {a} from {b}").success()),
            UnlinkOutcome::NotLinked => {
                println!("{}", format!("{a} is not linked to {b}").warning());
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nursecat::{Config, DirectoryStore, Store, import_from_raw_text};
    use tempfile::tempdir;

    use super::*;

    fn pair() -> Pair {
        Pair {
            from_taxonomy: Taxonomy::Diagnosis,
            from_code: "00132".to_string(),
            to_taxonomy: Taxonomy::Intervention,
            to_code: "1400".to_string(),
        }
    }

    #[test]
    fn link_and_unlink_persist() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().to_path_buf();
        {
            let store = DirectoryStore::open(root.clone()).unwrap();
            let config = Config::default();
            import_from_raw_text(&store, &config, Taxonomy::Diagnosis, "00132 Acute pain").unwrap();
            import_from_raw_text(&store, &config, Taxonomy::Intervention, "1400 Pain management")
                .unwrap();
        }

        Link { pair: pair() }.run(root.clone()).unwrap();

        let (a, b) = pair().refs().unwrap();
        let catalog = DirectoryStore::open(root.clone()).unwrap().snapshot();
        let diagnosis = catalog.record(a.taxonomy, &a.code).unwrap();
        let intervention = catalog.record(b.taxonomy, &b.code).unwrap();
        assert!(diagnosis.links().get(Taxonomy::Intervention).contains(&intervention.id()));

        Unlink { pair: pair() }.run(root.clone()).unwrap();

        let catalog = DirectoryStore::open(root).unwrap().snapshot();
        assert!(catalog.record(a.taxonomy, &a.code).unwrap().links().is_empty());
    }

    #[test]
    fn link_to_missing_record_fails() {
        let tmp = tempdir().unwrap();

        let result = Link { pair: pair() }.run(tmp.path().to_path_buf());

        assert!(result.is_err());
    }
}
