use std::path::PathBuf;

use clap::Parser;
use nursecat::relations;
use tracing::instrument;

use super::{RecordArg, terminal::Colorize};

#[derive(Debug, Parser)]
pub struct Remove {
    #[command(flatten)]
    record: RecordArg,
}

impl Remove {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open(root)?;
        let record = self.record.to_ref()?;

        let removed = relations::remove(&store, &record)?;

        println!(
            "{}",
            format!("Removed {record} {}", removed.name()).success()
        );
        Ok(())
    }
}
