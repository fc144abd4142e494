use std::{fs, path::Path};

use anyhow::Context;
use nursecat::{
    Config, Store, StoreError,
    storage::directory::{CATALOG_FILE, CONFIG_FILE},
};
use tracing::instrument;

use super::terminal::Colorize;

#[instrument]
pub fn run(root: &Path) -> anyhow::Result<()> {
    let config_path = root.join(CONFIG_FILE);
    if config_path.exists() || root.join(CATALOG_FILE).exists() {
        anyhow::bail!("Catalog already initialized in {}", root.display());
    }

    fs::create_dir_all(root)
        .with_context(|| format!("failed to create {}", root.display()))?;

    Config::default()
        .save(&config_path)
        .map_err(|e| anyhow::anyhow!("Failed to create {CONFIG_FILE}: {e}"))?;

    // an empty unit of work writes the catalog file
    let store = super::open(root.to_path_buf())?;
    store.with_transaction(|_| Ok::<_, StoreError>(()))?;

    println!(
        "{}",
        format!("Initialized catalog in {}", root.display()).success()
    );
    println!("  Created: {CONFIG_FILE}");
    println!("  Created: {CATALOG_FILE}");
    println!();
    println!("Next steps:");
    println!("  ncat import diagnosis <FILE>...");

    Ok(())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn creates_config_and_catalog() {
        let tmp = tempdir().unwrap();
        let root = tmp.path().join("catalog");

        run(&root).unwrap();

        assert!(root.join(CONFIG_FILE).is_file());
        assert!(root.join(CATALOG_FILE).is_file());
        assert!(run(&root).is_err());
    }
}
