//! A filesystem backed catalog store
//!
//! The [`DirectoryStore`] keeps the catalog in `catalog.yaml` at the root of a
//! catalog directory, next to `config.toml`. It is a wrapper around the
//! filesystem agnostic [`MemoryStore`].

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use tracing::instrument;

use super::{Catalog, MemoryStore, Store, StoreError, Transaction};
use crate::domain::Config;

/// File name of the persisted catalog.
pub const CATALOG_FILE: &str = "catalog.yaml";

/// File name of the configuration.
pub const CONFIG_FILE: &str = "config.toml";

/// A catalog stored in a directory.
///
/// Every committed unit of work rewrites `catalog.yaml` atomically (temporary
/// file plus rename) before it becomes visible in memory. If the write fails
/// the unit of work is discarded.
#[derive(Debug)]
pub struct DirectoryStore {
    root: PathBuf,
    config: Config,
    inner: MemoryStore,
}

impl DirectoryStore {
    /// Opens the catalog directory at `root`.
    ///
    /// A missing `catalog.yaml` is treated as an empty catalog. A missing or
    /// invalid `config.toml` falls back to the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if `catalog.yaml` exists but cannot be read or parsed.
    #[instrument(level = "debug")]
    pub fn open(root: PathBuf) -> Result<Self, StoreError> {
        let config = load_config(&root);
        let catalog = load_catalog(&root.join(CATALOG_FILE))?;

        Ok(Self {
            root,
            config,
            inner: MemoryStore::with_catalog(catalog),
        })
    }

    /// The root of the catalog directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The configuration loaded when the store was opened.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    fn catalog_path(&self) -> PathBuf {
        self.root.join(CATALOG_FILE)
    }
}

impl Store for DirectoryStore {
    #[instrument(level = "trace", skip_all, fields(root = %self.root.display()))]
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        let path = self.catalog_path();
        self.inner.run(f, |catalog| save_catalog(&path, catalog))
    }

    fn snapshot(&self) -> Catalog {
        self.inner.snapshot()
    }
}

/// Loads the configuration from `<root>/config.toml`, falling back to the
/// default.
#[must_use]
pub fn load_config(root: &Path) -> Config {
    let path = root.join(CONFIG_FILE);
    Config::load(&path).unwrap_or_else(|e| {
        tracing::debug!("Failed to load config: {e}");
        Config::default()
    })
}

fn load_catalog(path: &Path) -> Result<Catalog, StoreError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::debug!("No catalog at {}, starting empty", path.display());
            return Ok(Catalog::default());
        }
        Err(source) => {
            return Err(StoreError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };

    serde_yaml::from_str(&content).map_err(|source| StoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn save_catalog(path: &Path, catalog: &Catalog) -> Result<(), StoreError> {
    let content = serde_yaml::to_string(catalog).map_err(StoreError::Serialize)?;

    let tmp = path.with_extension("yaml.tmp");
    let write = |p: &Path| -> io::Result<()> {
        let mut file = fs::File::create(p)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()
    };

    write(&tmp)
        .and_then(|()| fs::rename(&tmp, path))
        .map_err(|source| {
            // best effort, the temporary file is never read
            let _ = fs::remove_file(&tmp);
            StoreError::Write {
                path: path.to_path_buf(),
                source,
            }
        })?;

    tracing::trace!("Wrote catalog to {}", path.display());
    Ok(())
}
