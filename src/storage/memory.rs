use std::sync::{Mutex, PoisonError};

use tracing::instrument;

use super::{Catalog, Store, StoreError, Transaction};

/// An in-process catalog store.
///
/// Units of work are serialized behind a mutex. Each one mutates a private
/// copy of the committed catalog, which is swapped in on success. A panic
/// inside a unit of work leaves the committed catalog untouched.
#[derive(Debug, Default)]
pub struct MemoryStore {
    committed: Mutex<Catalog>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding an existing catalog.
    #[must_use]
    pub const fn with_catalog(catalog: Catalog) -> Self {
        Self {
            committed: Mutex::new(catalog),
        }
    }

    /// Runs a unit of work, calling `persist` on the working copy just before
    /// it is committed.
    ///
    /// If `persist` fails the unit of work is discarded.
    pub(crate) fn run<T, E, F, P>(&self, f: F, persist: P) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        P: FnOnce(&Catalog) -> Result<(), StoreError>,
        E: From<StoreError>,
    {
        let mut committed = self
            .committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let mut working = committed.clone();
        let value = f(&mut Transaction::new(&mut working))?;

        persist(&working)?;
        *committed = working;

        Ok(value)
    }
}

impl Store for MemoryStore {
    #[instrument(level = "trace", skip_all)]
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>,
    {
        self.run(f, |_| Ok(()))
    }

    fn snapshot(&self) -> Catalog {
        self.committed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
