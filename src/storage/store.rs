//! The unit-of-work abstraction shared by every catalog store.

use std::{collections::HashSet, fmt, io, path::PathBuf};

use serde::{Serialize, de::DeserializeOwned};
use uuid::Uuid;

use super::{Catalog, Table};

/// A row type held in one table of the [`Catalog`].
///
/// Every entity has a surrogate id and a natural key, both unique within the
/// table. An entity may also declare an alternate unique key.
pub trait Entity: Clone + fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static {
    /// The natural key.
    type Key: Ord + Clone + fmt::Debug + Send + Sync;

    /// Table name, used in error messages and logs.
    const TABLE: &'static str;

    /// The surrogate id.
    fn id(&self) -> Uuid;

    /// The natural key.
    fn key(&self) -> Self::Key;

    /// An additional unique constraint, if the table has one.
    fn alternate_key(&self) -> Option<String> {
        None
    }

    /// The table holding this entity.
    fn table(catalog: &Catalog) -> &Table<Self>;

    /// Mutable access to the table holding this entity.
    fn table_mut(catalog: &mut Catalog) -> &mut Table<Self>;
}

/// The outcome of [`Transaction::insert_ignore`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Insertion {
    /// The row was inserted.
    Created,
    /// A row with the same id, natural key or alternate key already existed.
    /// Nothing was written.
    Ignored,
}

/// Errors raised by catalog stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A write would have broken a unique constraint.
    #[error("duplicate key {key} in table '{table}'")]
    UniqueViolation {
        /// The table written to.
        table: &'static str,
        /// The offending key.
        key: String,
    },

    /// No row has the given id.
    #[error("no row with id {id} in table '{table}'")]
    NotFound {
        /// The table searched.
        table: &'static str,
        /// The missing id.
        id: Uuid,
    },

    /// The persisted catalog could not be read.
    #[error("failed to read catalog at {}: {source}", path.display())]
    Read {
        /// The catalog file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },

    /// The persisted catalog could not be parsed.
    #[error("failed to parse catalog at {}: {source}", path.display())]
    Parse {
        /// The catalog file.
        path: PathBuf,
        /// The underlying error.
        source: serde_yaml::Error,
    },

    /// The catalog could not be serialized.
    #[error("failed to serialize catalog: {0}")]
    Serialize(#[source] serde_yaml::Error),

    /// The catalog could not be written.
    #[error("failed to write catalog at {}: {source}", path.display())]
    Write {
        /// The catalog file.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

/// A multi-id lookup found fewer rows than were requested.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("expected {requested} rows in table '{table}', found {found}")]
pub struct ValidationError {
    /// The table searched.
    pub table: &'static str,
    /// The number of distinct ids requested.
    pub requested: usize,
    /// The number of rows found.
    pub found: usize,
}

/// A handle on the working copy of a unit of work.
///
/// All reads observe the writes made earlier in the same unit of work. Nothing
/// is visible to other units of work until the store commits.
#[derive(Debug)]
pub struct Transaction<'a> {
    catalog: &'a mut Catalog,
}

impl<'a> Transaction<'a> {
    pub(crate) const fn new(catalog: &'a mut Catalog) -> Self {
        Self { catalog }
    }

    /// Read-only view of the working copy.
    #[must_use]
    pub fn catalog(&self) -> &Catalog {
        self.catalog
    }

    /// Inserts `row` unless it would break a unique constraint.
    ///
    /// A conflict on the id, natural key or alternate key is not an error:
    /// the existing row is kept and [`Insertion::Ignored`] is returned.
    pub fn insert_ignore<E: Entity>(&mut self, row: E) -> Insertion {
        let table = E::table_mut(self.catalog);
        if table.conflicts(&row) {
            return Insertion::Ignored;
        }
        table.insert_unchecked(row);
        Insertion::Created
    }

    /// Finds a row by natural key.
    #[must_use]
    pub fn find_one_by_key<E: Entity>(&self, key: &E::Key) -> Option<E> {
        E::table(self.catalog).get(key).cloned()
    }

    /// Finds a row by id.
    #[must_use]
    pub fn find_by_id<E: Entity>(&self, id: Uuid) -> Option<E> {
        E::table(self.catalog).get_by_id(id).cloned()
    }

    /// Returns every row matching `predicate`, in natural key order.
    #[must_use]
    pub fn find_many<E: Entity>(&self, predicate: impl Fn(&E) -> bool) -> Vec<E> {
        E::table(self.catalog)
            .iter()
            .filter(|row| predicate(row))
            .cloned()
            .collect()
    }

    /// Returns the rows with the given ids, in order of first appearance.
    ///
    /// Unknown ids are skipped and repeated ids yield one row.
    #[must_use]
    pub fn find_by_ids<E: Entity>(&self, ids: &[Uuid]) -> Vec<E> {
        let table = E::table(self.catalog);
        let mut seen = HashSet::with_capacity(ids.len());
        ids.iter()
            .filter(|id| seen.insert(**id))
            .filter_map(|id| table.get_by_id(*id).cloned())
            .collect()
    }

    /// Returns the rows with the given ids, failing unless every distinct id
    /// was found.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError`] if any id is unknown.
    pub fn resolve_ids<E: Entity>(&self, ids: &[Uuid]) -> Result<Vec<E>, ValidationError> {
        let requested = ids.iter().collect::<HashSet<_>>().len();
        let rows = self.find_by_ids::<E>(ids);
        if rows.len() == requested {
            Ok(rows)
        } else {
            Err(ValidationError {
                table: E::TABLE,
                requested,
                found: rows.len(),
            })
        }
    }

    /// Inserts `row`, or replaces the row with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] if another row already holds
    /// the natural key or alternate key of `row`.
    pub fn save<E: Entity>(&mut self, row: E) -> Result<(), StoreError> {
        E::table_mut(self.catalog).upsert(row)
    }

    /// Deletes the row with the given id, returning it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no row has the id.
    pub fn remove<E: Entity>(&mut self, id: Uuid) -> Result<E, StoreError> {
        E::table_mut(self.catalog)
            .remove(id)
            .ok_or(StoreError::NotFound { table: E::TABLE, id })
    }
}

/// A transactional catalog store.
///
/// Units of work are serialized: each runs against a private copy of the
/// committed catalog, which replaces the committed state only when the unit
/// of work returns `Ok`.
pub trait Store: Sync {
    /// Runs `f` as one unit of work.
    ///
    /// Commits if `f` returns `Ok`, discards every write otherwise.
    ///
    /// # Errors
    ///
    /// Returns the error of `f`, or a [`StoreError`] raised while committing.
    fn with_transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut Transaction<'_>) -> Result<T, E>,
        E: From<StoreError>;

    /// A copy of the committed catalog.
    fn snapshot(&self) -> Catalog;
}
