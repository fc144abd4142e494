//! Cross-taxonomy links between root records.
//!
//! Diagnoses, interventions and outcomes link to each other across
//! taxonomies. Links are always stored on both ends, and every operation here
//! updates both ends in one unit of work.

use std::{collections::BTreeSet, fmt};

use tracing::instrument;
use uuid::Uuid;

use crate::{
    domain::{Code, InvalidCodeError, RootRecord, Taxonomy},
    storage::{Store, StoreError, Transaction, ValidationError},
};

/// Identifies a root record by taxonomy and code.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RecordRef {
    /// The taxonomy of the record.
    pub taxonomy: Taxonomy,
    /// The code of the record.
    pub code: Code,
}

impl RecordRef {
    /// Builds a reference, validating the code against the taxonomy.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCodeError`] if the code has the wrong shape.
    pub fn new(taxonomy: Taxonomy, code: &str) -> Result<Self, InvalidCodeError> {
        Ok(Self {
            taxonomy,
            code: Code::new(taxonomy, code)?,
        })
    }
}

impl fmt::Display for RecordRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.taxonomy, self.code)
    }
}

/// The outcome of [`link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
    /// The records are now linked.
    Linked,
    /// The records were already linked. Nothing was written.
    AlreadyLinked,
}

/// The outcome of [`unlink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnlinkOutcome {
    /// The link was removed.
    Unlinked,
    /// The records were not linked. Nothing was written.
    NotLinked,
}

/// Errors raised when editing links.
#[derive(Debug, thiserror::Error)]
pub enum RelationError {
    /// The record does not exist.
    #[error("{0} not found")]
    NotFound(RecordRef),

    /// Links only join records of different taxonomies.
    #[error("cannot link two records of taxonomy '{0}'")]
    SameTaxonomy(Taxonomy),

    /// The record cannot be removed while other records link to it.
    #[error("{record} still has {links} link(s)")]
    StillLinked {
        /// The record that was to be removed.
        record: RecordRef,
        /// The number of links it holds.
        links: usize,
    },

    /// Some of the target ids do not exist.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

fn load(tx: &Transaction<'_>, record: &RecordRef) -> Result<RootRecord, RelationError> {
    tx.find_one_by_key::<RootRecord>(&(record.taxonomy, record.code.clone()))
        .ok_or_else(|| RelationError::NotFound(record.clone()))
}

fn load_pair(
    tx: &Transaction<'_>,
    a: &RecordRef,
    b: &RecordRef,
) -> Result<(RootRecord, RootRecord), RelationError> {
    if a.taxonomy == b.taxonomy {
        return Err(RelationError::SameTaxonomy(a.taxonomy));
    }
    Ok((load(tx, a)?, load(tx, b)?))
}

/// Links two records of different taxonomies.
///
/// # Errors
///
/// Returns an error if either record is missing, or if both belong to the
/// same taxonomy.
#[instrument(level = "debug", skip_all, fields(a = %a, b = %b))]
pub fn link<S: Store>(store: &S, a: &RecordRef, b: &RecordRef) -> Result<LinkOutcome, RelationError> {
    store.with_transaction(|tx| {
        let (mut left, mut right) = load_pair(tx, a, b)?;

        if left.links().get(b.taxonomy).contains(&right.id()) {
            return Ok(LinkOutcome::AlreadyLinked);
        }

        left.core_mut().links.get_mut(b.taxonomy).insert(right.id());
        right.core_mut().links.get_mut(a.taxonomy).insert(left.id());
        tx.save(left)?;
        tx.save(right)?;

        Ok(LinkOutcome::Linked)
    })
}

/// Removes the link between two records.
///
/// # Errors
///
/// Returns an error if either record is missing, or if both belong to the
/// same taxonomy.
#[instrument(level = "debug", skip_all, fields(a = %a, b = %b))]
pub fn unlink<S: Store>(
    store: &S,
    a: &RecordRef,
    b: &RecordRef,
) -> Result<UnlinkOutcome, RelationError> {
    store.with_transaction(|tx| {
        let (mut left, mut right) = load_pair(tx, a, b)?;

        let removed = left.core_mut().links.get_mut(b.taxonomy).remove(&right.id());
        right.core_mut().links.get_mut(a.taxonomy).remove(&left.id());
        if !removed {
            return Ok(UnlinkOutcome::NotLinked);
        }

        tx.save(left)?;
        tx.save(right)?;

        Ok(UnlinkOutcome::Unlinked)
    })
}

/// Replaces the links of `record` to records of `target`.
///
/// Records that are no longer linked lose their reciprocal link, newly
/// linked records gain one.
///
/// # Errors
///
/// Returns [`RelationError::Validation`] if any id does not name a record of
/// the target taxonomy. Nothing is written in that case.
#[instrument(level = "debug", skip_all, fields(record = %record))]
pub fn set_links<S: Store>(
    store: &S,
    record: &RecordRef,
    target: Taxonomy,
    ids: &[Uuid],
) -> Result<RootRecord, RelationError> {
    if record.taxonomy == target {
        return Err(RelationError::SameTaxonomy(target));
    }

    store.with_transaction(|tx| {
        let mut owner = load(tx, record)?;

        let found = tx.resolve_ids::<RootRecord>(ids)?;
        let requested = found.len();
        let targets: Vec<_> = found.into_iter().filter(|r| r.taxonomy() == target).collect();
        if targets.len() != requested {
            return Err(ValidationError {
                table: "records",
                requested,
                found: targets.len(),
            }
            .into());
        }

        let wanted: BTreeSet<Uuid> = targets.iter().map(RootRecord::id).collect();
        let current = owner.links().get(target).clone();

        for id in current.difference(&wanted) {
            if let Some(mut other) = tx.find_by_id::<RootRecord>(*id) {
                other.core_mut().links.get_mut(record.taxonomy).remove(&owner.id());
                tx.save(other)?;
            }
        }

        for mut other in targets {
            if other.core_mut().links.get_mut(record.taxonomy).insert(owner.id()) {
                tx.save(other)?;
            }
        }

        *owner.core_mut().links.get_mut(target) = wanted;
        tx.save(owner.clone())?;

        Ok(owner)
    })
}

/// Deletes a root record.
///
/// # Errors
///
/// Returns [`RelationError::StillLinked`] while the record holds any link,
/// and [`RelationError::NotFound`] if it does not exist.
#[instrument(level = "debug", skip_all, fields(record = %record))]
pub fn remove<S: Store>(store: &S, record: &RecordRef) -> Result<RootRecord, RelationError> {
    store.with_transaction(|tx| {
        let existing = load(tx, record)?;

        let links = existing.links().iter().count();
        if links > 0 {
            return Err(RelationError::StillLinked {
                record: record.clone(),
                links,
            });
        }

        let removed = tx.remove::<RootRecord>(existing.id())?;
        tracing::info!(record = %record, "Removed record");
        Ok(removed)
    })
}
