use std::{fmt, io, path::PathBuf};

use nonempty::NonEmpty;

use super::ExtractError;
use crate::{
    domain::Taxonomy,
    storage::{StoreError, ValidationError},
};

/// Errors raised while importing a single fact sheet.
///
/// Every variant aborts the whole import: nothing it wrote is committed.
#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    /// The text could not be understood.
    #[error("malformed fact sheet: {0}")]
    MalformedInput(#[from] ExtractError),

    /// A record with the same code or display name already exists.
    #[error("{taxonomy} '{key}' already exists")]
    Conflict {
        /// The taxonomy of the rejected record.
        taxonomy: Taxonomy,
        /// The clashing code or name.
        key: String,
    },

    /// A row could not be read back straight after an insert-or-ignore.
    #[error("row {key} in table '{table}' could not be read back after insert")]
    StorageConsistency {
        /// The table written to.
        table: &'static str,
        /// The natural key that was looked up.
        key: String,
    },

    /// The record to update does not exist.
    #[error("{taxonomy} '{code}' not found")]
    NotFound {
        /// The taxonomy looked in.
        taxonomy: Taxonomy,
        /// The code looked up.
        code: String,
    },

    /// A reference list was given for a taxonomy that has no such list.
    #[error("a {taxonomy} has no {references}")]
    InapplicableReferences {
        /// The taxonomy of the record.
        taxonomy: Taxonomy,
        /// The kind of reference, such as `indicators`.
        references: &'static str,
    },

    /// Referenced ids did not all exist.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The store failed.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The fact sheet could not be read from disk.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        /// The file that was read.
        path: PathBuf,
        /// The underlying error.
        source: io::Error,
    },
}

impl ImportError {
    /// The HTTP status code a web front end should answer with.
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        match self {
            Self::MalformedInput(_)
            | Self::Validation(_)
            | Self::InapplicableReferences { .. } => 400,
            Self::NotFound { .. } => 404,
            Self::Conflict { .. } => 409,
            Self::StorageConsistency { .. } | Self::Store(_) | Self::Read { .. } => 500,
        }
    }
}

/// Some files of a batch import failed.
///
/// Files that imported cleanly stay imported.
#[derive(Debug, thiserror::Error)]
pub struct BatchImportError {
    /// The number of files that were imported.
    pub imported: usize,
    /// The files that failed, with their errors.
    pub failures: NonEmpty<(PathBuf, ImportError)>,
}

impl fmt::Display for BatchImportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const MAX_DISPLAY: usize = 5;

        write!(
            f,
            "failed to import {} file(s) ({} imported): ",
            self.failures.len(),
            self.imported
        )?;

        let total = self.failures.len();

        let displayed: Vec<String> = self
            .failures
            .iter()
            .take(MAX_DISPLAY)
            .map(|(p, e)| format!("{} ({e})", p.display()))
            .collect();

        let msg = displayed.join(", ");

        if total <= MAX_DISPLAY {
            write!(f, "{msg}")
        } else {
            write!(f, "{msg}... (and {} more)", total - MAX_DISPLAY)
        }
    }
}
