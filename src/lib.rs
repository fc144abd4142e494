//! Nursing taxonomy catalog
//!
//! Diagnoses, interventions and outcomes are imported from copy-pasted
//! plain-text fact sheets. Shared vocabulary (domains, classes, activities,
//! specialties, scales, ...) is deduplicated across imports.

pub mod domain;
pub use domain::{Code, Config, RootRecord, Taxonomy};

/// Transactional storage of the catalog.
pub mod storage;
pub use storage::{Catalog, DirectoryStore, MemoryStore, Store, StoreError, Transaction};

/// Free-text ingestion: normalize, extract, resolve, write.
pub mod ingest;
pub use ingest::{ImportError, Importer, ReferenceUpdate, import_from_raw_text, update_references};

pub mod relations;
pub use relations::{LinkOutcome, RecordRef, RelationError, UnlinkOutcome};
