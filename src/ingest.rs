mod error;
pub use error::{BatchImportError, ImportError};

mod normalize;
pub use normalize::Normalizer;

mod extract;
pub use extract::{ExtractError, extract};

/// The typed result of field extraction.
pub mod sheet;
pub use sheet::Sheet;

/// Find-or-create resolution of shared references.
pub mod resolve;

mod write;
pub use write::{Importer, import_from_raw_text, write};

mod update;
pub use update::{ReferenceUpdate, update_references};

mod sources;
pub use sources::collect_sources;
