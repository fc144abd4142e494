//! Domain models for the nursing catalog.
//!
//! This module contains the taxonomy types, the root records (diagnoses,
//! interventions, outcomes), the shared reference vocabulary and the
//! configuration.

mod config;
pub use config::Config;

/// Validated fixed-width taxonomy codes.
pub mod code;
pub use code::{Code, InvalidCodeError};

mod taxonomy;
pub use taxonomy::{Taxonomy, UnknownTaxonomyError};

/// Shared vocabulary referenced by root records.
pub mod reference;
pub use reference::{
    Activity, Class, Domain, Field, Indicator, Level, Need, Pattern, Scale, Specialty,
};

/// Diagnoses, interventions and outcomes.
pub mod record;
pub use record::{Diagnosis, Intervention, Links, Outcome, RecordCore, RootRecord};
