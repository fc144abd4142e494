//! Secondary entities are shared between root records and deduplicated by
//! natural key on import.

use std::collections::BTreeSet;

use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use super::Taxonomy;

/// Collapses internal whitespace runs to a single space and trims the ends.
pub(crate) fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// A top-level grouping within a taxonomy, such as `5 Activity/Rest`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Domain {
    /// Surrogate identifier.
    pub id: Uuid,
    /// Owning taxonomy.
    pub taxonomy: Taxonomy,
    /// Ordinal number within the taxonomy. `0` for the sentinel.
    pub number: u32,
    /// Display name, unique within the taxonomy.
    pub name: String,
}

impl Domain {
    /// Name of the domain assigned to sheets that declare none.
    pub const SENTINEL: &'static str = "no domain";

    /// Creates a new domain row with a fresh id.
    #[must_use]
    pub fn new(taxonomy: Taxonomy, number: u32, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            taxonomy,
            number,
            name: collapse_whitespace(name),
        }
    }

    /// The placeholder domain for sheets without a domain section.
    #[must_use]
    pub fn sentinel(taxonomy: Taxonomy) -> Self {
        Self::new(taxonomy, 0, Self::SENTINEL)
    }
}

/// A grouping of root records inside a domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Class {
    /// Surrogate identifier.
    pub id: Uuid,
    /// Owning taxonomy.
    pub taxonomy: Taxonomy,
    /// Short code: digits or one or two capital letters. Empty for the
    /// sentinel.
    pub code: String,
    /// Display name, unique within the taxonomy.
    pub name: String,
    /// The domain the class was first seen under.
    pub domain_id: Uuid,
}

impl Class {
    /// Name of the class assigned to sheets that declare none.
    pub const SENTINEL: &'static str = "no class";

    /// Creates a new class row with a fresh id.
    #[must_use]
    pub fn new(taxonomy: Taxonomy, code: &str, name: &str, domain_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            taxonomy,
            code: code.trim().to_string(),
            name: collapse_whitespace(name),
            domain_id,
        }
    }

    /// The placeholder class for sheets without a class section.
    #[must_use]
    pub fn sentinel(taxonomy: Taxonomy, domain_id: Uuid) -> Self {
        Self::new(taxonomy, "", Self::SENTINEL, domain_id)
    }
}

/// A functional health pattern (optional on diagnoses and outcomes).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pattern {
    /// Surrogate identifier.
    pub id: Uuid,
    /// Owning taxonomy.
    pub taxonomy: Taxonomy,
    /// Ordinal number.
    pub number: u32,
    /// Display name, unique within the taxonomy.
    pub name: String,
}

impl Pattern {
    /// Creates a new pattern row with a fresh id.
    #[must_use]
    pub fn new(taxonomy: Taxonomy, number: u32, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            taxonomy,
            number,
            name: collapse_whitespace(name),
        }
    }
}

/// A single step of an intervention.
///
/// Activities have no published code. Their code is derived from their text,
/// so the same activity listed under two interventions resolves to the same
/// row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Activity {
    /// Surrogate identifier.
    pub id: Uuid,
    /// Content-derived code, see [`Activity::code_for`].
    pub code: String,
    /// Display text as first imported.
    pub name: String,
}

impl Activity {
    /// Creates a new activity row with a fresh id and a derived code.
    #[must_use]
    pub fn new(text: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: Self::code_for(text),
            name: collapse_whitespace(text),
        }
    }

    /// Derives the code of an activity from its text.
    ///
    /// The code is the first 16 hex characters of the SHA-256 of the
    /// lowercased, whitespace-collapsed text.
    ///
    /// ```
    /// use nursecat::domain::Activity;
    ///
    /// assert_eq!(
    ///     Activity::code_for("Monitor  vital signs"),
    ///     Activity::code_for("monitor vital SIGNS"),
    /// );
    /// assert_eq!(Activity::code_for("Monitor vital signs").len(), 16);
    /// ```
    #[must_use]
    pub fn code_for(text: &str) -> String {
        let canonical = collapse_whitespace(text).to_lowercase();
        let hash = Sha256::digest(canonical.as_bytes());
        let mut hex = format!("{hash:x}");
        hex.truncate(16);
        hex
    }
}

/// A human need a diagnosis bears on, such as `Oxygenation (Physiological)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Need {
    /// Surrogate identifier.
    pub id: Uuid,
    /// Grouping of the need, possibly empty.
    pub category: String,
    /// Unique name.
    pub name: String,
}

impl Need {
    /// Creates a new need row with a fresh id.
    #[must_use]
    pub fn new(category: &str, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: collapse_whitespace(category),
            name: collapse_whitespace(name),
        }
    }
}

/// The field of practice an intervention belongs to.
///
/// Every intervention has one. Sheets without a field section get the
/// sentinel field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    /// Surrogate identifier.
    pub id: Uuid,
    /// Grouping of the field, possibly empty.
    pub category: String,
    /// Unique name.
    pub name: String,
}

impl Field {
    /// Name of the placeholder field.
    pub const SENTINEL: &'static str = "no field";

    /// Creates a new field row with a fresh id.
    #[must_use]
    pub fn new(category: &str, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: collapse_whitespace(category),
            name: collapse_whitespace(name),
        }
    }

    /// The placeholder field for sheets without a field section.
    #[must_use]
    pub fn sentinel() -> Self {
        Self::new("", Self::SENTINEL)
    }
}

/// A clinical specialty an intervention or outcome applies to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Specialty {
    /// Surrogate identifier.
    pub id: Uuid,
    /// Unique name.
    pub name: String,
}

impl Specialty {
    /// Creates a new specialty row with a fresh id.
    #[must_use]
    pub fn new(name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: collapse_whitespace(name),
        }
    }
}

/// A measurable indicator of an outcome, such as `210201 Reported pain`.
///
/// Both the code and the name are unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Indicator {
    /// Surrogate identifier.
    pub id: Uuid,
    /// Numeric code, kept as text to preserve leading zeros.
    pub code: String,
    /// Unique name.
    pub name: String,
}

impl Indicator {
    /// Creates a new indicator row with a fresh id.
    #[must_use]
    pub fn new(code: &str, name: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.trim().to_string(),
            name: collapse_whitespace(name),
        }
    }
}

/// One rung of a measurement scale.
#[derive(
    Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, BorshSerialize,
)]
pub struct Level {
    /// Numeric score.
    pub score: u32,
    /// Label shown for the score.
    pub text: String,
}

impl Level {
    /// Creates a level, collapsing whitespace in the label.
    #[must_use]
    pub fn new(score: u32, text: &str) -> Self {
        Self {
            score,
            text: collapse_whitespace(text),
        }
    }
}

/// A Likert-style measurement scale used by outcomes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scale {
    /// Surrogate identifier.
    pub id: Uuid,
    /// Unique code. Either published (`a`, `n-1`) or generated (`S-...`).
    pub code: String,
    /// Free-text description.
    pub description: String,
    /// Levels, in the order they were first imported.
    pub levels: Vec<Level>,
}

impl Scale {
    /// Prefix of generated scale codes.
    pub const GENERATED_PREFIX: &'static str = "S-";

    /// Creates a new scale row with a fresh id.
    #[must_use]
    pub fn new(code: &str, description: &str, levels: Vec<Level>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.trim().to_string(),
            description: collapse_whitespace(description),
            levels,
        }
    }

    /// The order-insensitive, deduplicated level set of this scale.
    #[must_use]
    pub fn canonical_levels(&self) -> BTreeSet<&Level> {
        self.levels.iter().collect()
    }

    /// Whether this scale has the same level set as `levels`, ignoring order
    /// and repeats.
    #[must_use]
    pub fn has_levels(&self, levels: &[Level]) -> bool {
        self.canonical_levels() == levels.iter().collect::<BTreeSet<_>>()
    }

    /// Generates a code for a scale from its levels.
    ///
    /// The code is `S-` followed by 12 hex characters of the SHA-256 of the
    /// borsh-encoded canonical level set, so two scales with the same levels
    /// in any order share a code.
    ///
    /// # Panics
    ///
    /// Panics if borsh serialization fails (which should never happen for this
    /// data structure).
    #[must_use]
    pub fn generated_code(levels: &[Level]) -> String {
        let canonical: BTreeSet<Level> = levels.iter().cloned().collect();

        let encoded = borsh::to_vec(&canonical).expect("this should never fail");
        let hash = Sha256::digest(encoded);

        let mut hex = format!("{hash:x}");
        hex.truncate(12);
        format!("{}{hex}", Self::GENERATED_PREFIX)
    }
}
