use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Code, Taxonomy};

/// Cross-taxonomy links of a root record, one id set per taxonomy.
///
/// Links are symmetric: if A links to B, B links to A. A record never links
/// to its own taxonomy.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Links {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    diagnoses: BTreeSet<Uuid>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    interventions: BTreeSet<Uuid>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    outcomes: BTreeSet<Uuid>,
}

impl Links {
    /// The linked ids of records in `taxonomy`.
    #[must_use]
    pub const fn get(&self, taxonomy: Taxonomy) -> &BTreeSet<Uuid> {
        match taxonomy {
            Taxonomy::Diagnosis => &self.diagnoses,
            Taxonomy::Intervention => &self.interventions,
            Taxonomy::Outcome => &self.outcomes,
        }
    }

    pub(crate) const fn get_mut(&mut self, taxonomy: Taxonomy) -> &mut BTreeSet<Uuid> {
        match taxonomy {
            Taxonomy::Diagnosis => &mut self.diagnoses,
            Taxonomy::Intervention => &mut self.interventions,
            Taxonomy::Outcome => &mut self.outcomes,
        }
    }

    /// Whether the record has no links at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnoses.is_empty() && self.interventions.is_empty() && self.outcomes.is_empty()
    }

    /// Iterates all links as `(taxonomy, id)` pairs.
    pub fn iter(&self) -> impl Iterator<Item = (Taxonomy, Uuid)> + '_ {
        Taxonomy::ALL
            .into_iter()
            .flat_map(move |t| self.get(t).iter().map(move |id| (t, *id)))
    }
}

/// Fields shared by every root record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordCore {
    /// Surrogate identifier.
    pub id: Uuid,
    /// Published code, unique within the taxonomy.
    pub code: Code,
    /// Display name, unique within the taxonomy.
    pub name: String,
    /// Edition of the classification the record was taken from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edition: Option<String>,
    /// Free-text definition.
    #[serde(default)]
    pub definition: String,
    /// Owning class.
    pub class_id: Uuid,
    /// Cross-taxonomy links.
    #[serde(default)]
    pub links: Links,
    /// When the record was imported.
    pub imported_at: DateTime<Utc>,
}

impl RecordCore {
    /// Creates the shared part of a new root record with a fresh id.
    #[must_use]
    pub fn new(code: Code, name: String, class_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            code,
            name,
            edition: None,
            definition: String::new(),
            class_id,
            links: Links::default(),
            imported_at: Utc::now(),
        }
    }
}

/// A NANDA-I nursing diagnosis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnosis {
    /// Shared fields.
    #[serde(flatten)]
    pub core: RecordCore,
    /// Optional functional health pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<Uuid>,
    /// Optional need.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_id: Option<Uuid>,
    /// Defining characteristics.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub characteristics: Vec<String>,
    /// Related or risk factors.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub factors: Vec<String>,
    /// Associated conditions, at-risk populations and other observations.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub observations: Vec<String>,
}

/// A NIC nursing intervention.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intervention {
    /// Shared fields.
    #[serde(flatten)]
    pub core: RecordCore,
    /// Field of practice, the sentinel field when the sheet names none.
    pub field_id: Uuid,
    /// Activities, in sheet order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub activity_ids: Vec<Uuid>,
    /// Specialties, in sheet order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specialty_ids: Vec<Uuid>,
}

/// A NOC nursing outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    /// Shared fields.
    #[serde(flatten)]
    pub core: RecordCore,
    /// Optional functional health pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern_id: Option<Uuid>,
    /// Indicators, in sheet order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub indicator_ids: Vec<Uuid>,
    /// Specialties, in sheet order.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specialty_ids: Vec<Uuid>,
    /// Measurement scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale_id: Option<Uuid>,
}

/// A root record of any taxonomy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "taxonomy", rename_all = "lowercase")]
pub enum RootRecord {
    /// A diagnosis.
    Diagnosis(Diagnosis),
    /// An intervention.
    Intervention(Intervention),
    /// An outcome.
    Outcome(Outcome),
}

impl RootRecord {
    /// The taxonomy of the record.
    #[must_use]
    pub const fn taxonomy(&self) -> Taxonomy {
        match self {
            Self::Diagnosis(_) => Taxonomy::Diagnosis,
            Self::Intervention(_) => Taxonomy::Intervention,
            Self::Outcome(_) => Taxonomy::Outcome,
        }
    }

    /// The shared fields of the record.
    #[must_use]
    pub const fn core(&self) -> &RecordCore {
        match self {
            Self::Diagnosis(d) => &d.core,
            Self::Intervention(i) => &i.core,
            Self::Outcome(o) => &o.core,
        }
    }

    pub(crate) const fn core_mut(&mut self) -> &mut RecordCore {
        match self {
            Self::Diagnosis(d) => &mut d.core,
            Self::Intervention(i) => &mut i.core,
            Self::Outcome(o) => &mut o.core,
        }
    }

    /// The surrogate id.
    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.core().id
    }

    /// The published code.
    #[must_use]
    pub const fn code(&self) -> &Code {
        &self.core().code
    }

    /// The display name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.core().name
    }

    /// Cross-taxonomy links.
    #[must_use]
    pub const fn links(&self) -> &Links {
        &self.core().links
    }
}

impl From<Diagnosis> for RootRecord {
    fn from(value: Diagnosis) -> Self {
        Self::Diagnosis(value)
    }
}

impl From<Intervention> for RootRecord {
    fn from(value: Intervention) -> Self {
        Self::Intervention(value)
    }
}

impl From<Outcome> for RootRecord {
    fn from(value: Outcome) -> Self {
        Self::Outcome(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_are_grouped_by_taxonomy() {
        let mut links = Links::default();
        assert!(links.is_empty());

        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        links.get_mut(Taxonomy::Intervention).insert(a);
        links.get_mut(Taxonomy::Outcome).insert(b);

        assert!(!links.is_empty());
        assert!(links.get(Taxonomy::Diagnosis).is_empty());
        assert_eq!(
            links.iter().collect::<Vec<_>>(),
            vec![(Taxonomy::Intervention, a), (Taxonomy::Outcome, b)]
        );
    }

    #[test]
    fn root_record_serializes_with_taxonomy_tag() {
        let code = Code::new(Taxonomy::Intervention, "1400").unwrap();
        let record = RootRecord::from(Intervention {
            core: RecordCore::new(code, "Pain management".to_string(), Uuid::new_v4()),
            field_id: Uuid::new_v4(),
            activity_ids: vec![Uuid::new_v4()],
            specialty_ids: Vec::new(),
        });

        let yaml = serde_yaml::to_string(&record).unwrap();
        assert!(yaml.contains("taxonomy: intervention"));

        let parsed: RootRecord = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, record);
        assert_eq!(parsed.taxonomy(), Taxonomy::Intervention);
        assert_eq!(parsed.code().as_str(), "1400");
    }
}
