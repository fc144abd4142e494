//! An in-memory catalog of every table
//!
//! The [`Catalog`] knows nothing about the filesystem or about transactions.
//! Each [`Table`] enforces the uniqueness of ids, natural keys and alternate
//! keys of its rows.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Deserializer, Serialize, Serializer, de::Error as _};
use uuid::Uuid;

use super::{Entity, StoreError};
use crate::domain::{
    Activity, Class, Code, Domain, Field, Indicator, Need, Pattern, RootRecord, Scale, Specialty,
    Taxonomy,
};

/// The rows of one entity type, indexed by natural key, id and alternate key.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<E: Entity> {
    rows: BTreeMap<E::Key, E>,
    ids: HashMap<Uuid, E::Key>,
    alternates: HashMap<String, Uuid>,
}

impl<E: Entity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            ids: HashMap::new(),
            alternates: HashMap::new(),
        }
    }
}

impl<E: Entity> Table<E> {
    /// Builds a table from rows, rejecting any duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UniqueViolation`] for the first row that clashes
    /// with an earlier one.
    pub fn from_rows(rows: impl IntoIterator<Item = E>) -> Result<Self, StoreError> {
        let mut table = Self::default();
        for row in rows {
            if table.conflicts(&row) {
                return Err(table.violation(&row));
            }
            table.insert_unchecked(row);
        }
        Ok(table)
    }

    /// The number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Looks a row up by natural key.
    #[must_use]
    pub fn get(&self, key: &E::Key) -> Option<&E> {
        self.rows.get(key)
    }

    /// Looks a row up by id.
    #[must_use]
    pub fn get_by_id(&self, id: Uuid) -> Option<&E> {
        self.ids.get(&id).and_then(|key| self.rows.get(key))
    }

    /// Iterates the rows in natural key order.
    pub fn iter(&self) -> impl Iterator<Item = &E> {
        self.rows.values()
    }

    /// Whether inserting `row` as a new row would break a unique constraint.
    pub(crate) fn conflicts(&self, row: &E) -> bool {
        self.ids.contains_key(&row.id())
            || self.rows.contains_key(&row.key())
            || row
                .alternate_key()
                .is_some_and(|alt| self.alternates.contains_key(&alt))
    }

    pub(crate) fn insert_unchecked(&mut self, row: E) {
        let key = row.key();
        if let Some(alt) = row.alternate_key() {
            self.alternates.insert(alt, row.id());
        }
        self.ids.insert(row.id(), key.clone());
        self.rows.insert(key, row);
    }

    /// Inserts `row`, or replaces the row with the same id.
    pub(crate) fn upsert(&mut self, row: E) -> Result<(), StoreError> {
        let id = row.id();
        let key = row.key();

        if self.rows.get(&key).is_some_and(|holder| holder.id() != id) {
            return Err(StoreError::UniqueViolation {
                table: E::TABLE,
                key: format!("{key:?}"),
            });
        }

        if let Some(alt) = row.alternate_key() {
            if self.alternates.get(&alt).is_some_and(|holder| *holder != id) {
                return Err(StoreError::UniqueViolation {
                    table: E::TABLE,
                    key: alt,
                });
            }
        }

        self.remove(id);
        self.insert_unchecked(row);
        Ok(())
    }

    pub(crate) fn remove(&mut self, id: Uuid) -> Option<E> {
        let key = self.ids.remove(&id)?;
        let row = self.rows.remove(&key)?;
        if let Some(alt) = row.alternate_key() {
            self.alternates.remove(&alt);
        }
        Some(row)
    }

    fn violation(&self, row: &E) -> StoreError {
        let key = if self.ids.contains_key(&row.id()) {
            row.id().to_string()
        } else if self.rows.contains_key(&row.key()) {
            format!("{:?}", row.key())
        } else {
            row.alternate_key().unwrap_or_default()
        };
        StoreError::UniqueViolation {
            table: E::TABLE,
            key,
        }
    }
}

impl<E: Entity> Serialize for Table<E> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows.values())
    }
}

impl<'de, E: Entity> Deserialize<'de> for Table<E> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<E>::deserialize(deserializer)?;
        Self::from_rows(rows).map_err(D::Error::custom)
    }
}

/// Every table of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Catalog {
    domains: Table<Domain>,
    classes: Table<Class>,
    patterns: Table<Pattern>,
    needs: Table<Need>,
    fields: Table<Field>,
    activities: Table<Activity>,
    specialties: Table<Specialty>,
    indicators: Table<Indicator>,
    scales: Table<Scale>,
    records: Table<RootRecord>,
}

impl Catalog {
    /// The table holding entities of type `E`.
    #[must_use]
    pub fn table<E: Entity>(&self) -> &Table<E> {
        E::table(self)
    }

    /// Looks up a root record by taxonomy and code.
    #[must_use]
    pub fn record(&self, taxonomy: Taxonomy, code: &Code) -> Option<&RootRecord> {
        self.records.get(&(taxonomy, code.clone()))
    }

    /// Looks up a root record by id.
    #[must_use]
    pub fn record_by_id(&self, id: Uuid) -> Option<&RootRecord> {
        self.records.get_by_id(id)
    }

    /// Iterates the root records of one taxonomy in code order.
    pub fn records(&self, taxonomy: Taxonomy) -> impl Iterator<Item = &RootRecord> {
        self.records
            .iter()
            .filter(move |record| record.taxonomy() == taxonomy)
    }

    /// Looks up any non-root entity by id.
    #[must_use]
    pub fn get<E: Entity>(&self, id: Uuid) -> Option<&E> {
        E::table(self).get_by_id(id)
    }
}

macro_rules! entity {
    ($ty:ty, $field:ident, $table:literal, |$row:ident| $key:expr => $key_ty:ty $(, alt = $alt:expr)?) => {
        impl Entity for $ty {
            type Key = $key_ty;

            const TABLE: &'static str = $table;

            fn id(&self) -> Uuid {
                self.id
            }

            fn key(&self) -> Self::Key {
                let $row = self;
                $key
            }

            $(
                fn alternate_key(&self) -> Option<String> {
                    let $row = self;
                    Some($alt)
                }
            )?

            fn table(catalog: &Catalog) -> &Table<Self> {
                &catalog.$field
            }

            fn table_mut(catalog: &mut Catalog) -> &mut Table<Self> {
                &mut catalog.$field
            }
        }
    };
}

entity!(Domain, domains, "domains", |row| (row.taxonomy, row.name.clone()) => (Taxonomy, String));
entity!(Class, classes, "classes", |row| (row.taxonomy, row.name.clone()) => (Taxonomy, String));
entity!(Pattern, patterns, "patterns", |row| (row.taxonomy, row.name.clone()) => (Taxonomy, String));
entity!(Need, needs, "needs", |row| row.name.clone() => String);
entity!(Field, fields, "fields", |row| row.name.clone() => String);
entity!(Activity, activities, "activities", |row| row.code.clone() => String);
entity!(Specialty, specialties, "specialties", |row| row.name.clone() => String);
entity!(
    Indicator, indicators, "indicators", |row| row.code.clone() => String,
    alt = row.name.clone()
);
entity!(Scale, scales, "scales", |row| row.code.clone() => String);

impl Entity for RootRecord {
    type Key = (Taxonomy, Code);

    const TABLE: &'static str = "records";

    fn id(&self) -> Uuid {
        self.core().id
    }

    fn key(&self) -> Self::Key {
        (self.taxonomy(), self.code().clone())
    }

    /// Display names are unique within a taxonomy.
    fn alternate_key(&self) -> Option<String> {
        Some(format!("{}:{}", self.taxonomy(), self.name()))
    }

    fn table(catalog: &Catalog) -> &Table<Self> {
        &catalog.records
    }

    fn table_mut(catalog: &mut Catalog) -> &mut Table<Self> {
        &mut catalog.records
    }
}

/// The serialized versions of the catalog.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default)]
        domains: Table<Domain>,
        #[serde(default)]
        classes: Table<Class>,
        #[serde(default)]
        patterns: Table<Pattern>,
        #[serde(default)]
        needs: Table<Need>,
        #[serde(default)]
        fields: Table<Field>,
        #[serde(default)]
        activities: Table<Activity>,
        #[serde(default)]
        specialties: Table<Specialty>,
        #[serde(default)]
        indicators: Table<Indicator>,
        #[serde(default)]
        scales: Table<Scale>,
        #[serde(default)]
        records: Table<RootRecord>,
    },
}

impl From<Versions> for Catalog {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                domains,
                classes,
                patterns,
                needs,
                fields,
                activities,
                specialties,
                indicators,
                scales,
                records,
            } => Self {
                domains,
                classes,
                patterns,
                needs,
                fields,
                activities,
                specialties,
                indicators,
                scales,
                records,
            },
        }
    }
}

impl From<Catalog> for Versions {
    fn from(catalog: Catalog) -> Self {
        Self::V1 {
            domains: catalog.domains,
            classes: catalog.classes,
            patterns: catalog.patterns,
            needs: catalog.needs,
            fields: catalog.fields,
            activities: catalog.activities,
            specialties: catalog.specialties,
            indicators: catalog.indicators,
            scales: catalog.scales,
            records: catalog.records,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_rows_rejects_duplicate_keys() {
        let rows = vec![
            Specialty::new("Oncology"),
            Specialty::new("Pediatrics"),
            Specialty::new("Oncology"),
        ];

        let error = Table::from_rows(rows).unwrap_err();
        assert!(matches!(
            error,
            StoreError::UniqueViolation { table: "specialties", .. }
        ));
    }

    #[test]
    fn upsert_replaces_row_with_same_id() {
        let mut table = Table::default();
        let mut specialty = Specialty::new("Oncology");
        table.upsert(specialty.clone()).unwrap();

        specialty.name = "Oncology nursing".to_string();
        table.upsert(specialty.clone()).unwrap();

        assert_eq!(table.len(), 1);
        assert!(table.get(&"Oncology".to_string()).is_none());
        assert_eq!(table.get_by_id(specialty.id), Some(&specialty));
    }

    #[test]
    fn upsert_enforces_alternate_key() {
        let mut table = Table::default();
        table.upsert(Indicator::new("210201", "Reported pain")).unwrap();

        let error = table
            .upsert(Indicator::new("210202", "Reported pain"))
            .unwrap_err();
        assert!(matches!(
            error,
            StoreError::UniqueViolation { table: "indicators", ref key } if key == "Reported pain"
        ));
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn remove_clears_every_index() {
        let mut table = Table::default();
        let indicator = Indicator::new("210201", "Reported pain");
        table.upsert(indicator.clone()).unwrap();

        assert_eq!(table.remove(indicator.id), Some(indicator.clone()));
        assert!(table.is_empty());
        assert!(!table.conflicts(&Indicator::new("210299", "Reported pain")));
    }

    #[test]
    fn catalog_round_trips_through_yaml() {
        let mut catalog = Catalog::default();
        let domain = Domain::new(Taxonomy::Diagnosis, 5, "Activity/Rest");
        catalog.domains.upsert(domain.clone()).unwrap();
        catalog
            .classes
            .upsert(Class::new(Taxonomy::Diagnosis, "4", "Cardiovascular", domain.id))
            .unwrap();

        let yaml = serde_yaml::to_string(&catalog).unwrap();
        assert!(yaml.contains("_version:"));

        let parsed: Catalog = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, catalog);
    }

    #[test]
    fn duplicate_rows_fail_to_parse() {
        let id = Uuid::new_v4();
        let yaml = format!(
            "_version: '1'\nspecialties:\n- id: {id}\n  name: Oncology\n- id: {}\n  name: Oncology\n",
            Uuid::new_v4()
        );

        assert!(serde_yaml::from_str::<Catalog>(&yaml).is_err());
    }
}
