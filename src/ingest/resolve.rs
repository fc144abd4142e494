//! Find-or-create resolution of the shared vocabulary.
//!
//! Every resolver follows the same protocol: insert the candidate row with
//! [`Transaction::insert_ignore`], then read the row back by natural key.
//! Whichever row holds the key after the insert is the canonical one, so the
//! same reference always resolves to the same id.

use std::collections::HashSet;

use tracing::instrument;
use uuid::Uuid;

use super::{
    ImportError,
    sheet::{Categorized, ClassLine, IndicatorLine, Numbered, ScaleBlock},
};
use crate::{
    domain::{
        Activity, Class, Domain, Field, Indicator, Need, Pattern, Scale, Specialty, Taxonomy,
    },
    storage::{Entity, Transaction},
};

/// Inserts `row` unless its natural key is taken, then returns the row
/// holding the key.
///
/// # Errors
///
/// Returns [`ImportError::StorageConsistency`] if no row holds the key after
/// the insert. This happens when the row was ignored because of a clash on a
/// different unique constraint.
pub fn find_or_create<E: Entity>(tx: &mut Transaction<'_>, row: E) -> Result<E, ImportError> {
    let key = row.key();
    let insertion = tx.insert_ignore(row);

    if let Some(found) = tx.find_one_by_key::<E>(&key) {
        tracing::debug!(table = E::TABLE, ?key, ?insertion, "Resolved reference");
        Ok(found)
    } else {
        tracing::error!(
            table = E::TABLE,
            ?key,
            ?insertion,
            "Row missing after insert-or-ignore"
        );
        Err(ImportError::StorageConsistency {
            table: E::TABLE,
            key: format!("{key:?}"),
        })
    }
}

/// Drops repeated ids, keeping the first occurrence of each.
fn unique(ids: impl IntoIterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}

/// Resolves the domain of a sheet, using the sentinel domain when absent.
///
/// # Errors
///
/// See [`find_or_create`].
pub fn resolve_domain(
    tx: &mut Transaction<'_>,
    taxonomy: Taxonomy,
    domain: Option<&Numbered>,
) -> Result<Domain, ImportError> {
    let row = domain.map_or_else(
        || Domain::sentinel(taxonomy),
        |d| Domain::new(taxonomy, d.number, &d.name),
    );
    find_or_create(tx, row)
}

/// Resolves the class of a sheet within its domain, using the sentinel class
/// when absent.
///
/// A class that already exists keeps the domain it was first seen under.
///
/// # Errors
///
/// See [`find_or_create`].
pub fn resolve_class(
    tx: &mut Transaction<'_>,
    taxonomy: Taxonomy,
    class: Option<&ClassLine>,
    domain: &Domain,
) -> Result<Class, ImportError> {
    let row = class.map_or_else(
        || Class::sentinel(taxonomy, domain.id),
        |c| Class::new(taxonomy, &c.code, &c.name, domain.id),
    );
    let class = find_or_create(tx, row)?;

    if class.domain_id != domain.id {
        tracing::warn!(
            class = %class.name,
            domain = %domain.name,
            "Class already belongs to another domain, keeping the original"
        );
    }

    Ok(class)
}

/// Resolves the optional pattern of a sheet.
///
/// # Errors
///
/// See [`find_or_create`].
pub fn resolve_pattern(
    tx: &mut Transaction<'_>,
    taxonomy: Taxonomy,
    pattern: Option<&Numbered>,
) -> Result<Option<Pattern>, ImportError> {
    pattern
        .map(|p| find_or_create(tx, Pattern::new(taxonomy, p.number, &p.name)))
        .transpose()
}

/// Resolves the optional need of a diagnosis by name.
///
/// # Errors
///
/// See [`find_or_create`].
pub fn resolve_need(
    tx: &mut Transaction<'_>,
    need: Option<&Categorized>,
) -> Result<Option<Need>, ImportError> {
    need.map(|n| find_or_create(tx, Need::new(&n.category, &n.name)))
        .transpose()
}

/// Resolves the field of an intervention by name, using the sentinel field
/// when absent.
///
/// # Errors
///
/// See [`find_or_create`].
pub fn resolve_field(
    tx: &mut Transaction<'_>,
    field: Option<&Categorized>,
) -> Result<Field, ImportError> {
    let row = field.map_or_else(Field::sentinel, |f| Field::new(&f.category, &f.name));
    find_or_create(tx, row)
}

/// Resolves activities by content hash.
///
/// # Errors
///
/// See [`find_or_create`].
pub fn resolve_activities(
    tx: &mut Transaction<'_>,
    activities: &[String],
) -> Result<Vec<Uuid>, ImportError> {
    let ids = activities
        .iter()
        .map(|text| find_or_create(tx, Activity::new(text)).map(|a| a.id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(unique(ids))
}

/// Resolves specialties by name.
///
/// # Errors
///
/// See [`find_or_create`].
pub fn resolve_specialties(
    tx: &mut Transaction<'_>,
    specialties: &[String],
) -> Result<Vec<Uuid>, ImportError> {
    let ids = specialties
        .iter()
        .map(|name| find_or_create(tx, Specialty::new(name)).map(|s| s.id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(unique(ids))
}

/// Resolves indicators by code.
///
/// # Errors
///
/// See [`find_or_create`]. An indicator whose name is already used under a
/// different code cannot be resolved.
pub fn resolve_indicators(
    tx: &mut Transaction<'_>,
    indicators: &[IndicatorLine],
) -> Result<Vec<Uuid>, ImportError> {
    let ids = indicators
        .iter()
        .map(|i| find_or_create(tx, Indicator::new(&i.code, &i.name)).map(|i| i.id))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(unique(ids))
}

/// Resolves a measurement scale.
///
/// In order:
///
/// 1. a scale with an explicit code is found or created by that code;
/// 2. otherwise an existing scale with the same set of levels is reused;
/// 3. otherwise a scale is created under a code generated from its levels.
///
/// # Errors
///
/// See [`find_or_create`].
#[instrument(level = "debug", skip_all)]
pub fn resolve_scale(tx: &mut Transaction<'_>, scale: &ScaleBlock) -> Result<Scale, ImportError> {
    if let Some(code) = &scale.code {
        return find_or_create(
            tx,
            Scale::new(code, &scale.description, scale.levels.clone()),
        );
    }

    if let Some(existing) = tx
        .find_many::<Scale>(|s| s.has_levels(&scale.levels))
        .into_iter()
        .next()
    {
        tracing::debug!(code = %existing.code, "Reusing scale with identical levels");
        return Ok(existing);
    }

    let code = Scale::generated_code(&scale.levels);
    find_or_create(
        tx,
        Scale::new(&code, &scale.description, scale.levels.clone()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        domain::Level,
        storage::{MemoryStore, Store},
    };

    fn with_tx<T>(store: &MemoryStore, f: impl FnOnce(&mut Transaction<'_>) -> Result<T, ImportError>) -> T {
        store.with_transaction(f).unwrap()
    }

    fn levels(pairs: &[(u32, &str)]) -> ScaleBlock {
        ScaleBlock {
            code: None,
            description: String::new(),
            levels: pairs.iter().map(|(s, t)| Level::new(*s, t)).collect(),
        }
    }

    #[test]
    fn domain_resolves_to_one_row() {
        let store = MemoryStore::new();
        let rest = Numbered {
            number: 5,
            name: "Activity/Rest".to_string(),
        };

        let a = with_tx(&store, |tx| resolve_domain(tx, Taxonomy::Diagnosis, Some(&rest)));
        let b = with_tx(&store, |tx| resolve_domain(tx, Taxonomy::Diagnosis, Some(&rest)));

        assert_eq!(a.id, b.id);
        assert_eq!(store.snapshot().table::<Domain>().len(), 1);
    }

    #[test]
    fn same_domain_name_in_other_taxonomy_is_distinct() {
        let store = MemoryStore::new();
        let rest = Numbered {
            number: 5,
            name: "Activity/Rest".to_string(),
        };

        let a = with_tx(&store, |tx| resolve_domain(tx, Taxonomy::Diagnosis, Some(&rest)));
        let b = with_tx(&store, |tx| resolve_domain(tx, Taxonomy::Outcome, Some(&rest)));

        assert_ne!(a.id, b.id);
    }

    #[test]
    fn missing_domain_and_class_use_sentinels() {
        let store = MemoryStore::new();

        let (domain, class) = with_tx(&store, |tx| {
            let domain = resolve_domain(tx, Taxonomy::Intervention, None)?;
            let class = resolve_class(tx, Taxonomy::Intervention, None, &domain)?;
            Ok((domain, class))
        });

        assert_eq!(domain.name, "no domain");
        assert_eq!(domain.number, 0);
        assert_eq!(class.name, "no class");
        assert_eq!(class.domain_id, domain.id);
    }

    #[test]
    fn existing_class_keeps_its_domain() {
        let store = MemoryStore::new();
        let class = ClassLine {
            code: "A".to_string(),
            name: "Activity and exercise management".to_string(),
        };

        let (first, second) = with_tx(&store, |tx| {
            let one = resolve_domain(tx, Taxonomy::Intervention, Some(&Numbered { number: 1, name: "Physiological: basic".to_string() }))?;
            let two = resolve_domain(tx, Taxonomy::Intervention, Some(&Numbered { number: 2, name: "Physiological: complex".to_string() }))?;
            let first = resolve_class(tx, Taxonomy::Intervention, Some(&class), &one)?;
            let second = resolve_class(tx, Taxonomy::Intervention, Some(&class), &two)?;
            assert_eq!(second.domain_id, one.id);
            Ok((first, second))
        });

        assert_eq!(first, second);
    }

    #[test]
    fn need_is_optional_and_shared() {
        let store = MemoryStore::new();
        let oxygenation = Categorized {
            category: "Physiological".to_string(),
            name: "Oxygenation".to_string(),
        };

        let none = with_tx(&store, |tx| resolve_need(tx, None));
        let a = with_tx(&store, |tx| resolve_need(tx, Some(&oxygenation)));
        let b = with_tx(&store, |tx| resolve_need(tx, Some(&oxygenation)));

        assert!(none.is_none());
        assert_eq!(a.map(|n| n.id), b.map(|n| n.id));
        assert_eq!(store.snapshot().table::<Need>().len(), 1);
    }

    #[test]
    fn missing_field_uses_sentinel() {
        let store = MemoryStore::new();

        let a = with_tx(&store, |tx| resolve_field(tx, None));
        let b = with_tx(&store, |tx| resolve_field(tx, None));

        assert_eq!(a.name, Field::SENTINEL);
        assert_eq!(a.id, b.id);
    }

    #[test]
    fn activities_collapse_duplicates_in_order() {
        let store = MemoryStore::new();
        let texts = [
            "Assess pain".to_string(),
            "Encourage rest".to_string(),
            "assess  PAIN".to_string(),
        ];

        let ids = with_tx(&store, |tx| resolve_activities(tx, &texts));

        assert_eq!(ids.len(), 2);
        let snapshot = store.snapshot();
        let first: &Activity = snapshot.get(ids[0]).unwrap();
        assert_eq!(first.name, "Assess pain");
        assert_eq!(snapshot.table::<Activity>().len(), 2);
    }

    #[test]
    fn indicator_name_clash_is_a_consistency_error() {
        let store = MemoryStore::new();
        let lines = [
            IndicatorLine {
                code: "210201".to_string(),
                name: "Reported pain".to_string(),
            },
            IndicatorLine {
                code: "210299".to_string(),
                name: "Reported pain".to_string(),
            },
        ];

        let result: Result<_, ImportError> =
            store.with_transaction(|tx| resolve_indicators(tx, &lines));

        assert!(matches!(
            result,
            Err(ImportError::StorageConsistency { table: "indicators", .. })
        ));
        assert!(store.snapshot().table::<Indicator>().is_empty());
    }

    #[test]
    fn scale_is_deduplicated_by_levels() {
        let store = MemoryStore::new();

        let a = with_tx(&store, |tx| {
            resolve_scale(tx, &levels(&[(1, "Never"), (2, "Rarely")]))
        });
        let b = with_tx(&store, |tx| {
            resolve_scale(tx, &levels(&[(2, "Rarely"), (1, "Never")]))
        });
        let c = with_tx(&store, |tx| {
            resolve_scale(tx, &levels(&[(1, "Never"), (2, "Sometimes")]))
        });

        assert_eq!(a.id, b.id);
        assert_ne!(a.id, c.id);
        assert!(a.code.starts_with("S-"));
        assert_eq!(store.snapshot().table::<Scale>().len(), 2);
    }

    #[test]
    fn structural_match_reuses_published_scale() {
        let store = MemoryStore::new();
        let mut published = levels(&[(1, "Severe"), (5, "None")]);
        published.code = Some("n".to_string());

        let a = with_tx(&store, |tx| resolve_scale(tx, &published));
        let b = with_tx(&store, |tx| resolve_scale(tx, &levels(&[(5, "None"), (1, "Severe")])));

        assert_eq!(a.id, b.id);
        assert_eq!(b.code, "n");
    }

    #[test]
    fn explicit_code_wins_over_levels() {
        let store = MemoryStore::new();
        let mut first = levels(&[(1, "Severe")]);
        first.code = Some("n".to_string());
        let mut second = levels(&[(1, "Never")]);
        second.code = Some("n".to_string());

        let a = with_tx(&store, |tx| resolve_scale(tx, &first));
        let b = with_tx(&store, |tx| resolve_scale(tx, &second));

        assert_eq!(a.id, b.id);
        assert_eq!(b.levels, [Level::new(1, "Severe")]);
    }
}
