//! Replacing the reference lists of an existing root record.

use tracing::instrument;
use uuid::Uuid;

use super::ImportError;
use crate::{
    domain::{Activity, Code, Indicator, RootRecord, Specialty, Taxonomy},
    storage::{Entity, Store, Transaction},
};

/// New reference lists for a root record.
///
/// `None` leaves a list as it is. `Some` replaces it, in the given order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceUpdate {
    /// Activities of an intervention.
    pub activity_ids: Option<Vec<Uuid>>,
    /// Specialties of an intervention or outcome.
    pub specialty_ids: Option<Vec<Uuid>>,
    /// Indicators of an outcome.
    pub indicator_ids: Option<Vec<Uuid>>,
}

/// Replaces reference lists of the record `taxonomy`/`code`.
///
/// Every id must name an existing row of the matching table. The update is
/// one unit of work: on any error nothing is saved.
///
/// # Errors
///
/// - [`ImportError::NotFound`] if the record does not exist.
/// - [`ImportError::InapplicableReferences`] if a list is given that the
///   taxonomy does not carry.
/// - [`ImportError::Validation`] if some ids do not exist.
/// - [`ImportError::Store`] if saving fails.
#[instrument(level = "debug", skip(store, update), fields(taxonomy = %taxonomy, code = %code))]
pub fn update_references<S: Store>(
    store: &S,
    taxonomy: Taxonomy,
    code: &Code,
    update: &ReferenceUpdate,
) -> Result<RootRecord, ImportError> {
    store.with_transaction(|tx| {
        let mut record = tx
            .find_one_by_key::<RootRecord>(&(taxonomy, code.clone()))
            .ok_or_else(|| ImportError::NotFound {
                taxonomy,
                code: code.to_string(),
            })?;

        match &mut record {
            RootRecord::Diagnosis(_) => {
                reject(taxonomy, "activities", update.activity_ids.as_deref())?;
                reject(taxonomy, "specialties", update.specialty_ids.as_deref())?;
                reject(taxonomy, "indicators", update.indicator_ids.as_deref())?;
            }
            RootRecord::Intervention(intervention) => {
                reject(taxonomy, "indicators", update.indicator_ids.as_deref())?;
                let activities = update.activity_ids.as_deref();
                replace::<Activity>(tx, &mut intervention.activity_ids, activities)?;
                let specialties = update.specialty_ids.as_deref();
                replace::<Specialty>(tx, &mut intervention.specialty_ids, specialties)?;
            }
            RootRecord::Outcome(outcome) => {
                reject(taxonomy, "activities", update.activity_ids.as_deref())?;
                let indicators = update.indicator_ids.as_deref();
                replace::<Indicator>(tx, &mut outcome.indicator_ids, indicators)?;
                let specialties = update.specialty_ids.as_deref();
                replace::<Specialty>(tx, &mut outcome.specialty_ids, specialties)?;
            }
        }

        tx.save(record.clone())?;
        tracing::info!("Updated references");
        Ok(record)
    })
}

fn reject(
    taxonomy: Taxonomy,
    references: &'static str,
    ids: Option<&[Uuid]>,
) -> Result<(), ImportError> {
    if ids.is_some() {
        return Err(ImportError::InapplicableReferences {
            taxonomy,
            references,
        });
    }
    Ok(())
}

fn replace<E: Entity>(
    tx: &Transaction<'_>,
    target: &mut Vec<Uuid>,
    ids: Option<&[Uuid]>,
) -> Result<(), ImportError> {
    if let Some(ids) = ids {
        let rows: Vec<E> = tx.resolve_ids(ids)?;
        *target = rows.iter().map(Entity::id).collect();
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{domain::Config, ingest::import_from_raw_text, storage::MemoryStore};

    const PAIN_MANAGEMENT: &str = "\
1400 Pain management
Activities:
- Assess pain
- Teach relaxation
Specialties:
- Oncology
";

    const ENDURANCE: &str = "\
0001 Endurance
Indicators:
000101 - Performance of routine activities
000103 - Muscle endurance
";

    fn code(taxonomy: Taxonomy, text: &str) -> Code {
        Code::new(taxonomy, text).unwrap()
    }

    fn seeded() -> MemoryStore {
        let store = MemoryStore::new();
        let config = Config::default();
        import_from_raw_text(&store, &config, Taxonomy::Intervention, PAIN_MANAGEMENT).unwrap();
        import_from_raw_text(&store, &config, Taxonomy::Outcome, ENDURANCE).unwrap();
        store
    }

    #[test]
    fn replaces_activities_in_order() {
        let store = seeded();
        let snapshot = store.snapshot();
        let mut activities: Vec<Uuid> = Activity::table(&snapshot).iter().map(Entity::id).collect();
        activities.reverse();

        let update = ReferenceUpdate {
            activity_ids: Some(activities.clone()),
            ..ReferenceUpdate::default()
        };
        let record = update_references(
            &store,
            Taxonomy::Intervention,
            &code(Taxonomy::Intervention, "1400"),
            &update,
        )
        .unwrap();

        let RootRecord::Intervention(intervention) = record else {
            panic!("expected an intervention");
        };
        assert_eq!(intervention.activity_ids, activities);
        assert_eq!(intervention.specialty_ids.len(), 1);
    }

    #[test]
    fn unknown_id_is_a_validation_error_and_writes_nothing() {
        let store = seeded();
        let before = store.snapshot();
        let known = Indicator::table(&before).iter().map(Entity::id).next().unwrap();

        let update = ReferenceUpdate {
            indicator_ids: Some(vec![known, Uuid::new_v4()]),
            ..ReferenceUpdate::default()
        };
        let error = update_references(
            &store,
            Taxonomy::Outcome,
            &code(Taxonomy::Outcome, "0001"),
            &update,
        )
        .unwrap_err();

        assert!(matches!(error, ImportError::Validation(_)), "{error:?}");
        assert_eq!(error.http_status(), 400);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn list_the_taxonomy_lacks_is_rejected() {
        let store = seeded();

        let update = ReferenceUpdate {
            indicator_ids: Some(Vec::new()),
            ..ReferenceUpdate::default()
        };
        let error = update_references(
            &store,
            Taxonomy::Intervention,
            &code(Taxonomy::Intervention, "1400"),
            &update,
        )
        .unwrap_err();

        assert!(matches!(
            error,
            ImportError::InapplicableReferences {
                references: "indicators",
                ..
            }
        ));
        assert_eq!(error.http_status(), 400);
    }

    #[test]
    fn missing_record_is_not_found() {
        let store = seeded();

        let error = update_references(
            &store,
            Taxonomy::Outcome,
            &code(Taxonomy::Outcome, "0008"),
            &ReferenceUpdate::default(),
        )
        .unwrap_err();

        assert!(matches!(error, ImportError::NotFound { .. }));
        assert_eq!(error.http_status(), 404);
    }
}
