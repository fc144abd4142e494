use std::path::{Path, PathBuf};

use nonempty::NonEmpty;
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::instrument;

use super::{
    BatchImportError, ImportError, Normalizer, extract,
    resolve::{
        resolve_activities, resolve_class, resolve_domain, resolve_field, resolve_indicators,
        resolve_need, resolve_pattern, resolve_scale, resolve_specialties,
    },
    sheet::Sheet,
};
use crate::{
    domain::{
        Config, Diagnosis, Intervention, Outcome, RecordCore, RootRecord, Taxonomy,
    },
    storage::{Store, StoreError, Transaction},
};

/// Imports fact sheets into a store.
#[derive(Debug)]
pub struct Importer<'s, S> {
    store: &'s S,
    normalizer: Normalizer,
    default_edition: Option<String>,
}

impl<'s, S: Store> Importer<'s, S> {
    /// Creates an importer writing to `store`.
    #[must_use]
    pub fn new(store: &'s S, config: &Config) -> Self {
        Self {
            store,
            normalizer: Normalizer::new(config.extra_noise()),
            default_edition: config.default_edition.clone(),
        }
    }

    /// Imports one fact sheet as a single unit of work.
    ///
    /// # Errors
    ///
    /// Returns an [`ImportError`] if the sheet is malformed, if a record with
    /// the same code or name exists, or if the store fails. On error nothing
    /// is written.
    #[instrument(level = "debug", skip(self, raw_text))]
    pub fn import(&self, taxonomy: Taxonomy, raw_text: &str) -> Result<RootRecord, ImportError> {
        let text = self.normalizer.normalize(raw_text);
        let mut sheet = extract(taxonomy, &text)?;
        if sheet.edition.is_none() {
            sheet.edition.clone_from(&self.default_edition);
        }

        let record = self.store.with_transaction(|tx| write(tx, &sheet))?;

        tracing::info!(
            taxonomy = %taxonomy,
            code = %record.code(),
            name = record.name(),
            "Imported record"
        );
        Ok(record)
    }

    /// Imports the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ImportError::Read`] if the file cannot be read, and otherwise
    /// behaves like [`Importer::import`].
    pub fn import_file(&self, taxonomy: Taxonomy, path: &Path) -> Result<RootRecord, ImportError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ImportError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        self.import(taxonomy, &raw)
    }

    /// Imports many files concurrently, one unit of work per file.
    ///
    /// A failing file does not stop the others. `on_done` is called once per
    /// file, whatever the outcome.
    ///
    /// # Errors
    ///
    /// Returns a [`BatchImportError`] listing every failed file.
    pub fn import_files(
        &self,
        taxonomy: Taxonomy,
        paths: &[PathBuf],
        on_done: impl Fn(&Path) + Sync,
    ) -> Result<Vec<RootRecord>, BatchImportError> {
        let (imported, failed): (Vec<_>, Vec<_>) = paths
            .par_iter()
            .map(|path| {
                let result = self
                    .import_file(taxonomy, path)
                    .map_err(|e| (path.clone(), e));
                on_done(path);
                result
            })
            .partition(Result::is_ok);

        let imported: Vec<_> = imported.into_iter().filter_map(Result::ok).collect();
        let failures: Vec<_> = failed.into_iter().filter_map(Result::err).collect();

        match NonEmpty::from_vec(failures) {
            None => Ok(imported),
            Some(failures) => Err(BatchImportError {
                imported: imported.len(),
                failures,
            }),
        }
    }
}

/// Imports one fact sheet into `store`.
///
/// # Errors
///
/// See [`Importer::import`].
pub fn import_from_raw_text<S: Store>(
    store: &S,
    config: &Config,
    taxonomy: Taxonomy,
    raw_text: &str,
) -> Result<RootRecord, ImportError> {
    Importer::new(store, config).import(taxonomy, raw_text)
}

/// Writes the record described by `sheet`, resolving every reference.
///
/// # Errors
///
/// Returns [`ImportError::Conflict`] if a record with the same code exists
/// (before anything is written), or if saving the record breaks the
/// uniqueness of names. Resolver errors are passed through.
pub fn write(tx: &mut Transaction<'_>, sheet: &Sheet) -> Result<RootRecord, ImportError> {
    let taxonomy = sheet.taxonomy;

    if tx
        .find_one_by_key::<RootRecord>(&(taxonomy, sheet.code.clone()))
        .is_some()
    {
        return Err(ImportError::Conflict {
            taxonomy,
            key: sheet.code.to_string(),
        });
    }

    let domain = resolve_domain(tx, taxonomy, sheet.domain.as_ref())?;
    let class = resolve_class(tx, taxonomy, sheet.class.as_ref(), &domain)?;

    let mut core = RecordCore::new(sheet.code.clone(), sheet.name.clone(), class.id);
    core.edition.clone_from(&sheet.edition);
    core.definition.clone_from(&sheet.definition);

    log_unused_sections(sheet);

    let record: RootRecord = match taxonomy {
        Taxonomy::Diagnosis => {
            Diagnosis {
                core,
                pattern_id: resolve_pattern(tx, taxonomy, sheet.pattern.as_ref())?.map(|p| p.id),
                need_id: resolve_need(tx, sheet.need.as_ref())?.map(|n| n.id),
                characteristics: sheet.characteristics.clone(),
                factors: sheet.factors.clone(),
                observations: sheet.observations.clone(),
            }
            .into()
        }
        Taxonomy::Intervention => {
            Intervention {
                core,
                field_id: resolve_field(tx, sheet.field.as_ref())?.id,
                activity_ids: resolve_activities(tx, &sheet.activities)?,
                specialty_ids: resolve_specialties(tx, &sheet.specialties)?,
            }
            .into()
        }
        Taxonomy::Outcome => {
            Outcome {
                core,
                pattern_id: resolve_pattern(tx, taxonomy, sheet.pattern.as_ref())?.map(|p| p.id),
                indicator_ids: resolve_indicators(tx, &sheet.indicators)?,
                specialty_ids: resolve_specialties(tx, &sheet.specialties)?,
                scale_id: sheet
                    .scale
                    .as_ref()
                    .map(|scale| resolve_scale(tx, scale))
                    .transpose()?
                    .map(|s| s.id),
            }
            .into()
        }
    };

    tx.save(record.clone()).map_err(|e| match e {
        StoreError::UniqueViolation { .. } => ImportError::Conflict {
            taxonomy,
            key: sheet.name.clone(),
        },
        other => ImportError::Store(other),
    })?;

    Ok(record)
}

/// Logs sections present on a sheet that its taxonomy has no field for.
fn log_unused_sections(sheet: &Sheet) {
    let unused = match sheet.taxonomy {
        Taxonomy::Diagnosis => vec![
            ("activities", sheet.activities.len()),
            ("indicators", sheet.indicators.len()),
            ("specialties", sheet.specialties.len()),
            ("field", usize::from(sheet.field.is_some())),
        ],
        Taxonomy::Intervention => vec![
            ("defining characteristics", sheet.characteristics.len()),
            ("indicators", sheet.indicators.len()),
            ("pattern", usize::from(sheet.pattern.is_some())),
            ("need", usize::from(sheet.need.is_some())),
        ],
        Taxonomy::Outcome => vec![
            ("defining characteristics", sheet.characteristics.len()),
            ("activities", sheet.activities.len()),
            ("factors", sheet.factors.len()),
            ("need", usize::from(sheet.need.is_some())),
            ("field", usize::from(sheet.field.is_some())),
        ],
    };

    for (section, count) in unused {
        if count > 0 {
            tracing::debug!(taxonomy = %sheet.taxonomy, section, "Ignoring section");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{fs, thread};

    use tempfile::TempDir;

    use super::*;
    use crate::{
        DirectoryStore, MemoryStore, RecordRef,
        domain::{Class, Domain, Field, Need, Scale},
        relations,
    };

    const ACTIVITY_INTOLERANCE: &str = "\
NANDA-I Nursing Diagnosis
00092 Activity intolerance
Domain 4 Activity/Rest
Class: 4 Cardiovascular/pulmonary responses
Definition: Insufficient physiological or psychological energy
Defining characteristics:
- Exertional dyspnea
- Fatigue
Related factors:
- Imbalance between oxygen supply and demand
Page 1 of 1";

    const FATIGUE: &str = "\
00093 Fatigue
Domain 4 Activity/Rest
Class: 3 Energy balance
Definition: An overwhelming sustained sense of exhaustion";

    const PAIN_LEVEL: &str = "\
2102 Pain level
Domain: 5 Perceived health
Class: V Symptom status
Indicators:
210201 - Reported pain
210204 - Length of pain episodes
Scale 1 - Severe
2 - Substantial
3 - Moderate
Specialties: Oncology, Pediatrics";

    fn import(store: &MemoryStore, taxonomy: Taxonomy, text: &str) -> Result<RootRecord, ImportError> {
        import_from_raw_text(store, &Config::default(), taxonomy, text)
    }

    #[test]
    fn imports_a_diagnosis() {
        let store = MemoryStore::new();

        let record = import(&store, Taxonomy::Diagnosis, ACTIVITY_INTOLERANCE).unwrap();

        let RootRecord::Diagnosis(diagnosis) = &record else {
            panic!("expected a diagnosis, got {record:?}");
        };
        assert_eq!(diagnosis.core.code.as_str(), "00092");
        assert_eq!(diagnosis.core.name, "Activity intolerance");
        assert_eq!(diagnosis.characteristics, ["Exertional dyspnea", "Fatigue"]);
        assert_eq!(diagnosis.factors.len(), 1);
        assert_eq!(diagnosis.core.edition, None);

        let snapshot = store.snapshot();
        let class: &Class = snapshot.get(diagnosis.core.class_id).unwrap();
        assert_eq!(class.name, "Cardiovascular/pulmonary responses");
        let domain: &Domain = snapshot.get(class.domain_id).unwrap();
        assert_eq!((domain.number, domain.name.as_str()), (4, "Activity/Rest"));
        assert_eq!(
            snapshot.record(Taxonomy::Diagnosis, &diagnosis.core.code),
            Some(&record)
        );
    }

    #[test]
    fn need_and_field_are_resolved() {
        let store = MemoryStore::new();

        let RootRecord::Diagnosis(diagnosis) = import(
            &store,
            Taxonomy::Diagnosis,
            "00092 Activity intolerance\nNeed: Activity and rest (Physiological)",
        )
        .unwrap() else {
            panic!("expected a diagnosis");
        };
        let RootRecord::Intervention(plain) =
            import(&store, Taxonomy::Intervention, "1400 Pain management").unwrap()
        else {
            panic!("expected an intervention");
        };
        let RootRecord::Intervention(basic) = import(
            &store,
            Taxonomy::Intervention,
            "0180 Energy management\nField: Basic physiological",
        )
        .unwrap() else {
            panic!("expected an intervention");
        };

        let snapshot = store.snapshot();
        let need: &Need = snapshot.get(diagnosis.need_id.unwrap()).unwrap();
        assert_eq!((need.category.as_str(), need.name.as_str()), ("Physiological", "Activity and rest"));
        let sentinel: &Field = snapshot.get(plain.field_id).unwrap();
        assert_eq!(sentinel.name, Field::SENTINEL);
        let field: &Field = snapshot.get(basic.field_id).unwrap();
        assert_eq!(field.name, "Basic physiological");
    }

    #[test]
    fn shared_references_resolve_to_one_row() {
        let store = MemoryStore::new();

        import(&store, Taxonomy::Diagnosis, ACTIVITY_INTOLERANCE).unwrap();
        import(&store, Taxonomy::Diagnosis, FATIGUE).unwrap();

        let snapshot = store.snapshot();
        assert_eq!(snapshot.table::<Domain>().len(), 1);
        assert_eq!(snapshot.table::<Class>().len(), 2);
    }

    #[test]
    fn concurrent_imports_share_references() {
        let store = MemoryStore::new();
        let sheets: Vec<String> = (0..8)
            .map(|i| format!("0009{i} Sheet {i}\nDomain 4 Activity/Rest\nClass: 3 Energy balance"))
            .collect();

        thread::scope(|scope| {
            for sheet in &sheets {
                let store = &store;
                scope.spawn(move || import(store, Taxonomy::Diagnosis, sheet).unwrap());
            }
        });

        let snapshot = store.snapshot();
        assert_eq!(snapshot.records(Taxonomy::Diagnosis).count(), 8);
        assert_eq!(snapshot.table::<Domain>().len(), 1);
        assert_eq!(snapshot.table::<Class>().len(), 1);
    }

    #[test]
    fn imports_an_outcome_with_scale_and_indicators() {
        let store = MemoryStore::new();

        let RootRecord::Outcome(outcome) = import(&store, Taxonomy::Outcome, PAIN_LEVEL).unwrap() else {
            panic!("expected an outcome");
        };

        assert_eq!(outcome.indicator_ids.len(), 2);
        assert_eq!(outcome.specialty_ids.len(), 2);
        let snapshot = store.snapshot();
        let scale: &Scale = snapshot.get(outcome.scale_id.unwrap()).unwrap();
        assert_eq!(scale.levels.len(), 3);
        assert!(scale.code.starts_with("S-"));
    }

    #[test]
    fn duplicate_code_is_a_conflict_with_no_writes() {
        let store = MemoryStore::new();
        import(&store, Taxonomy::Diagnosis, FATIGUE).unwrap();
        let before = store.snapshot();

        let error = import(
            &store,
            Taxonomy::Diagnosis,
            "00093 Tiredness\nDomain: 9 Other domain\nClass: 1 Other class",
        )
        .unwrap_err();

        assert!(matches!(
            error,
            ImportError::Conflict { taxonomy: Taxonomy::Diagnosis, ref key } if key == "00093"
        ));
        assert_eq!(error.http_status(), 409);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn failed_save_rolls_back_references() {
        let store = MemoryStore::new();
        import(&store, Taxonomy::Diagnosis, "00133 Activity intolerance").unwrap();

        // same name under a different code
        let error = import(&store, Taxonomy::Diagnosis, ACTIVITY_INTOLERANCE).unwrap_err();
        assert!(matches!(error, ImportError::Conflict { .. }));

        let snapshot = store.snapshot();
        assert_eq!(snapshot.records(Taxonomy::Diagnosis).count(), 1);
        assert!(
            snapshot
                .table::<Domain>()
                .iter()
                .all(|d| d.name == Domain::SENTINEL)
        );
        assert!(
            snapshot
                .table::<Class>()
                .iter()
                .all(|c| c.name == Class::SENTINEL)
        );

        relations::remove(&store, &RecordRef::new(Taxonomy::Diagnosis, "00133").unwrap()).unwrap();
        import(&store, Taxonomy::Diagnosis, ACTIVITY_INTOLERANCE).unwrap();
        assert_eq!(store.snapshot().table::<Domain>().len(), 2);
    }

    #[test]
    fn indicator_clash_is_a_storage_consistency_error() {
        let store = MemoryStore::new();
        import(&store, Taxonomy::Outcome, PAIN_LEVEL).unwrap();
        let before = store.snapshot();

        let error = import(
            &store,
            Taxonomy::Outcome,
            "2103 Pain control\nIndicators:\n210299 - Reported pain",
        )
        .unwrap_err();

        assert!(matches!(error, ImportError::StorageConsistency { table: "indicators", .. }));
        assert_eq!(error.http_status(), 500);
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn malformed_input_writes_nothing() {
        let store = MemoryStore::new();

        let error = import(&store, Taxonomy::Intervention, "Pain management\nno code here").unwrap_err();

        assert!(matches!(error, ImportError::MalformedInput(_)));
        assert_eq!(error.http_status(), 400);
        assert_eq!(store.snapshot(), crate::Catalog::default());
    }

    #[test]
    fn default_edition_applies_only_when_missing() {
        let store = MemoryStore::new();
        let mut config = Config::default();
        config.default_edition = Some("2021-2023".to_string());

        let plain = import_from_raw_text(&store, &config, Taxonomy::Intervention, "1400 Pain management").unwrap();
        let stated = import_from_raw_text(
            &store,
            &config,
            Taxonomy::Intervention,
            "0180 Energy management\nEdition: 7th",
        )
        .unwrap();

        assert_eq!(plain.core().edition.as_deref(), Some("2021-2023"));
        assert_eq!(stated.core().edition.as_deref(), Some("7th"));
    }

    #[test]
    fn batch_import_collects_failures() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().to_path_buf();
        let good = root.join("1400.txt");
        let bad = root.join("broken.txt");
        let missing = root.join("missing.txt");
        fs::write(&good, "1400 Pain management\nActivities:\n- Assess pain").unwrap();
        fs::write(&bad, "no code at all").unwrap();

        let store = DirectoryStore::open(root.clone()).unwrap();
        let importer = Importer::new(&store, store.config());
        let done = std::sync::atomic::AtomicUsize::new(0);

        let error = importer
            .import_files(
                Taxonomy::Intervention,
                &[good, bad.clone(), missing.clone()],
                |_| {
                    done.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
                },
            )
            .unwrap_err();

        assert_eq!(done.into_inner(), 3);
        assert_eq!(error.imported, 1);
        let mut failed: Vec<_> = error.failures.iter().map(|(p, _)| p.clone()).collect();
        failed.sort();
        assert_eq!(failed, [bad, missing]);

        let reopened = DirectoryStore::open(root).unwrap();
        assert_eq!(reopened.snapshot().records(Taxonomy::Intervention).count(), 1);
    }
}
