use std::path::PathBuf;

use clap::Parser;
use nursecat::{
    Catalog, RootRecord, Store, Taxonomy,
    domain::{Activity, Class, Domain, Field, Indicator, Level, Need, Pattern, Scale, Specialty},
    storage::Entity,
};
use serde::Serialize;
use tracing::instrument;
use uuid::Uuid;

use super::{RecordArg, terminal::Colorize};

#[derive(Debug, Parser)]
#[command(about = "Display detailed information about a record")]
pub struct Show {
    #[command(flatten)]
    record: RecordArg,

    /// Output format
    #[arg(long, value_name = "FORMAT", default_value = "pretty")]
    output: OutputFormat,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum OutputFormat {
    #[default]
    Pretty,
    Json,
}

/// A root record with every reference resolved to its name.
#[derive(Debug, Serialize)]
struct View<'a> {
    taxonomy: Taxonomy,
    code: &'a str,
    name: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    edition: Option<&'a str>,
    #[serde(skip_serializing_if = "is_blank")]
    definition: &'a str,
    domain: Option<&'a Domain>,
    class: Option<&'a Class>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pattern: Option<&'a Pattern>,
    #[serde(skip_serializing_if = "Option::is_none")]
    need: Option<&'a Need>,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'a Field>,
    #[serde(skip_serializing_if = "is_empty")]
    characteristics: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    factors: &'a [String],
    #[serde(skip_serializing_if = "is_empty")]
    observations: &'a [String],
    #[serde(skip_serializing_if = "Vec::is_empty")]
    activities: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    specialties: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    indicators: Vec<&'a Indicator>,
    #[serde(skip_serializing_if = "Option::is_none")]
    scale: Option<&'a Scale>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    links: Vec<LinkView<'a>>,
}

#[derive(Debug, Serialize)]
struct LinkView<'a> {
    taxonomy: Taxonomy,
    code: &'a str,
    name: &'a str,
}

fn is_blank(s: &&str) -> bool {
    s.is_empty()
}

fn is_empty(items: &&[String]) -> bool {
    items.is_empty()
}

fn lookup<'a, E: Entity>(catalog: &'a Catalog, ids: &[Uuid]) -> Vec<&'a E> {
    ids.iter().filter_map(|&id| catalog.get::<E>(id)).collect()
}

impl<'a> View<'a> {
    fn new(catalog: &'a Catalog, record: &'a RootRecord) -> Self {
        let core = record.core();
        let class = catalog.get::<Class>(core.class_id);

        let mut view = Self {
            taxonomy: record.taxonomy(),
            code: core.code.as_str(),
            name: &core.name,
            edition: core.edition.as_deref(),
            definition: &core.definition,
            domain: class.and_then(|c| catalog.get::<Domain>(c.domain_id)),
            class,
            pattern: None,
            need: None,
            field: None,
            characteristics: &[],
            factors: &[],
            observations: &[],
            activities: Vec::new(),
            specialties: Vec::new(),
            indicators: Vec::new(),
            scale: None,
            links: core
                .links
                .iter()
                .filter_map(|(_, id)| catalog.record_by_id(id))
                .map(|linked| LinkView {
                    taxonomy: linked.taxonomy(),
                    code: linked.code().as_str(),
                    name: linked.name(),
                })
                .collect(),
        };

        match record {
            RootRecord::Diagnosis(d) => {
                view.pattern = d.pattern_id.and_then(|id| catalog.get(id));
                view.need = d.need_id.and_then(|id| catalog.get(id));
                view.characteristics = &d.characteristics;
                view.factors = &d.factors;
                view.observations = &d.observations;
            }
            RootRecord::Intervention(i) => {
                view.field = catalog.get(i.field_id);
                view.activities = lookup::<Activity>(catalog, &i.activity_ids)
                    .into_iter()
                    .map(|a| a.name.as_str())
                    .collect();
                view.specialties = lookup::<Specialty>(catalog, &i.specialty_ids)
                    .into_iter()
                    .map(|s| s.name.as_str())
                    .collect();
            }
            RootRecord::Outcome(o) => {
                view.pattern = o.pattern_id.and_then(|id| catalog.get(id));
                view.indicators = lookup(catalog, &o.indicator_ids);
                view.specialties = lookup::<Specialty>(catalog, &o.specialty_ids)
                    .into_iter()
                    .map(|s| s.name.as_str())
                    .collect();
                view.scale = o.scale_id.and_then(|id| catalog.get(id));
            }
        }

        view
    }

    fn print(&self) {
        println!("# {} {}", self.code.info(), self.name);
        if let Some(edition) = self.edition {
            println!("{}", format!("Edition {edition}").dim());
        }
        println!();

        if let Some(domain) = self.domain {
            println!("  {:<9}{} {}", "Domain:", domain.number, domain.name);
        }
        if let Some(class) = self.class {
            println!("  {:<9}{} {}", "Class:", class.code, class.name);
        }
        if let Some(pattern) = self.pattern {
            println!("  {:<9}{} {}", "Pattern:", pattern.number, pattern.name);
        }
        if let Some(need) = self.need {
            println!("  {:<9}{}", "Need:", categorized(&need.category, &need.name));
        }
        if let Some(field) = self.field {
            println!("  {:<9}{}", "Field:", categorized(&field.category, &field.name));
        }

        if !self.definition.is_empty() {
            println!("\n{}", "Definition".dim());
            println!("  {}", self.definition);
        }

        print_list("Defining characteristics", self.characteristics.iter());
        print_list("Factors", self.factors.iter());
        print_list("Observations", self.observations.iter());
        print_list("Activities", self.activities.iter());
        print_list(
            "Indicators",
            self.indicators.iter().map(|i| format!("{} {}", i.code, i.name)),
        );
        print_list("Specialties", self.specialties.iter());

        if let Some(scale) = self.scale {
            let title = if scale.description.is_empty() {
                format!("Scale {}", scale.code)
            } else {
                format!("Scale {} ({})", scale.code, scale.description)
            };
            print_list(
                &title,
                scale.levels.iter().map(|Level { score, text }| format!("{score} - {text}")),
            );
        }

        print_list(
            "Links",
            self.links
                .iter()
                .map(|l| format!("{} {} {}", l.taxonomy, l.code, l.name)),
        );
    }
}

fn categorized(category: &str, name: &str) -> String {
    if category.is_empty() {
        name.to_owned()
    } else {
        format!("{name} ({category})")
    }
}

fn print_list<T: std::fmt::Display>(title: &str, items: impl ExactSizeIterator<Item = T>) {
    if items.len() == 0 {
        return;
    }
    println!("\n{}", title.dim());
    for item in items {
        println!("  - {item}");
    }
}

impl Show {
    #[instrument(level = "debug", skip(self))]
    pub fn run(self, root: PathBuf) -> anyhow::Result<()> {
        let store = super::open(root)?;
        let record = self.record.to_ref()?;
        let catalog = store.snapshot();

        let Some(found) = catalog.record(record.taxonomy, &record.code) else {
            anyhow::bail!("{record} not found");
        };

        let view = View::new(&catalog, found);
        match self.output {
            OutputFormat::Pretty => view.print(),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&view)?),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use nursecat::{Code, Config, MemoryStore, import_from_raw_text};

    use super::*;

    #[test]
    fn view_resolves_references() {
        let store = MemoryStore::new();
        import_from_raw_text(
            &store,
            &Config::default(),
            Taxonomy::Outcome,
            "2102 Pain level\nDomain: 5 Perceived health\nClass: V Symptom status\n\
             Indicators:\n210201 - Reported pain\nScale 1 - Severe\n2 - Moderate\n\
             Specialties: Oncology",
        )
        .unwrap();
        let catalog = store.snapshot();
        let code = Code::new(Taxonomy::Outcome, "2102").unwrap();
        let record = catalog.record(Taxonomy::Outcome, &code).unwrap();

        let view = View::new(&catalog, record);

        assert_eq!(view.domain.map(|d| d.name.as_str()), Some("Perceived health"));
        assert_eq!(view.class.map(|c| c.code.as_str()), Some("V"));
        assert_eq!(view.indicators[0].name, "Reported pain");
        assert_eq!(view.specialties, ["Oncology"]);
        assert_eq!(view.scale.map(|s| s.levels.len()), Some(2));

        let json: serde_json::Value = serde_json::to_value(&view).unwrap();
        assert_eq!(json["code"], "2102");
        assert_eq!(json["taxonomy"], "outcome");
        assert!(json.get("characteristics").is_none());
        assert!(json.get("field").is_none());
    }

    #[test]
    fn view_shows_need_and_field() {
        let store = MemoryStore::new();
        let config = Config::default();
        import_from_raw_text(
            &store,
            &config,
            Taxonomy::Diagnosis,
            "00132 Acute pain\nNeed: Avoid pain (Safety)",
        )
        .unwrap();
        import_from_raw_text(&store, &config, Taxonomy::Intervention, "1400 Pain management")
            .unwrap();
        let catalog = store.snapshot();

        let diagnosis = catalog
            .record(Taxonomy::Diagnosis, &Code::new(Taxonomy::Diagnosis, "00132").unwrap())
            .unwrap();
        let view = View::new(&catalog, diagnosis);
        assert_eq!(view.need.map(|n| n.category.as_str()), Some("Safety"));
        assert!(view.field.is_none());

        let intervention = catalog
            .record(Taxonomy::Intervention, &Code::new(Taxonomy::Intervention, "1400").unwrap())
            .unwrap();
        let view = View::new(&catalog, intervention);
        assert_eq!(view.field.map(|f| f.name.as_str()), Some(Field::SENTINEL));
        assert_eq!(categorized("", "no field"), "no field");
        assert_eq!(categorized("Safety", "Avoid pain"), "Avoid pain (Safety)");
    }
}
