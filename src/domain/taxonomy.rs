use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// One of the three interlinked nursing classifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Taxonomy {
    /// NANDA-I nursing diagnoses.
    Diagnosis,
    /// NIC nursing interventions.
    Intervention,
    /// NOC nursing outcomes.
    Outcome,
}

impl Taxonomy {
    /// All taxonomies, in catalog order.
    pub const ALL: [Self; 3] = [Self::Diagnosis, Self::Intervention, Self::Outcome];

    /// The number of digits in a code of this taxonomy.
    ///
    /// Diagnoses use five digits (`00132`), interventions and outcomes four
    /// (`1400`, `2102`).
    #[must_use]
    pub const fn code_digits(self) -> usize {
        match self {
            Self::Diagnosis => 5,
            Self::Intervention | Self::Outcome => 4,
        }
    }

    /// The conventional name of the published classification.
    #[must_use]
    pub const fn classification(self) -> &'static str {
        match self {
            Self::Diagnosis => "NANDA-I",
            Self::Intervention => "NIC",
            Self::Outcome => "NOC",
        }
    }

    /// Lowercase singular name, as used on the command line.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Diagnosis => "diagnosis",
            Self::Intervention => "intervention",
            Self::Outcome => "outcome",
        }
    }
}

impl fmt::Display for Taxonomy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known taxonomy.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown taxonomy '{0}': expected diagnosis, intervention or outcome")]
pub struct UnknownTaxonomyError(String);

impl FromStr for Taxonomy {
    type Err = UnknownTaxonomyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "diagnosis" | "diagnoses" | "nanda" | "nanda-i" => Ok(Self::Diagnosis),
            "intervention" | "interventions" | "nic" => Ok(Self::Intervention),
            "outcome" | "outcomes" | "noc" => Ok(Self::Outcome),
            _ => Err(UnknownTaxonomyError(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("diagnosis", Taxonomy::Diagnosis; "singular")]
    #[test_case("NANDA", Taxonomy::Diagnosis; "classification name")]
    #[test_case("nic", Taxonomy::Intervention; "nic")]
    #[test_case(" Outcomes ", Taxonomy::Outcome; "plural with whitespace")]
    fn parses_aliases(input: &str, expected: Taxonomy) {
        assert_eq!(input.parse::<Taxonomy>().unwrap(), expected);
    }

    #[test]
    fn rejects_unknown() {
        assert!("activity".parse::<Taxonomy>().is_err());
    }

    #[test]
    fn display_round_trips() {
        for taxonomy in Taxonomy::ALL {
            assert_eq!(taxonomy.to_string().parse::<Taxonomy>().unwrap(), taxonomy);
        }
    }
}
