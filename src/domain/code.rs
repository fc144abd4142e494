use std::{fmt, ops::Deref};

use serde::{Deserialize, Serialize};

use super::Taxonomy;

/// The natural key of a root record: a fixed-width string of ASCII digits.
///
/// The width depends on the taxonomy, see [`Taxonomy::code_digits`]. Leading
/// zeros are significant (`00132` is not `132`).
///
/// # Examples
///
/// ```
/// use nursecat::{Code, Taxonomy};
///
/// let code = Code::new(Taxonomy::Diagnosis, "00132").unwrap();
/// assert_eq!(code.as_str(), "00132");
///
/// assert!(Code::new(Taxonomy::Diagnosis, "0132").is_err());
/// assert!(Code::new(Taxonomy::Intervention, "14a0").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Code(String);

impl Code {
    /// Validates `value` as a code of the given taxonomy.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidCodeError`] if the value is not exactly
    /// `taxonomy.code_digits()` ASCII digits.
    pub fn new(taxonomy: Taxonomy, value: &str) -> Result<Self, InvalidCodeError> {
        let value = value.trim();
        let digits = taxonomy.code_digits();

        if value.len() != digits || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(InvalidCodeError {
                taxonomy,
                value: value.to_string(),
            });
        }

        Ok(Self(value.to_string()))
    }

    /// Returns the string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Deref for Code {
    type Target = str;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Error returned when a string is not a valid code for a taxonomy.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error(
    "invalid {taxonomy} code '{value}': expected exactly {} digits",
    taxonomy.code_digits()
)]
pub struct InvalidCodeError {
    taxonomy: Taxonomy,
    value: String,
}
