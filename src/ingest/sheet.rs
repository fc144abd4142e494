use crate::domain::{Code, Level, Taxonomy};

/// A numbered reference such as a domain (`5 Activity/Rest`) or a pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Numbered {
    /// Ordinal number, `0` when the sheet gave none.
    pub number: u32,
    /// Display name.
    pub name: String,
}

/// A class reference such as `4 Cardiovascular/Pulmonary Responses` or
/// `A Activity and Exercise Management`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassLine {
    /// Digits or one or two capital letters. May be empty.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// A named reference with an optional category in parentheses, such as
/// `Oxygenation (Physiological)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Categorized {
    /// Category, empty when the sheet gave none.
    pub category: String,
    /// Display name.
    pub name: String,
}

/// An indicator line such as `210201 - Reported pain`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorLine {
    /// Numeric code.
    pub code: String,
    /// Display name.
    pub name: String,
}

/// The measurement scale block of an outcome sheet.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ScaleBlock {
    /// Published scale code, if the sheet gave one.
    pub code: Option<String>,
    /// Free-text description. May be empty.
    pub description: String,
    /// Levels, in sheet order.
    pub levels: Vec<Level>,
}

/// Everything recovered from one fact sheet, before any reference is
/// resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sheet {
    /// The taxonomy the sheet was imported as.
    pub taxonomy: Taxonomy,
    /// Published code.
    pub code: Code,
    /// Display name.
    pub name: String,
    /// Edition, if stated.
    pub edition: Option<String>,
    /// Definition, possibly empty.
    pub definition: String,
    /// Domain, if stated.
    pub domain: Option<Numbered>,
    /// Class, if stated.
    pub class: Option<ClassLine>,
    /// Pattern, if stated.
    pub pattern: Option<Numbered>,
    /// Need, if stated.
    pub need: Option<Categorized>,
    /// Field of practice, if stated.
    pub field: Option<Categorized>,
    /// Defining characteristics.
    pub characteristics: Vec<String>,
    /// Related and risk factors.
    pub factors: Vec<String>,
    /// Observations, associated conditions and at-risk populations.
    pub observations: Vec<String>,
    /// Intervention activities.
    pub activities: Vec<String>,
    /// Specialties.
    pub specialties: Vec<String>,
    /// Outcome indicators.
    pub indicators: Vec<IndicatorLine>,
    /// Measurement scale.
    pub scale: Option<ScaleBlock>,
}

impl Sheet {
    /// Creates a sheet with only the identifying fields set.
    #[must_use]
    pub const fn new(taxonomy: Taxonomy, code: Code, name: String) -> Self {
        Self {
            taxonomy,
            code,
            name,
            edition: None,
            definition: String::new(),
            domain: None,
            class: None,
            pattern: None,
            need: None,
            field: None,
            characteristics: Vec::new(),
            factors: Vec::new(),
            observations: Vec::new(),
            activities: Vec::new(),
            specialties: Vec::new(),
            indicators: Vec::new(),
            scale: None,
        }
    }
}
