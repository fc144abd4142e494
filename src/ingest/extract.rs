//! Recovery of structured fields from normalized fact-sheet text.
//!
//! The grammar is line oriented. A line is either a section header (a known
//! label, optionally followed by inline content), or belongs to the preceding
//! section. Lines before the first header form the preamble.

use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

use super::sheet::{Categorized, ClassLine, IndicatorLine, Numbered, ScaleBlock, Sheet};
use crate::domain::{Code, Level, Taxonomy, reference::collapse_whitespace};

/// Errors raised when a fact sheet cannot be understood.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum ExtractError {
    /// The text was empty after normalization.
    #[error("the fact sheet is empty")]
    Empty,

    /// None of the code/name strategies matched.
    #[error("no {digits}-digit {taxonomy} code followed by a name was found")]
    MissingCodeOrName {
        /// The taxonomy the sheet was imported as.
        taxonomy: Taxonomy,
        /// The expected code width.
        digits: usize,
    },

    /// A scale section listed neither levels nor a code.
    #[error("the scale section has neither levels nor a code")]
    EmptyScale,
}

static HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i)(code|domain|class|pattern|need|field|definition|edition|defining\s+characteristics|related\s+factors|risk\s+factors|observations?|associated\s+conditions|at[-\s]risk\s+populations?|activities|specialties|specialities|indicators|measurement\s+scale|scale)\s*(?::\s*(.*))?$",
    )
    .expect("header regex is valid")
});

static NUMERIC_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(code|domain|class|pattern|edition|measurement\s+scale|scale)\s+(\d.*)$")
        .expect("numeric header regex is valid")
});

static LETTER_CLASS_HEADER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i:class)\s+([A-Z]{1,2}\s+\S.*)$").expect("letter class header regex is valid")
});

static CODE_AND_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\s*[-–—:.]\s*|\s+)(\S.*)$").expect("code and name regex is valid")
});

static NUMBERED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)(?:\s*[.:\-–]\s*|\s+)(\S.*)$").expect("numbered regex is valid")
});

static CLASS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+|[A-Z]{1,2})(?:\s*[.:\-–]\s*|\s+)(\S.*)$").expect("class regex is valid")
});

static BULLET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•·–]|\d+[.)])\s+").expect("bullet regex is valid")
});

static LEVEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d+)\s*[-–—]\s*(\S.*?)\s*$").expect("level regex is valid")
});

static CATEGORIZED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(.*?)\s*\(([^()]*)\)$").expect("categorized regex is valid")
});

static SCALE_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9-]{1,12}$").expect("scale code regex is valid"));

/// The sections a fact sheet may contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Code,
    Domain,
    Class,
    Pattern,
    Need,
    Field,
    Definition,
    Edition,
    Characteristics,
    Factors,
    Observations,
    Activities,
    Specialties,
    Indicators,
    Scale,
}

impl Section {
    fn from_label(label: &str) -> Option<Self> {
        let label = collapse_whitespace(label).to_lowercase().replace(' ', "-");
        let section = match label.as_str() {
            "code" => Self::Code,
            "domain" => Self::Domain,
            "class" => Self::Class,
            "pattern" => Self::Pattern,
            "need" => Self::Need,
            "field" => Self::Field,
            "definition" => Self::Definition,
            "edition" => Self::Edition,
            "defining-characteristics" => Self::Characteristics,
            "related-factors" | "risk-factors" => Self::Factors,
            "observation"
            | "observations"
            | "associated-conditions"
            | "at-risk-population"
            | "at-risk-populations" => Self::Observations,
            "activities" => Self::Activities,
            "specialties" | "specialities" => Self::Specialties,
            "indicators" => Self::Indicators,
            "scale" | "measurement-scale" => Self::Scale,
            _ => return None,
        };
        Some(section)
    }
}

/// Parses a header line into its section and inline content.
fn parse_header(line: &str) -> Option<(Section, Option<&str>)> {
    if let Some(captures) = HEADER.captures(line) {
        let section = Section::from_label(captures.get(1)?.as_str())?;
        let inline = captures
            .get(2)
            .map(|m| m.as_str().trim())
            .filter(|s| !s.is_empty());
        return Some((section, inline));
    }

    if let Some(captures) = NUMERIC_HEADER.captures(line) {
        let section = Section::from_label(captures.get(1)?.as_str())?;
        return Some((section, captures.get(2).map(|m| m.as_str().trim())));
    }

    let captures = LETTER_CLASS_HEADER.captures(line)?;
    Some((Section::Class, captures.get(1).map(|m| m.as_str().trim())))
}

fn is_header(line: &str) -> bool {
    parse_header(line).is_some()
}

#[derive(Debug)]
struct Block<'a> {
    section: Section,
    inline: Option<&'a str>,
    body: Vec<&'a str>,
}

impl<'a> Block<'a> {
    /// Inline content, or the first body line.
    fn value(&self) -> Option<&'a str> {
        self.inline.or_else(|| self.body.first().copied())
    }

    /// Inline content followed by every body line.
    fn lines(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.inline.into_iter().chain(self.body.iter().copied())
    }
}

/// The text split into preamble and section blocks.
#[derive(Debug)]
struct Layout<'a> {
    lines: Vec<&'a str>,
    preamble: Vec<&'a str>,
    blocks: Vec<Block<'a>>,
}

impl<'a> Layout<'a> {
    fn parse(text: &'a str) -> Self {
        let lines: Vec<&str> = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .collect();

        let mut preamble = Vec::new();
        let mut blocks: Vec<Block> = Vec::new();

        for &line in &lines {
            if let Some((section, inline)) = parse_header(line) {
                blocks.push(Block {
                    section,
                    inline,
                    body: Vec::new(),
                });
            } else if let Some(block) = blocks.last_mut() {
                block.body.push(line);
            } else {
                preamble.push(line);
            }
        }

        Self {
            lines,
            preamble,
            blocks,
        }
    }

    fn first(&self, section: Section) -> Option<&Block<'a>> {
        self.blocks.iter().find(|b| b.section == section)
    }

    fn all(&self, section: Section) -> impl Iterator<Item = &Block<'a>> {
        self.blocks.iter().filter(move |b| b.section == section)
    }

    /// List items of every block of `section`, bullets stripped.
    fn items(&self, section: Section) -> Vec<String> {
        self.all(section)
            .flat_map(Block::lines)
            .map(strip_bullet)
            .filter(|item| !item.is_empty())
            .collect()
    }
}

fn strip_bullet(line: &str) -> String {
    collapse_whitespace(&BULLET.replace(line.trim(), ""))
}

fn is_code(line: &str, digits: usize) -> bool {
    line.len() == digits && line.bytes().all(|b| b.is_ascii_digit())
}

fn is_numeric(line: &str) -> bool {
    line.bytes().all(|b| b.is_ascii_digit())
}

fn code_and_name(line: &str, digits: usize) -> Option<(&str, &str)> {
    let captures = CODE_AND_NAME.captures(line)?;
    let code = captures.get(1)?.as_str();
    let name = captures.get(2)?.as_str();
    is_code(code, digits).then_some((code, name))
}

/// Strategy (a): a line holding the code followed by the name.
///
/// Lines before the first section header are preferred. Otherwise any line
/// that is not itself a header qualifies.
fn code_and_name_line<'a>(layout: &Layout<'a>, digits: usize) -> Option<(&'a str, &'a str)> {
    layout
        .preamble
        .iter()
        .copied()
        .find_map(|line| code_and_name(line, digits))
        .or_else(|| {
            layout
                .lines
                .iter()
                .copied()
                .filter(|line| !is_header(line))
                .find_map(|line| code_and_name(line, digits))
        })
}

/// Strategy (b): the code alone on the first line, the name on the second.
fn code_then_name<'a>(layout: &Layout<'a>, digits: usize) -> Option<(&'a str, &'a str)> {
    let (&code, rest) = layout.lines.split_first()?;
    let &name = rest.first()?;
    (is_code(code, digits) && !is_header(name) && !is_numeric(name)).then_some((code, name))
}

/// Strategy (c): a `Code` section, with the name taken from the first line
/// that is neither a header nor a number.
fn code_section<'a>(layout: &Layout<'a>, digits: usize) -> Option<(&'a str, &'a str)> {
    let code = layout.first(Section::Code)?.value()?;
    if !is_code(code, digits) {
        return None;
    }
    let name = layout
        .lines
        .iter()
        .copied()
        .find(|line| !is_header(line) && !is_numeric(line))?;
    Some((code, name))
}

fn parse_numbered(value: &str) -> Numbered {
    NUMBERED
        .captures(value)
        .and_then(|c| {
            let number = c.get(1)?.as_str().parse().ok()?;
            let name = collapse_whitespace(c.get(2)?.as_str());
            Some(Numbered { number, name })
        })
        .unwrap_or_else(|| Numbered {
            number: 0,
            name: collapse_whitespace(value),
        })
}

fn parse_categorized(value: &str) -> Categorized {
    CATEGORIZED
        .captures(value)
        .and_then(|c| {
            Some(Categorized {
                category: collapse_whitespace(c.get(2)?.as_str()),
                name: collapse_whitespace(c.get(1)?.as_str()),
            })
        })
        .filter(|c| !c.name.is_empty())
        .unwrap_or_else(|| Categorized {
            category: String::new(),
            name: collapse_whitespace(value),
        })
}

fn parse_class(value: &str) -> ClassLine {
    CLASS
        .captures(value)
        .and_then(|c| {
            Some(ClassLine {
                code: c.get(1)?.as_str().to_string(),
                name: collapse_whitespace(c.get(2)?.as_str()),
            })
        })
        .unwrap_or_else(|| ClassLine {
            code: String::new(),
            name: collapse_whitespace(value),
        })
}

/// Parses an `<integer> - <label>` line.
fn parse_level_line(line: &str) -> Option<(&str, &str)> {
    let captures = LEVEL.captures(line)?;
    Some((captures.get(1)?.as_str(), captures.get(2)?.as_str()))
}

fn parse_level(line: &str) -> Option<Level> {
    let (score, text) = parse_level_line(line)?;
    Some(Level::new(score.parse().ok()?, text))
}

fn parse_scale(block: &Block) -> Result<ScaleBlock, ExtractError> {
    let mut scale = ScaleBlock::default();

    if let Some(inline) = block.inline {
        if let Some(level) = parse_level(inline) {
            scale.levels.push(level);
        } else if SCALE_CODE.is_match(inline) {
            scale.code = Some(inline.to_string());
        } else {
            scale.description = collapse_whitespace(inline);
        }
    }

    for line in &block.body {
        let line = strip_bullet(line);
        if let Some(level) = parse_level(&line) {
            if !scale.levels.contains(&level) {
                scale.levels.push(level);
            }
        } else if scale.description.is_empty() {
            scale.description = line;
        }
    }

    if scale.levels.is_empty() && scale.code.is_none() {
        return Err(ExtractError::EmptyScale);
    }

    Ok(scale)
}

/// Extracts a [`Sheet`] from normalized text.
///
/// The code and name are recovered by the first strategy that matches:
///
/// 1. a line holding the code and the name, such as `00132 Acute pain` or
///    `00132-Acute pain`, preferring lines before the first section header;
/// 2. the code alone on the first line, with the name on the second;
/// 3. a `Code` section, with the name on the first line that is neither a
///    section header nor a number.
///
/// # Errors
///
/// Returns an [`ExtractError`] if the text is empty, if no strategy yields a
/// code and a name, or if the scale section is empty.
#[instrument(level = "debug", skip(text))]
pub fn extract(taxonomy: Taxonomy, text: &str) -> Result<Sheet, ExtractError> {
    let layout = Layout::parse(text);
    if layout.lines.is_empty() {
        return Err(ExtractError::Empty);
    }

    let digits = taxonomy.code_digits();
    let missing = ExtractError::MissingCodeOrName { taxonomy, digits };

    let (code, name) = code_and_name_line(&layout, digits)
        .or_else(|| code_then_name(&layout, digits))
        .or_else(|| code_section(&layout, digits))
        .ok_or_else(|| missing.clone())?;

    let code = Code::new(taxonomy, code).map_err(|_| missing.clone())?;
    let name = collapse_whitespace(name);
    if name.is_empty() {
        return Err(missing);
    }

    let mut sheet = Sheet::new(taxonomy, code, name);

    sheet.edition = layout
        .first(Section::Edition)
        .and_then(Block::value)
        .map(collapse_whitespace);

    sheet.definition = collapse_whitespace(
        &layout
            .all(Section::Definition)
            .flat_map(Block::lines)
            .collect::<Vec<_>>()
            .join(" "),
    );

    sheet.domain = layout
        .first(Section::Domain)
        .and_then(Block::value)
        .map(parse_numbered);
    sheet.class = layout
        .first(Section::Class)
        .and_then(Block::value)
        .map(parse_class);
    sheet.pattern = layout
        .first(Section::Pattern)
        .and_then(Block::value)
        .map(parse_numbered);
    sheet.need = layout
        .first(Section::Need)
        .and_then(Block::value)
        .map(parse_categorized);
    sheet.field = layout
        .first(Section::Field)
        .and_then(Block::value)
        .map(parse_categorized);

    sheet.characteristics = layout.items(Section::Characteristics);
    sheet.factors = layout.items(Section::Factors);
    sheet.observations = layout.items(Section::Observations);
    sheet.activities = layout.items(Section::Activities);

    sheet.specialties = layout
        .items(Section::Specialties)
        .iter()
        .flat_map(|item| item.split([',', ';']))
        .map(collapse_whitespace)
        .filter(|s| !s.is_empty())
        .collect();

    sheet.indicators = layout
        .items(Section::Indicators)
        .iter()
        .filter_map(|item| {
            let (code, name) = parse_level_line(item)?;
            Some(IndicatorLine {
                code: code.to_string(),
                name: collapse_whitespace(name),
            })
        })
        .collect();

    if let Some(block) = layout.first(Section::Scale) {
        if taxonomy == Taxonomy::Outcome {
            sheet.scale = Some(parse_scale(block)?);
        } else {
            tracing::debug!(%taxonomy, section = "scale", "Ignoring section");
        }
    }

    tracing::debug!(code = %sheet.code, name = %sheet.name, "Extracted fact sheet");

    Ok(sheet)
}
