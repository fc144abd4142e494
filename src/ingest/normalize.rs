//! Stripping of copy-paste noise from fact sheets.

use std::sync::LazyLock;

use regex::Regex;

static TITLE_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(?i)(?:nanda(?:-i)?(?:\s+international)?|nic|noc|nursing)(?:\s+(?:nursing\s+)?(?:diagnos[ie]s|interventions?|outcomes?|classification|fact\s+sheet))*\s*$",
    )
    .expect("title regex is valid")
});

static PAGE_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(?:page\s+)?\d+\s*(?:of|/)\s*\d+$|^(?i)page\s+\d+$")
        .expect("page marker regex is valid")
});

static COPYRIGHT_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?i)(?:copyright\b|\(c\)\s*\d{4}|all rights reserved)")
        .expect("copyright regex is valid")
});

/// Characters removed wherever they appear.
const DROPPED: &[char] = &[
    '\u{feff}', // byte order mark
    '\u{200b}', // zero width space
    '\u{200c}', // zero width non-joiner
    '\u{200d}', // zero width joiner
    '\u{2060}', // word joiner
    '\u{00ae}', // registered sign
    '\u{00a9}', // copyright sign
    '\u{2122}', // trade mark sign
];

/// Removes boilerplate from copy-pasted fact sheets.
#[derive(Debug, Clone, Default)]
pub struct Normalizer {
    extra_noise: Vec<String>,
}

impl Normalizer {
    /// Creates a normalizer that additionally drops the given lines.
    ///
    /// Extra lines are matched against whole lines, ignoring case and
    /// surrounding whitespace.
    #[must_use]
    pub fn new(extra_noise: &[String]) -> Self {
        Self {
            extra_noise: extra_noise
                .iter()
                .map(|line| line.trim().to_lowercase())
                .filter(|line| !line.is_empty())
                .collect(),
        }
    }

    /// Normalizes raw fact-sheet text.
    ///
    /// ```
    /// use nursecat::ingest::Normalizer;
    ///
    /// let raw = "NANDA-I Nursing Diagnosis\r\n00132 Acute pain\u{00ae}\r\n\r\n\r\nPage 1 of 3\r\n";
    /// assert_eq!(Normalizer::default().normalize(raw), "00132 Acute pain");
    /// ```
    #[must_use]
    pub fn normalize(&self, raw: &str) -> String {
        let text = raw.replace("\r\n", "\n").replace('\r', "\n");

        let mut lines: Vec<String> = Vec::new();
        for line in text.lines() {
            let line: String = line
                .chars()
                .filter(|c| !DROPPED.contains(c))
                .map(|c| if c == '\u{00a0}' { ' ' } else { c })
                .collect();
            let line = line.trim();

            if self.is_noise(line) {
                continue;
            }

            // collapse blank runs
            if line.is_empty() && lines.last().is_none_or(String::is_empty) {
                continue;
            }

            lines.push(line.to_string());
        }

        lines.join("\n").trim().to_string()
    }

    fn is_noise(&self, line: &str) -> bool {
        if line.is_empty() {
            return false;
        }

        TITLE_LINE.is_match(line)
            || PAGE_MARKER.is_match(line)
            || COPYRIGHT_LINE.is_match(line)
            || self.extra_noise.iter().any(|n| *n == line.to_lowercase())
    }
}
