use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration for catalog imports.
///
/// Stored as `config.toml` at the root of a catalog directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Versions", into = "Versions")]
pub struct Config {
    /// Edition assigned to records whose fact sheet names none.
    ///
    /// When `None`, such records are stored without an edition.
    pub default_edition: Option<String>,

    /// Additional boilerplate lines stripped by the normalizer.
    ///
    /// Matched against whole lines, ignoring case and surrounding whitespace.
    extra_noise: Vec<String>,

    /// File extensions picked up when importing a directory.
    ///
    /// Extensions are compared without the leading dot, ignoring case.
    extensions: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_edition: None,
            extra_noise: Vec::new(),
            extensions: default_extensions(),
        }
    }
}

impl Config {
    /// Loads the configuration from a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the TOML content is
    /// invalid.
    pub fn load(path: &Path) -> Result<Self, String> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config file: {e}"))?;
        toml::from_str(&content).map_err(|e| format!("Failed to parse config file: {e}"))
    }

    /// Saves the configuration to a TOML file at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration cannot be serialized to TOML or if
    /// the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content =
            toml::to_string_pretty(self).map_err(|e| format!("Failed to serialize config: {e}"))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config file: {e}"))
    }

    /// Returns the configured extra noise lines.
    #[must_use]
    pub fn extra_noise(&self) -> &[String] {
        &self.extra_noise
    }

    /// Adds a line to the extra noise list.
    ///
    /// Returns `true` if the line was added, `false` if an equivalent line
    /// (ignoring case and surrounding whitespace) already existed.
    pub fn add_noise(&mut self, line: &str) -> bool {
        let line = line.trim();
        if line.is_empty()
            || self
                .extra_noise
                .iter()
                .any(|existing| existing.trim().eq_ignore_ascii_case(line))
        {
            false
        } else {
            self.extra_noise.push(line.to_string());
            true
        }
    }

    /// Returns the file extensions considered by directory imports.
    #[must_use]
    pub fn extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Checks whether a file extension is accepted by directory imports.
    #[must_use]
    pub fn accepts_extension(&self, extension: &str) -> bool {
        let extension = extension.trim_start_matches('.');
        self.extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }
}

fn default_extensions() -> Vec<String> {
    vec!["txt".to_string()]
}

/// The serialized versions of the configuration.
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "_version")]
enum Versions {
    #[serde(rename = "1")]
    V1 {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default_edition: Option<String>,

        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        extra_noise: Vec<String>,

        #[serde(default = "default_extensions")]
        extensions: Vec<String>,
    },
}

impl From<Versions> for Config {
    fn from(versions: Versions) -> Self {
        match versions {
            Versions::V1 {
                default_edition,
                extra_noise,
                extensions,
            } => Self {
                default_edition,
                extra_noise,
                extensions,
            },
        }
    }
}

impl From<Config> for Versions {
    fn from(config: Config) -> Self {
        Self::V1 {
            default_edition: config.default_edition,
            extra_noise: config.extra_noise,
            extensions: config.extensions,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn load_reads_valid_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(
            b"_version = \"1\"\ndefault_edition = \"2021-2023\"\nextra_noise = [\"Hospital internal use\"]\nextensions = [\"txt\", \"md\"]\n",
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.default_edition.as_deref(), Some("2021-2023"));
        assert_eq!(config.extra_noise(), &["Hospital internal use".to_string()]);
        assert!(config.accepts_extension("md"));
        assert!(config.accepts_extension(".TXT"));
        assert!(!config.accepts_extension("pdf"));
    }

    #[test]
    fn load_missing_file_returns_error() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("missing.toml");

        let error = Config::load(&missing).unwrap_err();
        assert!(error.starts_with("Failed to read config file:"));
    }

    #[test]
    fn load_invalid_toml_returns_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"_version = \"1\"\nextensions = \"txt\"\n")
            .unwrap();

        let error = Config::load(file.path()).unwrap_err();
        assert!(error.starts_with("Failed to parse config file:"));
    }

    #[test]
    fn empty_file_returns_default() {
        let expected = Config::default();
        let actual: Config = toml::from_str(r#"_version = "1""#).unwrap();
        assert_eq!(actual, expected);
    }

    #[test]
    fn save_then_load() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");

        let mut config = Config {
            default_edition: Some("2018-2020".to_string()),
            ..Config::default()
        };
        assert!(config.add_noise("  Ward 4 handbook "));
        assert!(!config.add_noise("WARD 4 HANDBOOK"));
        config.save(&path).unwrap();

        assert_eq!(Config::load(&path).unwrap(), config);
    }
}
