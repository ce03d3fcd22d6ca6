use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::QuarryError;

/// Top-level configuration loaded from `.quarry.toml`.
///
/// Every section has working defaults, so an empty file (or no file at all)
/// yields a usable configuration. CLI flags override config values.
///
/// # Examples
///
/// ```
/// use quarry_core::QuarryConfig;
///
/// let config = QuarryConfig::default();
/// assert_eq!(config.tools.java, "java");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuarryConfig {
    /// SQLite output settings.
    #[serde(default)]
    pub database: DatabaseConfig,
    /// External tool locations.
    #[serde(default)]
    pub tools: ToolsConfig,
    /// Mining workspace settings.
    #[serde(default)]
    pub mining: MiningConfig,
}

impl QuarryConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Io`] if the file cannot be read, or
    /// [`QuarryError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use quarry_core::QuarryConfig;
    /// use std::path::Path;
    ///
    /// let config = QuarryConfig::from_file(Path::new(".quarry.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, QuarryError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use quarry_core::QuarryConfig;
    ///
    /// let toml = r#"
    /// [database]
    /// path = "results.db"
    /// "#;
    /// let config = QuarryConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.database.path.to_str(), Some("results.db"));
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, QuarryError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }
}

/// SQLite output configuration.
///
/// # Examples
///
/// ```
/// use quarry_core::DatabaseConfig;
///
/// let config = DatabaseConfig::default();
/// assert_eq!(config.path.to_str(), Some("refactoring.db"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Path of the SQLite database to create.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("refactoring.db")
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// Locations of the external detector and analyzer tools.
///
/// Both tools are JVM jars invoked as subprocesses; `java` names the JVM
/// launcher binary (resolved via `PATH` unless absolute).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// JVM launcher used to run both jars.
    #[serde(default = "default_java")]
    pub java: String,
    /// Refactoring detector jar.
    #[serde(default = "default_detector_jar")]
    pub detector_jar: PathBuf,
    /// Quality analyzer jar.
    #[serde(default = "default_analyzer_jar")]
    pub analyzer_jar: PathBuf,
}

fn default_java() -> String {
    "java".into()
}

fn default_detector_jar() -> PathBuf {
    PathBuf::from("RefactoringMiner.jar")
}

fn default_analyzer_jar() -> PathBuf {
    PathBuf::from("organic-v0.1.1-OPT.jar")
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            java: default_java(),
            detector_jar: default_detector_jar(),
            analyzer_jar: default_analyzer_jar(),
        }
    }
}

/// Mining workspace configuration.
///
/// The work directory holds the detector's clone of the mined repository
/// (`<workdir>/<name>`) and its per-commit output files
/// (`<workdir>/output/<name>`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MiningConfig {
    /// Root of the mining workspace.
    #[serde(default = "default_workdir")]
    pub workdir: PathBuf,
}

fn default_workdir() -> PathBuf {
    PathBuf::from("tmp")
}

impl Default for MiningConfig {
    fn default() -> Self {
        Self {
            workdir: default_workdir(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_toml_gives_defaults() {
        let config = QuarryConfig::from_toml("").unwrap();
        assert_eq!(config.database.path, PathBuf::from("refactoring.db"));
        assert_eq!(config.tools.java, "java");
        assert_eq!(config.mining.workdir, PathBuf::from("tmp"));
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let toml = r#"
[tools]
java = "/opt/jdk17/bin/java"
"#;
        let config = QuarryConfig::from_toml(toml).unwrap();
        assert_eq!(config.tools.java, "/opt/jdk17/bin/java");
        assert_eq!(
            config.tools.detector_jar,
            PathBuf::from("RefactoringMiner.jar")
        );
        assert_eq!(config.database.path, PathBuf::from("refactoring.db"));
    }

    #[test]
    fn invalid_toml_is_an_error() {
        assert!(QuarryConfig::from_toml("[tools\njava = 3").is_err());
    }
}
