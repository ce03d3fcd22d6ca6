//! Quality analyzer invocation.

use std::path::{Path, PathBuf};
use std::process::Command;

use quarry_core::{AnalyzerReport, QuarryError, ToolsConfig};

/// Runs the external quality analyzer against a checked-out source tree.
///
/// The analyzer writes a JSON report of per-file metrics, smells, and
/// per-method entries. Callers are responsible for having the right commit
/// checked out before invoking it — the analyzer reads whatever is on disk.
pub trait QualityAnalyzer {
    /// Analyze the source tree at `src`, writing the report to `output`, and
    /// return the parsed report.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Tool`] if the analyzer exits unsuccessfully or
    /// the report file is missing afterwards, and
    /// [`QuarryError::Serialization`] if the report is not valid JSON.
    fn analyze(&self, src: &Path, output: &Path) -> Result<AnalyzerReport, QuarryError>;
}

/// Real analyzer: `java -jar <analyzer.jar> -sf <output> -src <src>`.
pub struct AnalyzerCommand {
    java: String,
    jar: PathBuf,
}

impl AnalyzerCommand {
    /// Build an analyzer invocation from tool config.
    pub fn new(tools: &ToolsConfig) -> Self {
        Self {
            java: tools.java.clone(),
            jar: tools.analyzer_jar.clone(),
        }
    }
}

impl QualityAnalyzer for AnalyzerCommand {
    fn analyze(&self, src: &Path, output: &Path) -> Result<AnalyzerReport, QuarryError> {
        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let status = Command::new(&self.java)
            .arg("-jar")
            .arg(&self.jar)
            .arg("-sf")
            .arg(output)
            .arg("-src")
            .arg(src)
            .status()
            .map_err(|e| {
                QuarryError::Tool(format!("failed to launch {}: {e}", self.java))
            })?;

        if !status.success() {
            return Err(QuarryError::Tool(format!(
                "{} -jar {} -sf {} -src {} exited with {status}",
                self.java,
                self.jar.display(),
                output.display(),
                src.display()
            )));
        }

        if !output.is_file() {
            return Err(QuarryError::Tool(format!(
                "analyzer reported success but wrote no report at {}",
                output.display()
            )));
        }

        let content = std::fs::read_to_string(output)?;
        let report: AnalyzerReport = serde_json::from_str(&content)?;
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_analyzer_surfaces_command_and_status() {
        let tools = ToolsConfig {
            java: "false".into(),
            ..ToolsConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let analyzer = AnalyzerCommand::new(&tools);

        let err = analyzer
            .analyze(dir.path(), &dir.path().join("report.json"))
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("false -jar"), "got: {msg}");
        assert!(msg.contains("exited with"), "got: {msg}");
    }

    #[test]
    fn successful_exit_without_report_is_an_error() {
        let tools = ToolsConfig {
            java: "true".into(),
            ..ToolsConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let analyzer = AnalyzerCommand::new(&tools);

        let err = analyzer
            .analyze(dir.path(), &dir.path().join("report.json"))
            .unwrap_err();
        assert!(err.to_string().contains("no report"));
    }

    #[test]
    fn existing_report_is_parsed() {
        let tools = ToolsConfig {
            java: "true".into(),
            ..ToolsConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("report.json");
        std::fs::write(
            &report_path,
            r#"[{"sourceFile": {"fileRelativePath": "src/A.java"},
                 "metricsValues": {"LOC": 12}}]"#,
        )
        .unwrap();

        let analyzer = AnalyzerCommand::new(&tools);
        let report = analyzer.analyze(dir.path(), &report_path).unwrap();
        assert_eq!(report.len(), 1);
    }

    #[test]
    fn unparseable_report_is_an_error() {
        let tools = ToolsConfig {
            java: "true".into(),
            ..ToolsConfig::default()
        };
        let dir = tempfile::tempdir().unwrap();
        let report_path = dir.path().join("report.json");
        std::fs::write(&report_path, "not json at all").unwrap();

        let analyzer = AnalyzerCommand::new(&tools);
        assert!(analyzer.analyze(dir.path(), &report_path).is_err());
    }
}
