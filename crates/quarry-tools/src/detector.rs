//! Refactoring detector invocation and output discovery.

use std::path::{Path, PathBuf};
use std::process::Command;

use quarry_core::{QuarryError, ToolsConfig};

/// Runs the external refactoring detector over a commit range.
///
/// The detector clones the target repository into its work directory and
/// writes one output file per analyzed commit, named `<commit>.json`, each
/// containing a stream of concatenated JSON refactoring records.
pub trait RefactoringDetector {
    /// Detect refactorings in `repo` (URL or local path) between `start` and
    /// `end`, returning the directory holding the per-commit output files.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Tool`] if the detector exits unsuccessfully or
    /// produces no output directory.
    fn detect(&self, repo: &str, name: &str, start: &str, end: &str)
        -> Result<PathBuf, QuarryError>;
}

/// Real detector: `java -jar <detector.jar> <repo> <name> <start> <end>`.
pub struct DetectorCommand {
    java: String,
    jar: PathBuf,
    workdir: PathBuf,
}

impl DetectorCommand {
    /// Build a detector invocation from tool config and the mining workdir.
    pub fn new(tools: &ToolsConfig, workdir: &Path) -> Self {
        Self {
            java: tools.java.clone(),
            jar: tools.detector_jar.clone(),
            workdir: workdir.to_path_buf(),
        }
    }
}

impl RefactoringDetector for DetectorCommand {
    fn detect(
        &self,
        repo: &str,
        name: &str,
        start: &str,
        end: &str,
    ) -> Result<PathBuf, QuarryError> {
        let status = Command::new(&self.java)
            .arg("-jar")
            .arg(&self.jar)
            .args([repo, name, start, end])
            .status()
            .map_err(|e| {
                QuarryError::Tool(format!("failed to launch {}: {e}", self.java))
            })?;

        if !status.success() {
            return Err(QuarryError::Tool(format!(
                "{} -jar {} {repo} {name} {start} {end} exited with {status}",
                self.java,
                self.jar.display()
            )));
        }

        let output_dir = self.workdir.join("output").join(name);
        if !output_dir.is_dir() {
            return Err(QuarryError::Tool(format!(
                "detector reported success but produced no output at {}",
                output_dir.display()
            )));
        }
        Ok(output_dir)
    }
}

/// List the detector's per-commit output files as `(commit_hash, path)`
/// pairs, sorted by file name.
///
/// The sort is the pipeline's discovery order: explicit and stable rather
/// than whatever order the directory happens to iterate in. Files without a
/// `.json` extension or with an empty stem are ignored.
///
/// # Errors
///
/// Returns [`QuarryError::Io`] if the directory cannot be read.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use quarry_tools::commit_outputs;
///
/// let outputs = commit_outputs(Path::new("tmp/output/myrepo")).unwrap();
/// for (commit, path) in outputs {
///     println!("{commit}: {}", path.display());
/// }
/// ```
pub fn commit_outputs(dir: &Path) -> Result<Vec<(String, PathBuf)>, QuarryError> {
    let mut outputs = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("json") {
            continue;
        }
        let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };
        if stem.is_empty() {
            continue;
        }
        outputs.push((stem.to_string(), path));
    }
    outputs.sort_by(|a, b| a.1.file_name().cmp(&b.1.file_name()));
    Ok(outputs)
}
