use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

/// One detected refactoring, as emitted by the external detector.
///
/// Records arrive as concatenated JSON objects with no separators (see the
/// `quarry-stream` crate). The typed view here covers only the fields the
/// pipeline needs: the type tag and the two location arrays. The full decoded
/// value is persisted separately as the opaque `details` payload.
///
/// # Examples
///
/// ```
/// use quarry_core::RefactoringRecord;
///
/// let record: RefactoringRecord = serde_json::from_str(
///     r#"{
///         "type": "Extract Method",
///         "leftSideLocations": [{"filePath": "src/A.java"}],
///         "rightSideLocations": [{"filePath": "src/B.java"}]
///     }"#,
/// )
/// .unwrap();
/// assert_eq!(record.kind, "Extract Method");
/// assert_eq!(record.files().len(), 2);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefactoringRecord {
    /// Refactoring type tag (e.g. `"Extract Method"`).
    #[serde(rename = "type")]
    pub kind: String,
    /// Locations on the before side of the change.
    #[serde(default)]
    pub left_side_locations: Vec<CodeLocation>,
    /// Locations on the after side of the change.
    #[serde(default)]
    pub right_side_locations: Vec<CodeLocation>,
}

impl RefactoringRecord {
    /// The set of file paths this refactoring touches: the union of the
    /// paths referenced by both location arrays, deduplicated and in
    /// deterministic (sorted) order.
    pub fn files(&self) -> BTreeSet<String> {
        self.left_side_locations
            .iter()
            .chain(&self.right_side_locations)
            .map(|loc| loc.file_path.clone())
            .collect()
    }
}

/// A single source location within a refactoring record.
///
/// Detector records carry more positional fields (lines, columns, code
/// element descriptions); only the file path participates in attribution,
/// so the rest is ignored here and preserved in the `details` payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeLocation {
    /// Path of the touched file, relative to the repository root.
    pub file_path: String,
}

/// A quality-analyzer report: one entry per analyzed source file.
pub type AnalyzerReport = Vec<SourceEntry>;

/// One per-file entry of an analyzer report.
///
/// Every field is optional: the analyzer omits sections that are empty, and
/// an entry missing its `sourceFile` is treated as malformed and skipped
/// rather than failing the whole report.
///
/// # Examples
///
/// ```
/// use quarry_core::SourceEntry;
///
/// let entry: SourceEntry = serde_json::from_str(
///     r#"{
///         "sourceFile": {"fileRelativePath": "src/A.java"},
///         "metricsValues": {"LOC": 120.0},
///         "smells": [{"name": "GodClass"}]
///     }"#,
/// )
/// .unwrap();
/// assert!(entry.methods.is_none());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    /// The analyzed file.
    pub source_file: Option<SourceFileRef>,
    /// File-level metric values, keyed by metric name.
    pub metrics_values: Option<BTreeMap<String, serde_json::Value>>,
    /// File-level smells.
    pub smells: Option<Vec<SmellEntry>>,
    /// Per-method entries.
    pub methods: Option<Vec<MethodEntry>>,
}

/// Reference to the source file an analyzer entry describes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceFileRef {
    /// Path relative to the analyzed source root.
    pub file_relative_path: String,
}

/// A per-method entry within a [`SourceEntry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodEntry {
    /// Fully qualified method name (e.g. `"com.x.Foo.bar"`). May be absent.
    pub fully_qualified_name: Option<String>,
    /// Method-level metric values, keyed by metric name.
    pub metrics_values: Option<BTreeMap<String, serde_json::Value>>,
    /// Method-level smells.
    pub smells: Option<Vec<SmellEntry>>,
}

/// A named code smell.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmellEntry {
    /// Smell name (e.g. `"FeatureEnvy"`).
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_files_deduplicate_across_sides() {
        let record: RefactoringRecord = serde_json::from_str(
            r#"{
                "type": "Move Method",
                "leftSideLocations": [
                    {"filePath": "src/A.java"},
                    {"filePath": "src/B.java"}
                ],
                "rightSideLocations": [
                    {"filePath": "src/B.java"},
                    {"filePath": "src/C.java"}
                ]
            }"#,
        )
        .unwrap();

        let files: Vec<String> = record.files().into_iter().collect();
        assert_eq!(files, vec!["src/A.java", "src/B.java", "src/C.java"]);
    }

    #[test]
    fn record_without_locations_has_empty_file_set() {
        let record: RefactoringRecord =
            serde_json::from_str(r#"{"type": "Rename Class"}"#).unwrap();
        assert!(record.files().is_empty());
    }

    #[test]
    fn record_without_type_fails_to_parse() {
        let result: Result<RefactoringRecord, _> =
            serde_json::from_str(r#"{"leftSideLocations": []}"#);
        assert!(result.is_err());
    }

    #[test]
    fn unknown_location_fields_are_ignored() {
        let record: RefactoringRecord = serde_json::from_str(
            r#"{
                "type": "Extract Method",
                "leftSideLocations": [{
                    "filePath": "src/A.java",
                    "startLine": 10,
                    "codeElementType": "METHOD_DECLARATION"
                }],
                "rightSideLocations": []
            }"#,
        )
        .unwrap();
        assert_eq!(record.files().len(), 1);
    }

    #[test]
    fn analyzer_entry_tolerates_missing_sections() {
        let report: AnalyzerReport = serde_json::from_str(
            r#"[
                {"sourceFile": {"fileRelativePath": "src/A.java"}},
                {"methods": [{"fullyQualifiedName": "com.x.Foo.bar"}]}
            ]"#,
        )
        .unwrap();
        assert_eq!(report.len(), 2);
        assert!(report[0].metrics_values.is_none());
        assert!(report[1].source_file.is_none());
    }
}
