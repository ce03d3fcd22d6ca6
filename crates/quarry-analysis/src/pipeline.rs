//! Pipeline orchestration: ingest, select, analyze, persist.
//!
//! Ties the decoder, pair selector, attribution extractor, and churn
//! calculator to the store. Strictly sequential: the working tree is shared
//! mutable state, so each analyzer run is preceded by a forced checkout and
//! nothing overlaps.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Read;
use std::path::Path;

use quarry_core::{QuarryError, RefactoringRecord};
use quarry_store::{CorrelationStore, FileCache};
use quarry_stream::RecordStream;
use quarry_tools::QualityAnalyzer;
use quarry_vcs::GitWorkspace;

use crate::attribution::extract;
use crate::churn::file_churn;
use crate::select::{select_pairs, CommitPair, Selection};

/// Counts from ingesting one commit's record stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestSummary {
    /// Records decoded and persisted.
    pub decoded: usize,
    /// Records that failed to decode or lacked required fields.
    pub skipped: usize,
}

/// Result of analyzing one selected pair.
#[derive(Debug, Clone)]
pub enum PairOutcome {
    /// Both sides were analyzed and persisted.
    Analyzed {
        /// Metric rows written across both sides.
        metrics: usize,
        /// Smell rows written across both sides.
        smells: usize,
        /// Churn rows written for the commit's refactored files.
        churn_files: usize,
    },
    /// Metadata resolution failed before anything was written; the run
    /// continues with the next pair.
    Skipped {
        /// Diagnostic for the operator.
        reason: String,
    },
}

/// Single-pass mining pipeline state.
///
/// Owns the path→id cache and the per-commit refactored-file interest sets
/// accumulated during ingest. The store is borrowed: the caller keeps it to
/// read the end-of-run summary.
pub struct MiningPipeline<'a> {
    store: &'a CorrelationStore,
    files: FileCache,
    /// Refactoring-bearing commits in discovery order.
    discovered: Vec<String>,
    /// Files touched by refactorings, per commit.
    refactored: BTreeMap<String, BTreeSet<String>>,
}

impl<'a> MiningPipeline<'a> {
    /// Create a pipeline writing to `store`.
    pub fn new(store: &'a CorrelationStore) -> Self {
        Self {
            store,
            files: FileCache::new(),
            discovered: Vec::new(),
            refactored: BTreeMap::new(),
        }
    }

    /// Ingest one commit's stream of concatenated refactoring records.
    ///
    /// Each well-formed record becomes a `Refactoring` row (with the full
    /// decoded record re-serialized as its `details` payload) plus one
    /// `RefactoredFile` link per touched file. Records that fail to decode
    /// or lack a type tag are counted and skipped, never fatal. The commit
    /// joins the discovery order once its first record lands.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] if a write fails — fatal, since a
    /// partially written correlation graph cannot be continued.
    pub fn ingest_commit_stream<R: Read>(
        &mut self,
        commit: &str,
        reader: R,
    ) -> Result<IngestSummary, QuarryError> {
        let mut summary = IngestSummary::default();

        for item in RecordStream::new(reader) {
            let value = match item {
                Ok(value) => value,
                Err(_) => {
                    summary.skipped += 1;
                    continue;
                }
            };
            let record: RefactoringRecord = match serde_json::from_value(value.clone()) {
                Ok(record) => record,
                Err(_) => {
                    summary.skipped += 1;
                    continue;
                }
            };

            let refactoring_id =
                self.store
                    .insert_refactoring(commit, &record.kind, &value.to_string())?;

            let touched = record.files();
            for path in &touched {
                let file_id = self.files.id_for(self.store, path)?;
                self.store.insert_refactored_file(refactoring_id, file_id)?;
            }

            let entry = self.refactored.entry(commit.to_string()).or_default();
            entry.extend(touched);
            if summary.decoded == 0 && !self.discovered.contains(&commit.to_string()) {
                self.discovered.push(commit.to_string());
            }
            summary.decoded += 1;
        }

        Ok(summary)
    }

    /// Refactoring-bearing commits, in discovery order.
    pub fn refactoring_commits(&self) -> &[String] {
        &self.discovered
    }

    /// The interest set recorded for a commit during ingest.
    pub fn refactored_files(&self, commit: &str) -> Option<&BTreeSet<String>> {
        self.refactored.get(commit)
    }

    /// Select the (commit, previous) pairs to analyze, resolving first
    /// parents through the workspace.
    pub fn select(&self, workspace: &GitWorkspace) -> Selection {
        select_pairs(&self.discovered, |commit| workspace.first_parent(commit))
    }

    /// Analyze one selected pair and persist everything it produces.
    ///
    /// Resolves both commits' metadata first — a resolution failure yields
    /// [`PairOutcome::Skipped`] with nothing written. Then, in order: insert
    /// the two `Commits` rows (parent first, its predecessor link null);
    /// for each side (commit, then parent) force-checkout the working tree,
    /// run the analyzer, and persist the metric/smell rows attributed to
    /// that side's refactored files; finally compute and persist churn for
    /// each refactored file of `commit`.
    ///
    /// The analyzer report for a side is written to
    /// `<reports_dir>/<repo_name>-<side>.json`.
    ///
    /// # Errors
    ///
    /// Any error after metadata resolution is fatal to the run:
    /// [`QuarryError::Tool`] for analyzer failures, [`QuarryError::Database`]
    /// for write failures, [`QuarryError::Git`] for checkout or history-walk
    /// failures.
    pub fn analyze_pair<A: QualityAnalyzer>(
        &mut self,
        workspace: &GitWorkspace,
        analyzer: &A,
        pair: &CommitPair,
        src_dir: &Path,
        reports_dir: &Path,
        repo_name: &str,
    ) -> Result<PairOutcome, QuarryError> {
        let previous_meta = match workspace.commit_meta(&pair.previous) {
            Ok(meta) => meta,
            Err(e) => {
                return Ok(PairOutcome::Skipped {
                    reason: format!("previous commit {}: {e}", pair.previous),
                })
            }
        };
        let commit_meta = match workspace.commit_meta(&pair.commit) {
            Ok(meta) => meta,
            Err(e) => {
                return Ok(PairOutcome::Skipped {
                    reason: format!("commit {}: {e}", pair.commit),
                })
            }
        };

        self.store.insert_commit(
            &pair.previous,
            previous_meta.timestamp,
            &previous_meta.author,
            &previous_meta.message,
            None,
        )?;
        self.store.insert_commit(
            &pair.commit,
            commit_meta.timestamp,
            &commit_meta.author,
            &commit_meta.message,
            Some(&pair.previous),
        )?;

        let mut metrics_written = 0;
        let mut smells_written = 0;

        for side in [&pair.commit, &pair.previous] {
            workspace.checkout_force(side)?;

            let report_path = reports_dir.join(format!("{repo_name}-{side}.json"));
            let report = analyzer.analyze(src_dir, &report_path)?;

            let Some(interest) = self.refactored.get(side.as_str()).cloned() else {
                continue;
            };
            let attribution = extract(&report, &interest);

            for metric in &attribution.metrics {
                let file_id = self.files.id_for(self.store, &metric.file_path)?;
                self.store.insert_metric(
                    &metric.metric_type,
                    file_id,
                    metric.method_name.as_deref(),
                    metric.value,
                    side,
                )?;
            }
            for smell in &attribution.smells {
                let file_id = self.files.id_for(self.store, &smell.file_path)?;
                self.store.insert_smell(file_id, side, &smell.smell)?;
            }

            metrics_written += attribution.metrics.len();
            smells_written += attribution.smells.len();
        }

        let mut churn_files = 0;
        if let Some(touched) = self.refactored.get(pair.commit.as_str()).cloned() {
            for path in &touched {
                let (additions, deletions) = file_churn(workspace, &pair.commit, path)?;
                self.store
                    .insert_churn(&pair.commit, path, additions, deletions)?;
                churn_files += 1;
            }
        }

        Ok(PairOutcome::Analyzed {
            metrics: metrics_written,
            smells: smells_written,
            churn_files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ingest_records_discovery_order_and_interest_sets() {
        let store = CorrelationStore::in_memory().unwrap();
        let mut pipeline = MiningPipeline::new(&store);

        let stream = concat!(
            r#"{"type":"Extract Method","leftSideLocations":[{"filePath":"src/A.java"}],"#,
            r#""rightSideLocations":[{"filePath":"src/B.java"}]}"#,
            r#"{"type":"Rename Class","leftSideLocations":[{"filePath":"src/A.java"}],"#,
            r#""rightSideLocations":[{"filePath":"src/A.java"}]}"#,
        );
        let summary = pipeline
            .ingest_commit_stream("abc", stream.as_bytes())
            .unwrap();

        assert_eq!(summary.decoded, 2);
        assert_eq!(summary.skipped, 0);
        assert_eq!(pipeline.refactoring_commits(), ["abc".to_string()]);

        let interest = pipeline.refactored_files("abc").unwrap();
        let paths: Vec<&str> = interest.iter().map(String::as_str).collect();
        assert_eq!(paths, vec!["src/A.java", "src/B.java"]);

        let stats = store.stats().unwrap();
        assert_eq!(stats.refactorings, 2);
        assert_eq!(stats.files, 2);
    }

    #[test]
    fn ingest_skips_malformed_records() {
        let store = CorrelationStore::in_memory().unwrap();
        let mut pipeline = MiningPipeline::new(&store);

        // Second value has no type tag, third is not valid JSON.
        let stream = concat!(
            r#"{"type":"Inline Method","leftSideLocations":[{"filePath":"src/A.java"}]}"#,
            r#"{"kind":"not a record"}"#,
            r#"{"type":}"#,
            r#"{"type":"Move Class","rightSideLocations":[{"filePath":"src/C.java"}]}"#,
        );
        let summary = pipeline
            .ingest_commit_stream("abc", stream.as_bytes())
            .unwrap();

        assert_eq!(summary.decoded, 2);
        assert_eq!(summary.skipped, 2);
        assert_eq!(store.stats().unwrap().refactorings, 2);
    }

    #[test]
    fn commit_with_no_records_is_not_discovered() {
        let store = CorrelationStore::in_memory().unwrap();
        let mut pipeline = MiningPipeline::new(&store);

        let summary = pipeline.ingest_commit_stream("abc", "".as_bytes()).unwrap();
        assert_eq!(summary.decoded, 0);
        assert!(pipeline.refactoring_commits().is_empty());
    }

    #[test]
    fn repeated_files_share_one_id_across_records() {
        let store = CorrelationStore::in_memory().unwrap();
        let mut pipeline = MiningPipeline::new(&store);

        let stream = concat!(
            r#"{"type":"Extract Method","leftSideLocations":[{"filePath":"src/A.java"}]}"#,
            r#"{"type":"Inline Method","rightSideLocations":[{"filePath":"src/A.java"}]}"#,
        );
        pipeline
            .ingest_commit_stream("abc", stream.as_bytes())
            .unwrap();

        // Two refactorings, one file row.
        let stats = store.stats().unwrap();
        assert_eq!(stats.refactorings, 2);
        assert_eq!(stats.files, 1);
    }
}
