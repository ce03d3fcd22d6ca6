//! Commit pair selection with overlap deduplication.

use std::collections::HashSet;
use std::fmt;

use quarry_core::QuarryError;

/// A commit together with the immediate predecessor used as its "before"
/// state.
///
/// # Examples
///
/// ```
/// use quarry_analysis::CommitPair;
///
/// let pair = CommitPair {
///     commit: "def456".into(),
///     previous: "abc123".into(),
/// };
/// assert_ne!(pair.commit, pair.previous);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitPair {
    /// The refactoring-bearing commit.
    pub commit: String,
    /// Its first parent.
    pub previous: String,
}

/// A commit that was discovered but not selected, with the reason.
#[derive(Debug, Clone)]
pub struct SkippedCommit {
    /// The discovered commit.
    pub commit: String,
    /// Why it was not selected.
    pub reason: SkipReason,
}

/// Why a discovered commit produced no pair.
#[derive(Debug, Clone)]
pub enum SkipReason {
    /// The commit identifier was empty.
    EmptyId,
    /// The commit has no parent (root commit) or the parent id was empty.
    NoParent,
    /// Parent resolution failed.
    Unresolvable(String),
    /// The commit or its parent was already consumed by an earlier pair.
    AlreadySeen,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::EmptyId => write!(f, "empty commit id"),
            SkipReason::NoParent => write!(f, "no parent commit"),
            SkipReason::Unresolvable(e) => write!(f, "unresolvable: {e}"),
            SkipReason::AlreadySeen => write!(f, "already analyzed in an earlier pair"),
        }
    }
}

/// Result of pair selection: the pairs to analyze, in discovery order, plus
/// every skipped commit with its reason.
#[derive(Debug, Default)]
pub struct Selection {
    /// Selected pairs, in discovery order of `commit`.
    pub pairs: Vec<CommitPair>,
    /// Discovered commits that produced no pair.
    pub skipped: Vec<SkippedCommit>,
}

/// Choose the (commit, previous) pairs to analyze from the discovery-ordered
/// list of refactoring-bearing commits.
///
/// `parent_of` resolves a commit's first parent; merge commits are not
/// special-cased. A pair is skipped when either identifier is empty or
/// unresolvable, or when either has already been consumed by an earlier
/// pair — a commit serving as one pair's `previous` must not return as a
/// later pair's `commit`, which would re-analyze it when refactorings land
/// in back-to-back commits.
///
/// Discovery order is an explicit slice and the consumed set an explicit
/// [`HashSet`], so selection is deterministic for a given input order.
///
/// # Examples
///
/// ```
/// use quarry_analysis::select_pairs;
///
/// // c2's parent is c1, c1's parent is c0: selecting c1 consumes c0 and
/// // c1, so the back-to-back c2 is skipped.
/// let discovered = vec!["c1".to_string(), "c2".to_string()];
/// let selection = select_pairs(&discovered, |c| {
///     Ok(Some(match c {
///         "c1" => "c0".to_string(),
///         _ => "c1".to_string(),
///     }))
/// });
/// assert_eq!(selection.pairs.len(), 1);
/// assert_eq!(selection.pairs[0].previous, "c0");
/// assert_eq!(selection.skipped.len(), 1);
/// ```
pub fn select_pairs<F>(discovered: &[String], mut parent_of: F) -> Selection
where
    F: FnMut(&str) -> Result<Option<String>, QuarryError>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut selection = Selection::default();

    for commit in discovered {
        if commit.is_empty() {
            selection.skipped.push(SkippedCommit {
                commit: commit.clone(),
                reason: SkipReason::EmptyId,
            });
            continue;
        }
        if seen.contains(commit) {
            selection.skipped.push(SkippedCommit {
                commit: commit.clone(),
                reason: SkipReason::AlreadySeen,
            });
            continue;
        }

        let previous = match parent_of(commit) {
            Ok(Some(parent)) if !parent.is_empty() => parent,
            Ok(_) => {
                selection.skipped.push(SkippedCommit {
                    commit: commit.clone(),
                    reason: SkipReason::NoParent,
                });
                continue;
            }
            Err(e) => {
                selection.skipped.push(SkippedCommit {
                    commit: commit.clone(),
                    reason: SkipReason::Unresolvable(e.to_string()),
                });
                continue;
            }
        };

        if seen.contains(&previous) {
            selection.skipped.push(SkippedCommit {
                commit: commit.clone(),
                reason: SkipReason::AlreadySeen,
            });
            continue;
        }

        seen.insert(commit.clone());
        seen.insert(previous.clone());
        selection.pairs.push(CommitPair {
            commit: commit.clone(),
            previous,
        });
    }

    selection
}
