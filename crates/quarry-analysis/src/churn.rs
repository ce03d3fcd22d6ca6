//! Bounded-window code churn.

use quarry_core::QuarryError;
use quarry_vcs::GitWorkspace;

/// Fixed look-back window: two weeks, in seconds. Not configurable.
pub const CHURN_WINDOW_SECS: i64 = 14 * 86_400;

/// Additions and deletions accumulated for `path` over the two-week window
/// ending at `commit`'s timestamp.
///
/// The window is `[t - 14 days, t]` with both bounds inclusive, where `t` is
/// the commit's author-date. A file with no history entries in the window
/// yields `(0, 0)`.
///
/// # Errors
///
/// Returns [`QuarryError::Git`] if `commit` cannot be resolved or the
/// history walk fails.
pub fn file_churn(
    workspace: &GitWorkspace,
    commit: &str,
    path: &str,
) -> Result<(u64, u64), QuarryError> {
    let meta = workspace.commit_meta(commit)?;
    let start = meta.timestamp - CHURN_WINDOW_SECS;
    workspace.line_counts(commit, path, start, meta.timestamp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Repository, Signature, Time};
    use std::path::Path;

    fn commit_file(
        repo: &Repository,
        rel_path: &str,
        content: &str,
        timestamp: i64,
        message: &str,
    ) -> String {
        let workdir = repo.workdir().unwrap();
        std::fs::write(workdir.join(rel_path), content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(Path::new(rel_path)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let sig = Signature::new("alice", "alice@example.com", &Time::new(timestamp, 0)).unwrap();
        let parents: Vec<git2::Commit> = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap()
            .to_string()
    }

    #[test]
    fn no_entries_in_window_yields_zero() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let t_head = 1_700_000_000;
        // Old edit well outside the window, then the analyzed commit only
        // touching another file.
        commit_file(&repo, "a.txt", "1\n2\n", t_head - 20 * 86_400, "old edit");
        let head = commit_file(&repo, "b.txt", "x\n", t_head, "head");

        let ws = GitWorkspace::open(dir.path()).unwrap();
        assert_eq!(file_churn(&ws, &head, "a.txt").unwrap(), (0, 0));
    }

    #[test]
    fn sums_all_entries_inside_window() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let t_head = 1_700_000_000;
        commit_file(&repo, "a.txt", "1\n2\n3\n", t_head - 86_400, "day before");
        let head = commit_file(&repo, "a.txt", "1\n3\n4\n", t_head, "head edit");

        let ws = GitWorkspace::open(dir.path()).unwrap();
        // +3 from the first edit, then +1/-1 from the head edit.
        assert_eq!(file_churn(&ws, &head, "a.txt").unwrap(), (4, 1));
    }

    #[test]
    fn entry_exactly_on_window_start_is_included() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let t_head = 1_700_000_000;
        let boundary = t_head - CHURN_WINDOW_SECS;

        commit_file(&repo, "a.txt", "1\n2\n", boundary, "exactly 14 days back");
        let head = commit_file(&repo, "a.txt", "1\n2\n3\n", t_head, "head");

        let ws = GitWorkspace::open(dir.path()).unwrap();
        assert_eq!(
            file_churn(&ws, &head, "a.txt").unwrap(),
            (3, 0),
            "boundary entry must be counted"
        );
    }

    #[test]
    fn entry_one_second_before_window_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        let repo = Repository::init(dir.path()).unwrap();
        let t_head = 1_700_000_000;
        let boundary = t_head - CHURN_WINDOW_SECS;

        commit_file(&repo, "a.txt", "1\n2\n", boundary - 1, "just too old");
        let head = commit_file(&repo, "a.txt", "1\n2\n3\n", t_head, "head");

        let ws = GitWorkspace::open(dir.path()).unwrap();
        assert_eq!(
            file_churn(&ws, &head, "a.txt").unwrap(),
            (1, 0),
            "only the head edit is inside the window"
        );
    }
}
