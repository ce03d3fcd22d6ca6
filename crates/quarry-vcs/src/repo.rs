//! Git repository access via git2.

use std::path::Path;

use git2::build::CheckoutBuilder;
use git2::{Commit, DiffOptions, Repository, Sort};
use quarry_core::QuarryError;

/// Metadata for a single commit.
///
/// Timestamps are author-date epoch seconds; the message is the subject line
/// only.
///
/// # Examples
///
/// ```
/// use quarry_vcs::CommitMeta;
///
/// let meta = CommitMeta {
///     hash: "0123abcd".repeat(5),
///     timestamp: 1700000000,
///     author: "alice".into(),
///     message: "refactor: extract parser".into(),
/// };
/// assert_eq!(meta.author, "alice");
/// ```
#[derive(Debug, Clone)]
pub struct CommitMeta {
    /// Full commit hash.
    pub hash: String,
    /// Author-date as epoch seconds.
    pub timestamp: i64,
    /// Author name.
    pub author: String,
    /// Subject line of the commit message.
    pub message: String,
}

/// Handle on the mined repository's working copy.
///
/// The working tree is a shared, globally mutable resource: callers must
/// [`checkout_force`](GitWorkspace::checkout_force) the commit they want
/// analyzed before invoking anything that reads files from disk, and must
/// not interleave checkouts with reads of a previous state.
pub struct GitWorkspace {
    repo: Repository,
}

impl GitWorkspace {
    /// Open the repository at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Git`] if `path` is not a git repository.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use quarry_vcs::GitWorkspace;
    ///
    /// let ws = GitWorkspace::open(Path::new("tmp/mined-repo")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self, QuarryError> {
        let repo = Repository::open(path)
            .map_err(|e| QuarryError::Git(format!("failed to open repository: {e}")))?;
        Ok(Self { repo })
    }

    fn find(&self, hash: &str) -> Result<Commit<'_>, QuarryError> {
        if hash.is_empty() {
            return Err(QuarryError::Git("empty commit id".into()));
        }
        let object = self
            .repo
            .revparse_single(hash)
            .map_err(|e| QuarryError::Git(format!("failed to resolve '{hash}': {e}")))?;
        object
            .peel_to_commit()
            .map_err(|e| QuarryError::Git(format!("'{hash}' is not a commit: {e}")))
    }

    /// Resolve a commit's metadata: full hash, author-date, author name, and
    /// subject line.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Git`] if `hash` is empty or unresolvable.
    pub fn commit_meta(&self, hash: &str) -> Result<CommitMeta, QuarryError> {
        let commit = self.find(hash)?;
        let author = commit.author();
        Ok(CommitMeta {
            hash: commit.id().to_string(),
            timestamp: author.when().seconds(),
            author: author.name().unwrap_or("unknown").to_string(),
            message: commit.summary().unwrap_or("").to_string(),
        })
    }

    /// Resolve the first parent of a commit. Root commits have none.
    ///
    /// Merge commits are not special-cased: only the first parent is ever
    /// considered, so changes arriving through other parents are invisible
    /// to the pipeline.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Git`] if `hash` is empty or unresolvable.
    pub fn first_parent(&self, hash: &str) -> Result<Option<String>, QuarryError> {
        let commit = self.find(hash)?;
        if commit.parent_count() == 0 {
            return Ok(None);
        }
        let parent = commit
            .parent_id(0)
            .map_err(|e| QuarryError::Git(format!("failed to read parent of '{hash}': {e}")))?;
        Ok(Some(parent.to_string()))
    }

    /// Check out a commit into the working tree, discarding local
    /// modifications, and detach HEAD at it.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Git`] if the commit cannot be resolved or the
    /// checkout fails.
    pub fn checkout_force(&self, hash: &str) -> Result<(), QuarryError> {
        let commit = self.find(hash)?;
        let mut checkout = CheckoutBuilder::new();
        checkout.force();
        self.repo
            .checkout_tree(commit.as_object(), Some(&mut checkout))
            .map_err(|e| QuarryError::Git(format!("failed to checkout '{hash}': {e}")))?;
        self.repo
            .set_head_detached(commit.id())
            .map_err(|e| QuarryError::Git(format!("failed to detach HEAD at '{hash}': {e}")))?;
        Ok(())
    }

    /// Aggregate added/removed line counts for `path` across the history
    /// reachable from `from`, restricted to commits whose author-date `t`
    /// satisfies `start_ts <= t <= end_ts` (both bounds inclusive).
    ///
    /// Merge commits contribute nothing; every other commit is diffed
    /// against its first parent (or the empty tree for a root commit) with
    /// `path` as pathspec. A path untouched in the range yields `(0, 0)`.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Git`] if `from` is unresolvable or the walk
    /// fails.
    pub fn line_counts(
        &self,
        from: &str,
        path: &str,
        start_ts: i64,
        end_ts: i64,
    ) -> Result<(u64, u64), QuarryError> {
        let head = self.find(from)?;

        let mut revwalk = self
            .repo
            .revwalk()
            .map_err(|e| QuarryError::Git(format!("failed to create revwalk: {e}")))?;
        revwalk.set_sorting(Sort::TIME).ok();
        revwalk
            .push(head.id())
            .map_err(|e| QuarryError::Git(format!("failed to push '{from}': {e}")))?;

        let mut additions = 0u64;
        let mut deletions = 0u64;

        for oid_result in revwalk {
            let oid = oid_result.map_err(|e| QuarryError::Git(format!("revwalk error: {e}")))?;
            let commit = self
                .repo
                .find_commit(oid)
                .map_err(|e| QuarryError::Git(format!("failed to find commit: {e}")))?;

            let t = commit.author().when().seconds();
            if t > end_ts {
                continue;
            }
            if t < start_ts {
                break;
            }
            if commit.parent_count() > 1 {
                continue;
            }

            let (added, deleted) = self.diff_counts(&commit, path)?;
            additions += added;
            deletions += deleted;
        }

        Ok((additions, deletions))
    }

    fn diff_counts(&self, commit: &Commit<'_>, path: &str) -> Result<(u64, u64), QuarryError> {
        let commit_tree = commit
            .tree()
            .map_err(|e| QuarryError::Git(format!("failed to get commit tree: {e}")))?;

        let parent_tree = if commit.parent_count() > 0 {
            let parent = commit
                .parent(0)
                .map_err(|e| QuarryError::Git(format!("failed to get parent: {e}")))?;
            Some(
                parent
                    .tree()
                    .map_err(|e| QuarryError::Git(format!("failed to get parent tree: {e}")))?,
            )
        } else {
            None
        };

        let mut diff_opts = DiffOptions::new();
        diff_opts.pathspec(path);
        let diff = self
            .repo
            .diff_tree_to_tree(parent_tree.as_ref(), Some(&commit_tree), Some(&mut diff_opts))
            .map_err(|e| QuarryError::Git(format!("failed to compute diff: {e}")))?;

        let stats = diff
            .stats()
            .map_err(|e| QuarryError::Git(format!("failed to compute diff stats: {e}")))?;
        Ok((stats.insertions() as u64, stats.deletions() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use git2::{Signature, Time};
    use std::path::PathBuf;

    fn init_repo(dir: &Path) -> Repository {
        Repository::init(dir).unwrap()
    }

    fn commit_file(
        repo: &Repository,
        rel_path: &str,
        content: &str,
        timestamp: i64,
        message: &str,
    ) -> String {
        let workdir = repo.workdir().unwrap();
        let full = workdir.join(rel_path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&full, content).unwrap();

        let mut index = repo.index().unwrap();
        index.add_path(&PathBuf::from(rel_path)).unwrap();
        index.write().unwrap();
        let tree_id = index.write_tree().unwrap();
        let tree = repo.find_tree(tree_id).unwrap();

        let sig = Signature::new("alice", "alice@example.com", &Time::new(timestamp, 0)).unwrap();
        let parents: Vec<git2::Commit> = match repo.head() {
            Ok(head) => vec![head.peel_to_commit().unwrap()],
            Err(_) => vec![],
        };
        let parent_refs: Vec<&git2::Commit> = parents.iter().collect();
        let oid = repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parent_refs)
            .unwrap();
        oid.to_string()
    }

    #[test]
    fn commit_meta_resolves_fields() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let hash = commit_file(&repo, "a.txt", "one\n", 1_700_000_000, "add a\n\nbody text");

        let ws = GitWorkspace::open(dir.path()).unwrap();
        let meta = ws.commit_meta(&hash).unwrap();
        assert_eq!(meta.hash, hash);
        assert_eq!(meta.timestamp, 1_700_000_000);
        assert_eq!(meta.author, "alice");
        assert_eq!(meta.message, "add a");
    }

    #[test]
    fn first_parent_of_root_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let root = commit_file(&repo, "a.txt", "one\n", 1_700_000_000, "root");
        let child = commit_file(&repo, "a.txt", "one\ntwo\n", 1_700_000_100, "child");

        let ws = GitWorkspace::open(dir.path()).unwrap();
        assert_eq!(ws.first_parent(&root).unwrap(), None);
        assert_eq!(ws.first_parent(&child).unwrap(), Some(root));
    }

    #[test]
    fn empty_hash_is_a_git_error() {
        let dir = tempfile::tempdir().unwrap();
        init_repo(dir.path());
        let ws = GitWorkspace::open(dir.path()).unwrap();
        assert!(ws.commit_meta("").is_err());
        assert!(ws.first_parent("").is_err());
    }

    #[test]
    fn line_counts_sum_entries_in_window() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let t0 = 1_700_000_000;
        commit_file(&repo, "a.txt", "1\n2\n3\n", t0, "three lines");
        commit_file(&repo, "a.txt", "1\n3\n4\n5\n", t0 + 100, "edit");
        let head = commit_file(&repo, "b.txt", "other\n", t0 + 200, "unrelated file");

        let ws = GitWorkspace::open(dir.path()).unwrap();
        // First commit adds 3, second adds 2 and removes 1; b.txt never counts.
        let (add, del) = ws.line_counts(&head, "a.txt", t0, t0 + 200).unwrap();
        assert_eq!((add, del), (5, 1));
    }

    #[test]
    fn window_start_boundary_is_inclusive() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let t0 = 1_700_000_000;
        commit_file(&repo, "a.txt", "1\n2\n", t0, "on the boundary");
        let head = commit_file(&repo, "a.txt", "1\n2\n3\n", t0 + 50, "inside");

        let ws = GitWorkspace::open(dir.path()).unwrap();
        let (add, _) = ws.line_counts(&head, "a.txt", t0, t0 + 50).unwrap();
        assert_eq!(add, 3, "entry sitting exactly on the start bound counts");

        let (add, _) = ws.line_counts(&head, "a.txt", t0 + 1, t0 + 50).unwrap();
        assert_eq!(add, 1, "one second past the bound excludes it");
    }

    #[test]
    fn untouched_path_yields_zero() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let head = commit_file(&repo, "a.txt", "1\n", 1_700_000_000, "only a");

        let ws = GitWorkspace::open(dir.path()).unwrap();
        let (add, del) = ws
            .line_counts(&head, "missing.txt", 1_699_000_000, 1_700_000_001)
            .unwrap();
        assert_eq!((add, del), (0, 0));
    }

    #[test]
    fn checkout_force_restores_file_content() {
        let dir = tempfile::tempdir().unwrap();
        let repo = init_repo(dir.path());
        let first = commit_file(&repo, "a.txt", "old\n", 1_700_000_000, "first");
        commit_file(&repo, "a.txt", "new\n", 1_700_000_100, "second");

        let ws = GitWorkspace::open(dir.path()).unwrap();
        ws.checkout_force(&first).unwrap();
        let content = std::fs::read_to_string(dir.path().join("a.txt")).unwrap();
        assert_eq!(content, "old\n");
    }
}
