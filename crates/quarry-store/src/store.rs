//! SQLite-backed correlation store.

use std::collections::HashMap;
use std::path::Path;

use quarry_core::QuarryError;
use rusqlite::{params, Connection};
use serde::Serialize;

/// Row counts per relation, for the end-of-run summary.
///
/// # Examples
///
/// ```
/// use quarry_store::CorrelationStore;
///
/// let store = CorrelationStore::in_memory().unwrap();
/// let stats = store.stats().unwrap();
/// assert_eq!(stats.commits, 0);
/// assert_eq!(stats.refactorings, 0);
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Distinct files assigned a surrogate id.
    pub files: usize,
    /// Commit rows.
    pub commits: usize,
    /// Refactoring rows.
    pub refactorings: usize,
    /// Metric rows.
    pub metrics: usize,
    /// Smell rows.
    pub smells: usize,
    /// Churn rows.
    pub churn: usize,
}

/// SQLite store tying commits, refactorings, files, metrics, smells, and
/// churn together.
///
/// All operations are plain inserts; the only idempotent path is file-id
/// assignment, and that idempotence lives in [`FileCache`], not here.
///
/// # Examples
///
/// ```
/// use quarry_store::CorrelationStore;
///
/// let store = CorrelationStore::in_memory().unwrap();
/// let id = store.insert_file("src/A.java").unwrap();
/// assert!(id > 0);
/// ```
pub struct CorrelationStore {
    conn: Connection,
}

impl CorrelationStore {
    /// Open or create the database at the given path.
    ///
    /// Creates tables if they don't exist.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] if the database cannot be opened.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::Path;
    /// use quarry_store::CorrelationStore;
    ///
    /// let store = CorrelationStore::open(Path::new("refactoring.db")).unwrap();
    /// ```
    pub fn open(path: &Path) -> Result<Self, QuarryError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    QuarryError::Database(format!("failed to create database directory: {e}"))
                })?;
            }
        }
        let conn = Connection::open(path)
            .map_err(|e| QuarryError::Database(format!("failed to open database: {e}")))?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    /// Create an in-memory store (for testing).
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] if schema creation fails.
    pub fn in_memory() -> Result<Self, QuarryError> {
        let conn = Connection::open_in_memory().map_err(|e| {
            QuarryError::Database(format!("failed to create in-memory database: {e}"))
        })?;

        let store = Self { conn };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<(), QuarryError> {
        // SQLite's documented default is foreign-key enforcement OFF; the
        // bundled build flips that default ON. The pipeline ingests
        // Refactoring rows before their Commit rows exist, so restore the
        // documented default the schema is written against.
        self.conn
            .pragma_update(None, "foreign_keys", false)
            .map_err(|e| {
                QuarryError::Database(format!("failed to set foreign_keys pragma: {e}"))
            })?;

        self.conn
            .execute_batch(
                "
                CREATE TABLE IF NOT EXISTS File (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    path TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS Commits (
                    commit_hash TEXT PRIMARY KEY,
                    timestamp INTEGER NOT NULL,
                    author TEXT NOT NULL,
                    message TEXT,
                    previous_commit TEXT,
                    FOREIGN KEY (previous_commit) REFERENCES Commits(commit_hash)
                );

                CREATE TABLE IF NOT EXISTS Refactoring (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    commit_hash TEXT NOT NULL,
                    refactoring_type TEXT NOT NULL,
                    details TEXT,
                    FOREIGN KEY (commit_hash) REFERENCES Commits(commit_hash)
                );

                CREATE TABLE IF NOT EXISTS RefactoredFile (
                    refactoring_id INTEGER NOT NULL,
                    file_id INTEGER NOT NULL,
                    FOREIGN KEY (refactoring_id) REFERENCES Refactoring(id),
                    FOREIGN KEY (file_id) REFERENCES File(id)
                );

                CREATE TABLE IF NOT EXISTS OrganicMetric (
                    id INTEGER PRIMARY KEY,
                    metric_type TEXT NOT NULL,
                    file INTEGER NOT NULL,
                    method_name TEXT,
                    value REAL,
                    commit_hash TEXT NOT NULL,
                    FOREIGN KEY (file) REFERENCES File(id),
                    FOREIGN KEY (commit_hash) REFERENCES Commits(commit_hash)
                );

                CREATE TABLE IF NOT EXISTS OrganicSmell (
                    id INTEGER PRIMARY KEY,
                    file INTEGER NOT NULL,
                    commit_hash TEXT NOT NULL,
                    smell TEXT NOT NULL,
                    FOREIGN KEY (file) REFERENCES File(id),
                    FOREIGN KEY (commit_hash) REFERENCES Commits(commit_hash)
                );

                CREATE TABLE IF NOT EXISTS CodeChurn (
                    id INTEGER PRIMARY KEY,
                    commit_hash TEXT NOT NULL,
                    file_path TEXT NOT NULL,
                    additions INTEGER NOT NULL,
                    deletions INTEGER NOT NULL,
                    FOREIGN KEY (commit_hash) REFERENCES Commits(commit_hash)
                );
                ",
            )
            .map_err(|e| QuarryError::Database(format!("failed to create schema: {e}")))?;

        Ok(())
    }

    /// Insert a commit row. Each commit is inserted at most once per run; a
    /// second insert for the same hash violates the primary key and is a
    /// logic error surfaced as [`QuarryError::Database`].
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] on insert failure.
    pub fn insert_commit(
        &self,
        hash: &str,
        timestamp: i64,
        author: &str,
        message: &str,
        previous_commit: Option<&str>,
    ) -> Result<(), QuarryError> {
        self.conn
            .execute(
                "INSERT INTO Commits (commit_hash, timestamp, author, message, previous_commit)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![hash, timestamp, author, message, previous_commit],
            )
            .map_err(|e| QuarryError::Database(format!("failed to insert commit {hash}: {e}")))?;
        Ok(())
    }

    /// Insert a file row and return its surrogate id.
    ///
    /// This is a plain insert: calling it twice for the same path creates
    /// two rows. Use [`FileCache::id_for`] for the once-per-path guarantee.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] on insert failure.
    pub fn insert_file(&self, path: &str) -> Result<i64, QuarryError> {
        self.conn
            .execute("INSERT INTO File (path) VALUES (?1)", params![path])
            .map_err(|e| QuarryError::Database(format!("failed to insert file {path}: {e}")))?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Insert a refactoring row and return its id.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] on insert failure.
    pub fn insert_refactoring(
        &self,
        commit_hash: &str,
        refactoring_type: &str,
        details: &str,
    ) -> Result<i64, QuarryError> {
        self.conn
            .execute(
                "INSERT INTO Refactoring (commit_hash, refactoring_type, details)
                 VALUES (?1, ?2, ?3)",
                params![commit_hash, refactoring_type, details],
            )
            .map_err(|e| {
                QuarryError::Database(format!("failed to insert refactoring: {e}"))
            })?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Link a refactoring to a file it touches.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] on insert failure.
    pub fn insert_refactored_file(
        &self,
        refactoring_id: i64,
        file_id: i64,
    ) -> Result<(), QuarryError> {
        self.conn
            .execute(
                "INSERT INTO RefactoredFile (refactoring_id, file_id) VALUES (?1, ?2)",
                params![refactoring_id, file_id],
            )
            .map_err(|e| {
                QuarryError::Database(format!("failed to insert refactored file link: {e}"))
            })?;
        Ok(())
    }

    /// Insert a metric row. `method_name` is `None` for file-level metrics.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] on insert failure.
    pub fn insert_metric(
        &self,
        metric_type: &str,
        file_id: i64,
        method_name: Option<&str>,
        value: f64,
        commit_hash: &str,
    ) -> Result<(), QuarryError> {
        self.conn
            .execute(
                "INSERT INTO OrganicMetric (metric_type, file, method_name, value, commit_hash)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![metric_type, file_id, method_name, value, commit_hash],
            )
            .map_err(|e| QuarryError::Database(format!("failed to insert metric: {e}")))?;
        Ok(())
    }

    /// Insert a smell row.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] on insert failure.
    pub fn insert_smell(
        &self,
        file_id: i64,
        commit_hash: &str,
        smell: &str,
    ) -> Result<(), QuarryError> {
        self.conn
            .execute(
                "INSERT INTO OrganicSmell (file, commit_hash, smell) VALUES (?1, ?2, ?3)",
                params![file_id, commit_hash, smell],
            )
            .map_err(|e| QuarryError::Database(format!("failed to insert smell: {e}")))?;
        Ok(())
    }

    /// Insert a churn row.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] on insert failure.
    pub fn insert_churn(
        &self,
        commit_hash: &str,
        file_path: &str,
        additions: u64,
        deletions: u64,
    ) -> Result<(), QuarryError> {
        self.conn
            .execute(
                "INSERT INTO CodeChurn (commit_hash, file_path, additions, deletions)
                 VALUES (?1, ?2, ?3, ?4)",
                params![commit_hash, file_path, additions as i64, deletions as i64],
            )
            .map_err(|e| QuarryError::Database(format!("failed to insert churn: {e}")))?;
        Ok(())
    }

    /// All stored commit hashes, in insertion order.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] on query failure.
    pub fn commit_hashes(&self) -> Result<Vec<String>, QuarryError> {
        let mut stmt = self
            .conn
            .prepare("SELECT commit_hash FROM Commits ORDER BY rowid")
            .map_err(|e| QuarryError::Database(format!("failed to prepare query: {e}")))?;

        let rows = stmt
            .query_map([], |row| row.get(0))
            .map_err(|e| QuarryError::Database(format!("failed to query commits: {e}")))?;

        let mut hashes = Vec::new();
        for row in rows {
            let hash: String =
                row.map_err(|e| QuarryError::Database(format!("failed to read row: {e}")))?;
            hashes.push(hash);
        }
        Ok(hashes)
    }

    /// The predecessor link of a stored commit, if the commit exists.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] on query failure.
    pub fn commit_previous(&self, hash: &str) -> Result<Option<Option<String>>, QuarryError> {
        let result = self.conn.query_row(
            "SELECT previous_commit FROM Commits WHERE commit_hash = ?1",
            params![hash],
            |row| row.get::<_, Option<String>>(0),
        );

        match result {
            Ok(previous) => Ok(Some(previous)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(QuarryError::Database(format!(
                "failed to get commit {hash}: {e}"
            ))),
        }
    }

    /// Row counts per relation.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] on query failure.
    pub fn stats(&self) -> Result<StoreStats, QuarryError> {
        Ok(StoreStats {
            files: self.count("File")?,
            commits: self.count("Commits")?,
            refactorings: self.count("Refactoring")?,
            metrics: self.count("OrganicMetric")?,
            smells: self.count("OrganicSmell")?,
            churn: self.count("CodeChurn")?,
        })
    }

    fn count(&self, table: &str) -> Result<usize, QuarryError> {
        let n: i64 = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .map_err(|e| QuarryError::Database(format!("failed to count {table}: {e}")))?;
        Ok(n as usize)
    }
}

/// In-memory path→id assignment, guaranteeing one `File` row per distinct
/// path for the lifetime of a run.
///
/// Owned by the pipeline and threaded into every insertion step rather than
/// living as process-wide state, so independent runs and tests get
/// independent caches.
///
/// # Examples
///
/// ```
/// use quarry_store::{CorrelationStore, FileCache};
///
/// let store = CorrelationStore::in_memory().unwrap();
/// let mut files = FileCache::new();
/// let first = files.id_for(&store, "src/A.java").unwrap();
/// let second = files.id_for(&store, "src/A.java").unwrap();
/// assert_eq!(first, second);
/// assert_eq!(store.stats().unwrap().files, 1);
/// ```
#[derive(Debug, Default)]
pub struct FileCache {
    ids: HashMap<String, i64>,
}

impl FileCache {
    /// Create an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `path`, inserting a `File` row on first sight.
    ///
    /// # Errors
    ///
    /// Returns [`QuarryError::Database`] if the first-sight insert fails.
    pub fn id_for(&mut self, store: &CorrelationStore, path: &str) -> Result<i64, QuarryError> {
        if let Some(&id) = self.ids.get(path) {
            return Ok(id);
        }
        let id = store.insert_file(path)?;
        self.ids.insert(path.to_string(), id);
        Ok(id)
    }

    /// Look up a previously assigned id without inserting.
    pub fn get(&self, path: &str) -> Option<i64> {
        self.ids.get(path).copied()
    }
}
