//! SQLite persistence for the correlation graph.
//!
//! A thin, append-only write path: commits, refactorings, files,
//! metrics, smells, and churn rows are inserted exactly once per run and
//! never updated or deleted. There is no transaction management — a failed
//! write leaves the run unrecoverable and must be treated as fatal by the
//! caller.

pub mod store;

pub use store::{CorrelationStore, FileCache, StoreStats};
