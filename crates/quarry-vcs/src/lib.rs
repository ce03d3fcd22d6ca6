//! Version-control collaborator for the mining pipeline.
//!
//! Wraps a `git2` repository handle with the four operations the pipeline
//! needs: commit metadata resolution, first-parent lookup, forced detached
//! checkout (the working tree is shared mutable state — the quality analyzer
//! reads whatever is checked out), and time-windowed added/removed line
//! aggregation for a single path.

pub mod repo;

pub use repo::{CommitMeta, GitWorkspace};
