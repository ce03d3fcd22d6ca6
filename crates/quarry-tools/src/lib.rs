//! External tool collaborators: the refactoring detector and the quality
//! analyzer.
//!
//! Both tools are JVM jars run as blocking subprocesses. Every invocation is
//! gated on an explicit success check — a non-zero exit or missing expected
//! output aborts the run with [`quarry_core::QuarryError::Tool`] rather than
//! letting downstream attribution proceed against absent data.
//!
//! The traits exist so the pipeline can be exercised end-to-end in tests
//! with canned outputs instead of multi-minute jar invocations.

pub mod analyzer;
pub mod detector;

pub use analyzer::{AnalyzerCommand, QualityAnalyzer};
pub use detector::{commit_outputs, DetectorCommand, RefactoringDetector};
