//! Core types, configuration, and error handling for the Quarry miner.
//!
//! This crate provides the shared foundation used by all other Quarry crates:
//! - [`QuarryError`] — unified error type using `thiserror`
//! - [`QuarryConfig`] — configuration loaded from `.quarry.toml`
//! - Wire models: [`RefactoringRecord`], [`CodeLocation`], [`SourceEntry`],
//!   [`MethodEntry`], [`SmellEntry`] for the external detector and analyzer
//!   JSON formats

mod config;
mod error;
mod types;

pub use config::{DatabaseConfig, MiningConfig, QuarryConfig, ToolsConfig};
pub use error::QuarryError;
pub use types::{
    AnalyzerReport, CodeLocation, MethodEntry, RefactoringRecord, SmellEntry, SourceEntry,
    SourceFileRef,
};

/// A convenience `Result` type for Quarry operations.
pub type Result<T> = std::result::Result<T, QuarryError>;
