use std::path::PathBuf;

/// Errors that can occur across the Quarry pipeline.
///
/// Each variant wraps a specific error domain. Library crates use this type
/// directly; the binary crate converts to `miette` diagnostics at the boundary.
///
/// # Examples
///
/// ```
/// use quarry_core::QuarryError;
///
/// let err = QuarryError::Config("missing detector jar".into());
/// assert!(err.to_string().contains("missing detector jar"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum QuarryError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Git operation failure.
    #[error("git error: {0}")]
    Git(String),

    /// A complete record slice that failed to decode.
    #[error("record decode error: {0}")]
    Decode(String),

    /// SQLite write or query failure. Fatal to the run: the correlation
    /// graph cannot be continued after a partial write.
    #[error("database error: {0}")]
    Database(String),

    /// An external tool exited unsuccessfully or produced no output.
    /// Fatal to the run: continuing would corrupt downstream attribution.
    #[error("external tool error: {0}")]
    Tool(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
