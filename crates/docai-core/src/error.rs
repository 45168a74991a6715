use std::path::PathBuf;

/// Errors that can occur across the docai workspace.
///
/// Library crates return this type directly. Provider failures are recovered
/// inside the embedder and never reach callers of the search pipeline.
///
/// # Examples
///
/// ```
/// use docai_core::DocaiError;
///
/// let err = DocaiError::Config("chunk_size must be positive".into());
/// assert!(err.to_string().contains("chunk_size"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DocaiError {
    /// Filesystem I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or missing configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// AI provider call failed (network, auth, malformed response).
    #[error("provider error: {0}")]
    Provider(String),

    /// The provider does not offer the requested capability.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// JSON serialization / deserialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML deserialization failure.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// A persisted index exists but could not be parsed.
    #[error("search index at {} is corrupted: {source}", path.display())]
    IndexCorrupted {
        /// Location of the unreadable index file.
        path: PathBuf,
        /// Underlying parse failure.
        source: serde_json::Error,
    },

    /// No persisted index exists where a query expected one.
    #[error("search index not found at {}; build it first", .0.display())]
    IndexNotFound(PathBuf),

    /// A required file was not found.
    #[error("file not found: {}", .0.display())]
    FileNotFound(PathBuf),
}
