use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Scalar metadata attached to a chunk (e.g. `path`, `filename`).
///
/// Opaque to the index; only used for equality filtering.
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Unit of indexed content.
///
/// Chunks are immutable once created: `length` is fixed at construction and
/// never recomputed. `id` is assigned by the index on insertion when absent.
///
/// # Examples
///
/// ```
/// use docai_core::{Chunk, Metadata};
///
/// let chunk = Chunk::new("Install the plugin with pip", Metadata::new());
/// assert_eq!(chunk.length, 27);
/// assert!(chunk.id.is_none());
/// assert!(chunk.embedding.is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the owning index; unique and never reused.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<usize>,
    /// Prose content with code removed.
    #[serde(default)]
    pub text: String,
    /// Source metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Character count of `text` at creation time.
    #[serde(default)]
    pub length: usize,
    /// Embedding vector; chunks without one are skipped by search.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedding: Option<Vec<f32>>,
}

impl Chunk {
    /// Create an unindexed, unembedded chunk.
    pub fn new(text: impl Into<String>, metadata: Metadata) -> Self {
        let text = text.into();
        let length = text.chars().count();
        Self {
            id: None,
            text,
            metadata,
            length,
            embedding: None,
        }
    }

    /// Attach an embedding, consuming the chunk.
    ///
    /// # Examples
    ///
    /// ```
    /// use docai_core::{Chunk, Metadata};
    ///
    /// let chunk = Chunk::new("hello", Metadata::new()).with_embedding(vec![1.0, 0.0]);
    /// assert_eq!(chunk.embedding.as_deref(), Some(&[1.0, 0.0][..]));
    /// ```
    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }
}

/// Index-level counters persisted alongside the chunks.
///
/// `total_documents` is maintained by the index builder, not derived from
/// the chunks, and can drift from the number of distinct source paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexMetadata {
    /// Format version string.
    #[serde(default = "default_version")]
    pub version: String,
    /// Number of chunks in the index.
    #[serde(default)]
    pub total_chunks: usize,
    /// Number of documents added by the builder.
    #[serde(default)]
    pub total_documents: usize,
}

/// Version written into new indexes.
pub const INDEX_VERSION: &str = "1.0";

fn default_version() -> String {
    INDEX_VERSION.into()
}

impl Default for IndexMetadata {
    fn default() -> Self {
        Self {
            version: default_version(),
            total_chunks: 0,
            total_documents: 0,
        }
    }
}

/// A source document ready for chunking.
///
/// # Examples
///
/// ```
/// use docai_core::{Document, Metadata};
///
/// let mut metadata = Metadata::new();
/// metadata.insert("path".into(), "docs/index.md".into());
/// let doc = Document { content: "# Welcome".into(), metadata };
/// assert_eq!(doc.metadata["path"], "docs/index.md");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Document {
    /// Raw Markdown content.
    pub content: String,
    /// Metadata copied onto every chunk of this document.
    #[serde(default)]
    pub metadata: Metadata,
}

/// A query result as presented to callers.
///
/// # Examples
///
/// ```
/// use docai_core::{FormattedResult, Metadata};
///
/// let result = FormattedResult {
///     text: "Configure the search plugin".into(),
///     score: 0.82,
///     metadata: Metadata::new(),
///     highlight: "Configure the search plugin".into(),
/// };
/// let json = serde_json::to_value(&result).unwrap();
/// assert_eq!(json["highlight"], "Configure the search plugin");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FormattedResult {
    /// Full chunk text.
    pub text: String,
    /// Combined score in hybrid mode, rescaled similarity otherwise.
    pub score: f64,
    /// Metadata of the matched chunk.
    pub metadata: Metadata,
    /// Snippet around the first query-term occurrence.
    pub highlight: String,
}
