//! File-persisted vector index.
//!
//! The whole index lives in memory and is written as one JSON document
//! (`{metadata, chunks}`). Saves rewrite the full file atomically; there is
//! no locking, so only one process should write a given index at a time.

use std::fs;
use std::path::{Path, PathBuf};

use docai_core::{Chunk, DocaiError, IndexMetadata, Metadata};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default location of the persisted index.
pub const DEFAULT_INDEX_PATH: &str = ".ai-cache/search_index.json";

/// A chunk returned from [`SearchIndex::search`] with its rescaled
/// similarity in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Cosine similarity mapped from `[-1, 1]` to `[0, 1]`.
    pub similarity: f64,
}

/// Index statistics.
///
/// # Examples
///
/// ```
/// use docai_search::store::IndexStats;
///
/// let stats = IndexStats {
///     total_chunks: 10,
///     total_documents: 2,
///     index_size_mb: 0.5,
///     avg_chunk_length: 812.4,
/// };
/// assert_eq!(stats.total_chunks, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexStats {
    /// Number of chunks in memory.
    pub total_chunks: usize,
    /// Document counter maintained by the builder.
    pub total_documents: usize,
    /// Size of the persisted file in MiB (0 if never saved).
    pub index_size_mb: f64,
    /// Mean of the stored chunk `length` fields.
    pub avg_chunk_length: f64,
}

#[derive(Serialize)]
struct IndexFileRef<'a> {
    metadata: &'a IndexMetadata,
    chunks: &'a [Chunk],
}

#[derive(Deserialize)]
struct IndexFile {
    #[serde(default)]
    metadata: Option<IndexMetadata>,
    #[serde(default)]
    chunks: Vec<Chunk>,
}

/// Ordered collection of chunks with similarity search.
///
/// # Examples
///
/// ```
/// use docai_core::{Chunk, Metadata};
/// use docai_search::store::SearchIndex;
///
/// let mut index = SearchIndex::in_memory();
/// index.add_chunk(Chunk::new("alpha", Metadata::new()).with_embedding(vec![1.0, 0.0]));
/// index.add_chunk(Chunk::new("beta", Metadata::new()).with_embedding(vec![0.0, 1.0]));
///
/// let hits = index.search(&[1.0, 0.0], 1, None);
/// assert_eq!(hits[0].chunk.text, "alpha");
/// assert!((hits[0].similarity - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone)]
pub struct SearchIndex {
    path: Option<PathBuf>,
    chunks: Vec<Chunk>,
    metadata: IndexMetadata,
}

impl Default for SearchIndex {
    fn default() -> Self {
        Self::new(DEFAULT_INDEX_PATH)
    }
}

impl SearchIndex {
    /// Create an empty index that persists to `path`.
    ///
    /// Nothing is read; call [`load`](Self::load) to pick up an existing file.
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: Some(path.as_ref().to_path_buf()),
            chunks: Vec::new(),
            metadata: IndexMetadata::default(),
        }
    }

    /// Create an empty index with no backing file.
    ///
    /// [`save`](Self::save) fails and [`load`](Self::load) does nothing.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            chunks: Vec::new(),
            metadata: IndexMetadata::default(),
        }
    }

    /// Create an index at `path` and load it if the file exists.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DocaiError> {
        let mut index = Self::new(path);
        index.load()?;
        Ok(index)
    }

    /// Location of the persisted file; `None` for in-memory indexes.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Stored chunks in insertion order.
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Index-level counters.
    pub fn metadata(&self) -> &IndexMetadata {
        &self.metadata
    }

    /// Number of chunks.
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Overwrite the document counter.
    pub fn set_total_documents(&mut self, total: usize) {
        self.metadata.total_documents = total;
    }

    /// Increase the document counter. Not deduplicated by path.
    pub fn add_documents(&mut self, count: usize) {
        self.metadata.total_documents += count;
    }

    /// Append a chunk, assigning `id = len()` when it has none.
    pub fn add_chunk(&mut self, mut chunk: Chunk) {
        if chunk.id.is_none() {
            chunk.id = Some(self.chunks.len());
        }
        self.chunks.push(chunk);
        self.metadata.total_chunks = self.chunks.len();
    }

    /// Append chunks in order.
    pub fn add_chunks(&mut self, chunks: impl IntoIterator<Item = Chunk>) {
        for chunk in chunks {
            self.add_chunk(chunk);
        }
    }

    /// Rank embedded chunks by cosine similarity to `query`.
    ///
    /// When `filter` is given, only chunks whose metadata has every filter
    /// key with an equal value are considered. Chunks without an embedding
    /// are skipped. Ties keep insertion order.
    pub fn search(
        &self,
        query: &[f32],
        top_k: usize,
        filter: Option<&Metadata>,
    ) -> Vec<ScoredChunk> {
        let mut results: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .filter(|chunk| filter.map_or(true, |f| matches_filter(&chunk.metadata, f)))
            .filter_map(|chunk| {
                let embedding = chunk.embedding.as_deref()?;
                let similarity = (cosine_similarity(query, embedding) + 1.0) / 2.0;
                Some(ScoredChunk {
                    chunk: chunk.clone(),
                    similarity,
                })
            })
            .collect();

        results.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        results.truncate(top_k);
        results
    }

    /// Write the index to its path, creating parent directories.
    ///
    /// The file is written to a temporary sibling and renamed into place, so
    /// readers never observe a partial index.
    ///
    /// # Errors
    ///
    /// Returns [`DocaiError::Config`] for an in-memory index, or
    /// [`DocaiError::Io`] / [`DocaiError::Serialization`] on write failure.
    pub fn save(&self) -> Result<(), DocaiError> {
        let Some(path) = &self.path else {
            return Err(DocaiError::Config(
                "in-memory search index has no path to save to".into(),
            ));
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = IndexFileRef {
            metadata: &self.metadata,
            chunks: &self.chunks,
        };
        let json = serde_json::to_vec_pretty(&file)?;

        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path)?;

        info!(
            "saved search index with {} chunks to {}",
            self.chunks.len(),
            path.display()
        );
        Ok(())
    }

    /// Replace the in-memory contents with the persisted file.
    ///
    /// A missing file, or an in-memory index, leaves the index unchanged.
    /// Missing fields default, and `total_chunks` is recomputed from the
    /// loaded chunks.
    ///
    /// # Errors
    ///
    /// Returns [`DocaiError::Io`] if the file exists but cannot be read, or
    /// [`DocaiError::IndexCorrupted`] if it is not a valid index document.
    pub fn load(&mut self) -> Result<(), DocaiError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if !path.exists() {
            debug!("no search index at {}, starting empty", path.display());
            return Ok(());
        }

        let content = fs::read(path)?;
        let file: IndexFile =
            serde_json::from_slice(&content).map_err(|source| DocaiError::IndexCorrupted {
                path: path.clone(),
                source,
            })?;

        if let Some(metadata) = file.metadata {
            self.metadata = metadata;
        }
        self.chunks = file.chunks;
        self.metadata.total_chunks = self.chunks.len();

        info!(
            "loaded search index with {} chunks from {}",
            self.chunks.len(),
            path.display()
        );
        Ok(())
    }

    /// Drop all chunks. The document counter is left as is.
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.metadata.total_chunks = 0;
    }

    /// Current statistics.
    ///
    /// # Errors
    ///
    /// Returns [`DocaiError::Io`] if the persisted file exists but its size
    /// cannot be read.
    pub fn get_stats(&self) -> Result<IndexStats, DocaiError> {
        let index_size_mb = match &self.path {
            Some(path) if path.exists() => fs::metadata(path)?.len() as f64 / (1024.0 * 1024.0),
            _ => 0.0,
        };

        let avg_chunk_length = if self.chunks.is_empty() {
            0.0
        } else {
            let total: usize = self.chunks.iter().map(|c| c.length).sum();
            total as f64 / self.chunks.len() as f64
        };

        Ok(IndexStats {
            total_chunks: self.chunks.len(),
            total_documents: self.metadata.total_documents,
            index_size_mb,
            avg_chunk_length,
        })
    }
}

/// Whether `metadata` has every key of `filter` with an equal value.
pub fn matches_filter(metadata: &Metadata, filter: &Metadata) -> bool {
    filter
        .iter()
        .all(|(key, value)| metadata.get(key) == Some(value))
}

/// Raw cosine similarity in `[-1, 1]`.
///
/// Returns 0 when the lengths differ or either vector has zero magnitude.
///
/// # Examples
///
/// ```
/// use docai_search::store::cosine_similarity;
///
/// assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
/// assert_eq!(cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]), 0.0);
/// ```
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;

    for (x, y) in a.iter().zip(b) {
        let x = f64::from(*x);
        let y = f64::from(*y);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}
