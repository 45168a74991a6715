//! Indexing pipeline: documents to chunks to embeddings to a [`SearchIndex`].

use std::path::{Path, PathBuf};
use std::sync::Arc;

use docai_core::{Cache, Chunk, DocaiConfig, DocaiError, Document, Metadata, Provider};
use tracing::{debug, info};

use crate::chunker::{Chunker, DEFAULT_CHUNK_OVERLAP};
use crate::embedding::Embedder;
use crate::store::SearchIndex;

/// Chunks documents and attaches embeddings.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use docai_core::{Metadata, OfflineProvider};
/// use docai_search::builder::DocumentProcessor;
/// use docai_search::chunker::Chunker;
/// use docai_search::embedding::Embedder;
///
/// # async fn example() {
/// let embedder = Embedder::new(Arc::new(OfflineProvider::default()), None);
/// let processor = DocumentProcessor::new(Chunker::default(), embedder);
/// let chunks = processor.process_document("Hello. World.", &Metadata::new()).await;
/// assert!(chunks.iter().all(|c| c.embedding.is_some()));
/// # }
/// ```
#[derive(Debug)]
pub struct DocumentProcessor {
    chunker: Chunker,
    embedder: Embedder,
}

impl DocumentProcessor {
    /// Process with `chunker`, embedding through `embedder`.
    pub fn new(chunker: Chunker, embedder: Embedder) -> Self {
        Self { chunker, embedder }
    }

    /// The chunker in use.
    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    /// The embedder in use.
    pub fn embedder(&self) -> &Embedder {
        &self.embedder
    }

    /// Chunk `content` and embed every chunk.
    pub async fn process_document(&self, content: &str, metadata: &Metadata) -> Vec<Chunk> {
        let mut chunks = self.chunker.chunk(content, metadata);
        self.embedder.embed_chunks(&mut chunks).await;
        chunks
    }

    /// Process documents in order, concatenating their chunks.
    pub async fn process_documents(&self, documents: &[Document]) -> Vec<Chunk> {
        let mut all = Vec::new();
        for doc in documents {
            all.extend(self.process_document(&doc.content, &doc.metadata).await);
        }
        all
    }
}

/// Builds and extends persisted search indexes from Markdown files.
#[derive(Debug)]
pub struct IndexBuilder {
    processor: DocumentProcessor,
    index_path: PathBuf,
}

impl IndexBuilder {
    /// Builder with default chunking, writing indexes to `index_path`.
    pub fn new(
        provider: Arc<dyn Provider>,
        cache: Option<Arc<dyn Cache>>,
        index_path: impl AsRef<Path>,
    ) -> Self {
        Self {
            processor: DocumentProcessor::new(Chunker::default(), Embedder::new(provider, cache)),
            index_path: index_path.as_ref().to_path_buf(),
        }
    }

    /// Builder configured from the `[search]` and `[embedding]` sections.
    pub fn from_config(
        config: &DocaiConfig,
        provider: Arc<dyn Provider>,
        cache: Option<Arc<dyn Cache>>,
    ) -> Self {
        let chunker = Chunker::new(config.search.chunk_size, config.search.chunk_overlap);
        let embedder = Embedder::with_dimensions(provider, cache, config.embedding.dimensions);
        Self {
            processor: DocumentProcessor::new(chunker, embedder),
            index_path: config.search.index_path.clone(),
        }
    }

    /// Where built indexes persist.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// The underlying document processor.
    pub fn processor(&self) -> &DocumentProcessor {
        &self.processor
    }

    /// Build a fresh index from `paths`, one file at a time.
    ///
    /// Each chunk carries `path` and `filename` metadata. The returned index
    /// is not saved; call [`SearchIndex::save`].
    ///
    /// # Errors
    ///
    /// The first file that cannot be read aborts the build:
    /// [`DocaiError::FileNotFound`] if it is missing, [`DocaiError::Io`]
    /// otherwise.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use std::path::PathBuf;
    /// use std::sync::Arc;
    /// use docai_core::OfflineProvider;
    /// use docai_search::builder::IndexBuilder;
    ///
    /// # async fn example() {
    /// let builder = IndexBuilder::new(
    ///     Arc::new(OfflineProvider::default()),
    ///     None,
    ///     ".ai-cache/search_index.json",
    /// );
    /// let index = builder
    ///     .build_index_from_files(&[PathBuf::from("docs/index.md")])
    ///     .await
    ///     .unwrap();
    /// index.save().unwrap();
    /// # }
    /// ```
    pub async fn build_index_from_files(&self, paths: &[PathBuf]) -> Result<SearchIndex, DocaiError> {
        let mut index = SearchIndex::new(&self.index_path);
        self.append_files(&mut index, paths).await?;
        index.set_total_documents(paths.len());

        info!(
            "built search index with {} chunks from {} documents",
            index.len(),
            paths.len()
        );
        Ok(index)
    }

    /// Append chunks for `new_files` to `index` and bump its document count.
    ///
    /// Files already in the index are not detected; re-adding one duplicates
    /// its chunks and counts it again.
    ///
    /// # Errors
    ///
    /// Same as [`build_index_from_files`](Self::build_index_from_files).
    /// Chunks of files processed before the failing one stay in `index`.
    pub async fn update_index(
        &self,
        index: &mut SearchIndex,
        new_files: &[PathBuf],
    ) -> Result<(), DocaiError> {
        self.append_files(index, new_files).await?;
        index.add_documents(new_files.len());

        info!(
            "added {} documents to search index ({} chunks total)",
            new_files.len(),
            index.len()
        );
        Ok(())
    }

    async fn append_files(&self, index: &mut SearchIndex, paths: &[PathBuf]) -> Result<(), DocaiError> {
        for path in paths {
            let content = read_document(path).await?;
            let chunks = self
                .processor
                .process_document(&content, &file_metadata(path))
                .await;
            debug!("{}: {} chunks", path.display(), chunks.len());
            index.add_chunks(chunks);
        }
        Ok(())
    }
}

async fn read_document(path: &Path) -> Result<String, DocaiError> {
    tokio::fs::read_to_string(path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            DocaiError::FileNotFound(path.to_path_buf())
        } else {
            DocaiError::Io(e)
        }
    })
}

fn file_metadata(path: &Path) -> Metadata {
    let mut metadata = Metadata::new();
    metadata.insert("path".into(), path.to_string_lossy().into_owned().into());
    let filename = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    metadata.insert("filename".into(), filename.into());
    metadata
}

/// Build an index from groups of already-embedded chunks, one group per
/// document.
///
/// # Examples
///
/// ```
/// use docai_core::{Chunk, Metadata};
/// use docai_search::builder::create_index_from_documents;
///
/// let docs = vec![
///     vec![Chunk::new("a", Metadata::new()).with_embedding(vec![1.0])],
///     vec![Chunk::new("b", Metadata::new()).with_embedding(vec![0.5])],
/// ];
/// let index = create_index_from_documents(docs, "index.json");
/// assert_eq!(index.len(), 2);
/// assert_eq!(index.metadata().total_documents, 2);
/// ```
pub fn create_index_from_documents(
    documents: Vec<Vec<Chunk>>,
    index_path: impl AsRef<Path>,
) -> SearchIndex {
    let mut index = SearchIndex::new(index_path);
    let total = documents.len();
    for chunks in documents {
        index.add_chunks(chunks);
    }
    index.set_total_documents(total);
    index
}

/// Chunk and embed `content` with the default overlap.
pub async fn generate_embeddings_for_content(
    content: &str,
    provider: Arc<dyn Provider>,
    cache: Option<Arc<dyn Cache>>,
    chunk_size: usize,
) -> Vec<Chunk> {
    let overlap = DEFAULT_CHUNK_OVERLAP.min(chunk_size.saturating_sub(1));
    let processor = DocumentProcessor::new(
        Chunker::new(chunk_size, overlap),
        Embedder::new(provider, cache),
    );
    processor.process_document(content, &Metadata::new()).await
}
