//! Semantic search over Markdown documentation.
//!
//! Documents are stripped of code, split into overlapping sentence-based
//! chunks, embedded (natively through a [`Provider`](docai_core::Provider)
//! or with a deterministic hash fallback), and stored in a JSON-persisted
//! vector index. Queries combine cosine similarity with keyword overlap.

pub mod builder;
pub mod chunker;
pub mod embedding;
pub mod search;
pub mod store;

pub use builder::{
    create_index_from_documents, generate_embeddings_for_content, DocumentProcessor,
    IndexBuilder,
};
pub use chunker::Chunker;
pub use embedding::Embedder;
pub use search::{search_documents, HybridSearch, HybridWeights, SearchOptions, SemanticSearch};
pub use store::{IndexStats, SearchIndex};
