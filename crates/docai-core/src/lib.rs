//! Core types, configuration, and collaborator boundaries for docai.
//!
//! This crate provides the shared foundation used by the search pipeline:
//! - [`DocaiError`]: unified error type using `thiserror`
//! - [`DocaiConfig`]: configuration loaded from `.docai.toml`
//! - Data model: [`Chunk`], [`IndexMetadata`], [`Document`], [`FormattedResult`]
//! - Boundaries: the [`Provider`] trait and the [`Cache`] trait with
//!   [`MemoryCache`] and [`FileCache`] implementations

mod cache;
mod config;
mod error;
mod provider;
mod types;

pub use cache::{Cache, FileCache, MemoryCache};
pub use config::{CacheConfig, DocaiConfig, EmbeddingConfig, ProviderConfig, SearchConfig};
pub use error::DocaiError;
pub use provider::{OfflineProvider, Provider, ProviderResponse};
pub use types::{Chunk, Document, FormattedResult, IndexMetadata, Metadata, INDEX_VERSION};

/// A convenience `Result` type for docai operations.
pub type Result<T> = std::result::Result<T, DocaiError>;
