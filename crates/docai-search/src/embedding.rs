//! Embedding generation with caching and a deterministic fallback.
//!
//! Providers that declare native embedding support are asked first. When a
//! provider has no embedding model, or the call fails for any reason, the
//! embedder derives a vector from the SHA-256 of the text. Fallback vectors
//! are reproducible but carry no semantic meaning.

use std::sync::Arc;

use docai_core::{Cache, Chunk, DocaiError, Provider};
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

/// Default embedding dimensionality.
pub const DEFAULT_DIMENSIONS: usize = 384;

const CACHE_KEY_PREFIX: &str = "embedding_";

/// Turns text into fixed-length vectors.
///
/// The provider's embedding capability is read once here and never probed
/// again.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use docai_core::OfflineProvider;
/// use docai_search::embedding::Embedder;
///
/// # async fn example() {
/// let embedder = Embedder::new(Arc::new(OfflineProvider::default()), None);
/// let vector = embedder.embed("Getting started").await;
/// assert_eq!(vector.len(), 384);
/// # }
/// ```
pub struct Embedder {
    provider: Arc<dyn Provider>,
    cache: Option<Arc<dyn Cache>>,
    native: bool,
    dimensions: usize,
}

impl std::fmt::Debug for Embedder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Embedder")
            .field("model", &self.provider.model())
            .field("native", &self.native)
            .field("cached", &self.cache.is_some())
            .field("dimensions", &self.dimensions)
            .finish_non_exhaustive()
    }
}

impl Embedder {
    /// Create an embedder producing [`DEFAULT_DIMENSIONS`]-length fallback vectors.
    pub fn new(provider: Arc<dyn Provider>, cache: Option<Arc<dyn Cache>>) -> Self {
        Self::with_dimensions(provider, cache, DEFAULT_DIMENSIONS)
    }

    /// Create an embedder with a custom fallback dimensionality.
    pub fn with_dimensions(
        provider: Arc<dyn Provider>,
        cache: Option<Arc<dyn Cache>>,
        dimensions: usize,
    ) -> Self {
        let native = provider.supports_embeddings();
        Self {
            provider,
            cache,
            native,
            dimensions,
        }
    }

    /// Whether the provider's own embedding model is used.
    pub fn is_native(&self) -> bool {
        self.native
    }

    /// Length of fallback vectors.
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Embed `text`.
    ///
    /// Cached vectors are returned as-is, without checking their length
    /// against the current dimensionality. Provider failures are logged and
    /// replaced by the fallback vector; this method never fails.
    pub async fn embed(&self, text: &str) -> Vec<f32> {
        let key = cache_key(text);

        if let Some(vector) = self.cached(&key) {
            debug!("embedding cache hit for {key}");
            return vector;
        }

        let vector = if self.native {
            match self.provider.embed(text).await {
                Ok(vector) => vector,
                Err(e) => {
                    warn!(
                        "native embedding via '{}' failed, using hash fallback: {e}",
                        self.provider.model()
                    );
                    fallback_embedding(text, self.dimensions)
                }
            }
        } else {
            fallback_embedding(text, self.dimensions)
        };

        if let Some(cache) = &self.cache {
            let stored = serde_json::to_value(&vector)
                .map_err(DocaiError::from)
                .and_then(|value| cache.set(&key, value, None));
            if let Err(e) = stored {
                warn!("failed to cache embedding {key}: {e}");
            }
        }

        vector
    }

    /// Embed each chunk in order and attach the vector in place.
    ///
    /// Chunks are embedded one at a time; there is no cross-chunk batching.
    pub async fn embed_chunks(&self, chunks: &mut [Chunk]) {
        for chunk in chunks.iter_mut() {
            let vector = self.embed(&chunk.text).await;
            chunk.embedding = Some(vector);
        }
    }

    fn cached(&self, key: &str) -> Option<Vec<f32>> {
        let value = self.cache.as_ref()?.get(key, None)?;
        match serde_json::from_value::<Vec<f32>>(value) {
            Ok(vector) if !vector.is_empty() => Some(vector),
            Ok(_) => None,
            Err(e) => {
                debug!("ignoring non-vector cache entry {key}: {e}");
                None
            }
        }
    }
}

/// Cache key for the embedding of `text`: `embedding_` plus the first 16 hex
/// characters of its SHA-256.
///
/// # Examples
///
/// ```
/// use docai_search::embedding::cache_key;
///
/// let key = cache_key("hello");
/// assert_eq!(key, "embedding_2cf24dba5fb0a30e");
/// ```
pub fn cache_key(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("{CACHE_KEY_PREFIX}{}", &digest[..16])
}

/// Deterministic hash-derived embedding.
///
/// Consecutive byte pairs of the SHA-256 digest are read as big-endian `u16`
/// values and mapped into `[-1, 1]`; the rest is zero-padded (or truncated)
/// to `dimensions`.
///
/// # Examples
///
/// ```
/// use docai_search::embedding::fallback_embedding;
///
/// let a = fallback_embedding("install", 384);
/// let b = fallback_embedding("install", 384);
/// assert_eq!(a, b);
/// assert_eq!(a.len(), 384);
/// assert!(a[..16].iter().all(|v| (-1.0..=1.0).contains(v)));
/// assert!(a[16..].iter().all(|v| *v == 0.0));
/// ```
pub fn fallback_embedding(text: &str, dimensions: usize) -> Vec<f32> {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let digest = hasher.finalize();

    let mut vector: Vec<f32> = digest
        .chunks_exact(2)
        .map(|pair| {
            let value = f64::from(u16::from_be_bytes([pair[0], pair[1]])) / 65535.0;
            (value * 2.0 - 1.0) as f32
        })
        .collect();
    vector.resize(dimensions, 0.0);
    vector
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use docai_core::{MemoryCache, Metadata, OfflineProvider, ProviderResponse};

    use super::*;

    /// Provider with a native embedding model returning a fixed vector.
    struct NativeProvider {
        calls: AtomicUsize,
        fail: bool,
    }

    impl NativeProvider {
        fn new(fail: bool) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail,
            }
        }
    }

    #[async_trait]
    impl Provider for NativeProvider {
        fn model(&self) -> &str {
            "native-test"
        }

        async fn generate(
            &self,
            prompt: &str,
            _system_prompt: &str,
            _temperature: f64,
        ) -> Result<ProviderResponse, DocaiError> {
            Ok(ProviderResponse {
                content: prompt.to_string(),
            })
        }

        fn supports_embeddings(&self) -> bool {
            true
        }

        async fn embed(&self, _text: &str) -> Result<Vec<f32>, DocaiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                Err(DocaiError::Provider("401 unauthorized".into()))
            } else {
                Ok(vec![0.25, 0.5, 0.75])
            }
        }
    }

    #[test]
    fn fallback_is_deterministic_and_distinct() {
        let a = fallback_embedding("The quick brown fox", DEFAULT_DIMENSIONS);
        let b = fallback_embedding("The quick brown fox", DEFAULT_DIMENSIONS);
        let c = fallback_embedding("The lazy dog", DEFAULT_DIMENSIONS);
        assert_eq!(a.len(), 384);
        assert_eq!(
            a.iter().map(|v| v.to_bits()).collect::<Vec<_>>(),
            b.iter().map(|v| v.to_bits()).collect::<Vec<_>>()
        );
        assert_ne!(a, c);
    }

    #[test]
    fn fallback_packs_byte_pairs() {
        // SHA-256("hello") starts with 2c f2 4d ba.
        let v = fallback_embedding("hello", 384);
        let expected0 = (f64::from(0x2cf2u16) / 65535.0 * 2.0 - 1.0) as f32;
        let expected1 = (f64::from(0x4dbau16) / 65535.0 * 2.0 - 1.0) as f32;
        assert_eq!(v[0], expected0);
        assert_eq!(v[1], expected1);
    }

    #[test]
    fn fallback_truncates_to_small_dimensions() {
        let v = fallback_embedding("hello", 4);
        assert_eq!(v.len(), 4);
        assert!(v.iter().any(|x| *x != 0.0));
    }

    #[test]
    fn cache_key_has_prefix_and_16_hex_chars() {
        let key = cache_key("some chunk text");
        assert!(key.starts_with("embedding_"));
        let digest = &key["embedding_".len()..];
        assert_eq!(digest.len(), 16);
        assert!(digest.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(key, cache_key("other chunk text"));
    }

    #[tokio::test]
    async fn offline_provider_uses_fallback() {
        let embedder = Embedder::new(Arc::new(OfflineProvider::default()), None);
        assert!(!embedder.is_native());
        let v = embedder.embed("text").await;
        assert_eq!(v, fallback_embedding("text", 384));
    }

    #[tokio::test]
    async fn native_provider_is_used() {
        let provider = Arc::new(NativeProvider::new(false));
        let embedder = Embedder::new(provider.clone(), None);
        assert!(embedder.is_native());
        assert_eq!(embedder.embed("text").await, vec![0.25, 0.5, 0.75]);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn provider_failure_falls_back() {
        let provider = Arc::new(NativeProvider::new(true));
        let embedder = Embedder::new(provider, None);
        assert_eq!(embedder.embed("text").await, fallback_embedding("text", 384));
    }

    #[tokio::test]
    async fn cache_hit_skips_provider() {
        let provider = Arc::new(NativeProvider::new(false));
        let cache = Arc::new(MemoryCache::new());
        let embedder = Embedder::new(provider.clone(), Some(cache.clone()));

        let first = embedder.embed("repeated").await;
        let second = embedder.embed("repeated").await;
        assert_eq!(first, second);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert!(cache.get(&cache_key("repeated"), None).is_some());
    }

    #[tokio::test]
    async fn cached_vector_returned_without_dimension_check() {
        let cache = Arc::new(MemoryCache::new());
        cache
            .set(&cache_key("stale"), serde_json::json!([1.0, 2.0]), None)
            .unwrap();
        let embedder = Embedder::new(Arc::new(OfflineProvider::default()), Some(cache));
        assert_eq!(embedder.embed("stale").await, vec![1.0, 2.0]);
    }

    #[tokio::test]
    async fn embed_chunks_attaches_vectors_in_order() {
        let embedder = Embedder::with_dimensions(Arc::new(OfflineProvider::default()), None, 8);
        let mut chunks = vec![
            Chunk::new("first", Metadata::new()),
            Chunk::new("second", Metadata::new()),
        ];
        embedder.embed_chunks(&mut chunks).await;
        assert_eq!(chunks[0].embedding, Some(fallback_embedding("first", 8)));
        assert_eq!(chunks[1].embedding, Some(fallback_embedding("second", 8)));
    }
}
