use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::DocaiError;

/// Top-level configuration loaded from `.docai.toml`.
///
/// Every section and field is optional; missing values take the defaults
/// below.
///
/// # Examples
///
/// ```
/// use docai_core::DocaiConfig;
///
/// let config = DocaiConfig::default();
/// assert_eq!(config.search.chunk_size, 1000);
/// assert_eq!(config.embedding.dimensions, 384);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocaiConfig {
    /// Chunking, ranking, and index location.
    #[serde(default)]
    pub search: SearchConfig,
    /// Embedding vector settings.
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    /// Response cache settings.
    #[serde(default)]
    pub cache: CacheConfig,
    /// AI provider settings.
    #[serde(default)]
    pub provider: ProviderConfig,
}

impl DocaiConfig {
    /// Load configuration from a TOML file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`DocaiError::Io`] if the file cannot be read, or
    /// [`DocaiError::Toml`] if the content is not valid TOML.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use docai_core::DocaiConfig;
    /// use std::path::Path;
    ///
    /// let config = DocaiConfig::from_file(Path::new(".docai.toml")).unwrap();
    /// ```
    pub fn from_file(path: &Path) -> Result<Self, DocaiError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns [`DocaiError::Toml`] if parsing fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use docai_core::DocaiConfig;
    ///
    /// let toml = r#"
    /// [search]
    /// chunk_size = 500
    /// "#;
    /// let config = DocaiConfig::from_toml(toml).unwrap();
    /// assert_eq!(config.search.chunk_size, 500);
    /// assert_eq!(config.search.chunk_overlap, 200);
    /// ```
    pub fn from_toml(content: &str) -> Result<Self, DocaiError> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Check that values are usable by the chunker, embedder, and ranker.
    ///
    /// # Errors
    ///
    /// Returns [`DocaiError::Config`] describing the first invalid value.
    pub fn validate(&self) -> Result<(), DocaiError> {
        let search = &self.search;
        if search.chunk_size == 0 {
            return Err(DocaiError::Config("search.chunk_size must be positive".into()));
        }
        if search.chunk_overlap >= search.chunk_size {
            return Err(DocaiError::Config(format!(
                "search.chunk_overlap ({}) must be smaller than search.chunk_size ({})",
                search.chunk_overlap, search.chunk_size
            )));
        }
        if search.semantic_weight < 0.0 || search.keyword_weight < 0.0 {
            return Err(DocaiError::Config(
                "search weights must not be negative".into(),
            ));
        }
        if self.embedding.dimensions == 0 {
            return Err(DocaiError::Config(
                "embedding.dimensions must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Chunking, ranking, and index location settings.
///
/// # Examples
///
/// ```
/// use docai_core::SearchConfig;
///
/// let config = SearchConfig::default();
/// assert_eq!(config.top_k, 10);
/// assert!(config.use_hybrid);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Target chunk size in characters (default: 1000).
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Characters carried over from the previous chunk (default: 200).
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,
    /// Results returned per query (default: 10).
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    /// Weight of cosine similarity in hybrid ranking (default: 0.7).
    #[serde(default = "default_semantic_weight")]
    pub semantic_weight: f64,
    /// Weight of keyword overlap in hybrid ranking (default: 0.3).
    #[serde(default = "default_keyword_weight")]
    pub keyword_weight: f64,
    /// Combine semantic and keyword scores when querying (default: true).
    #[serde(default = "default_use_hybrid")]
    pub use_hybrid: bool,
    /// Location of the persisted index.
    #[serde(default = "default_index_path")]
    pub index_path: PathBuf,
}

fn default_chunk_size() -> usize {
    1000
}

fn default_chunk_overlap() -> usize {
    200
}

fn default_top_k() -> usize {
    10
}

fn default_semantic_weight() -> f64 {
    0.7
}

fn default_keyword_weight() -> f64 {
    0.3
}

fn default_use_hybrid() -> bool {
    true
}

fn default_index_path() -> PathBuf {
    PathBuf::from(".ai-cache/search_index.json")
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            semantic_weight: default_semantic_weight(),
            keyword_weight: default_keyword_weight(),
            use_hybrid: default_use_hybrid(),
            index_path: default_index_path(),
        }
    }
}

/// Embedding vector settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Length of fallback embedding vectors (default: 384).
    #[serde(default = "default_dimensions")]
    pub dimensions: usize,
}

fn default_dimensions() -> usize {
    384
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            dimensions: default_dimensions(),
        }
    }
}

/// Response cache settings.
///
/// # Examples
///
/// ```
/// use docai_core::CacheConfig;
///
/// let config = CacheConfig::default();
/// assert!(config.enabled);
/// assert_eq!(config.dir.to_str(), Some(".ai-cache"));
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Whether cached embeddings and responses are used (default: true).
    #[serde(default = "default_cache_enabled")]
    pub enabled: bool,
    /// Directory holding cache entries (default: `.ai-cache`).
    #[serde(default = "default_cache_dir")]
    pub dir: PathBuf,
}

fn default_cache_enabled() -> bool {
    true
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".ai-cache")
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: default_cache_enabled(),
            dir: default_cache_dir(),
        }
    }
}

/// AI provider settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name (e.g. `"openrouter"`, `"gemini"`, `"anthropic"`, `"ollama"`).
    #[serde(default = "default_provider_name")]
    pub name: String,
    /// Model identifier; also qualifies cache entries.
    #[serde(default = "default_provider_model")]
    pub model: String,
    /// API key for the provider.
    pub api_key: Option<String>,
    /// Custom base URL for API requests.
    pub base_url: Option<String>,
    /// Sampling temperature for text generation (default: 0.3).
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

fn default_provider_name() -> String {
    "openrouter".into()
}

fn default_provider_model() -> String {
    "anthropic/claude-3.5-sonnet".into()
}

fn default_temperature() -> f64 {
    0.3
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: default_provider_name(),
            model: default_provider_model(),
            api_key: None,
            base_url: None,
            temperature: default_temperature(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_has_expected_values() {
        let config = DocaiConfig::default();
        assert_eq!(config.search.chunk_size, 1000);
        assert_eq!(config.search.chunk_overlap, 200);
        assert_eq!(config.search.top_k, 10);
        assert_eq!(config.search.semantic_weight, 0.7);
        assert_eq!(config.search.keyword_weight, 0.3);
        assert!(config.search.use_hybrid);
        assert_eq!(
            config.search.index_path,
            PathBuf::from(".ai-cache/search_index.json")
        );
        assert_eq!(config.embedding.dimensions, 384);
        assert!(config.cache.enabled);
        assert_eq!(config.provider.name, "openrouter");
        assert!(config.provider.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_full_toml() {
        let toml = r#"
[search]
chunk_size = 800
chunk_overlap = 100
top_k = 5
semantic_weight = 0.5
keyword_weight = 0.5
use_hybrid = false
index_path = "site/search.json"

[embedding]
dimensions = 768

[cache]
enabled = false
dir = "/tmp/docai-cache"

[provider]
name = "ollama"
model = "llama3"
base_url = "http://localhost:11434"
temperature = 0.1
"#;
        let config = DocaiConfig::from_toml(toml).unwrap();
        assert_eq!(config.search.chunk_size, 800);
        assert_eq!(config.search.chunk_overlap, 100);
        assert_eq!(config.search.top_k, 5);
        assert!(!config.search.use_hybrid);
        assert_eq!(config.search.index_path, PathBuf::from("site/search.json"));
        assert_eq!(config.embedding.dimensions, 768);
        assert!(!config.cache.enabled);
        assert_eq!(config.provider.name, "ollama");
        assert_eq!(
            config.provider.base_url.as_deref(),
            Some("http://localhost:11434")
        );
        assert_eq!(config.provider.temperature, 0.1);
    }

    #[test]
    fn empty_toml_gives_defaults() {
        let config = DocaiConfig::from_toml("").unwrap();
        assert_eq!(config.search.chunk_size, 1000);
        assert_eq!(config.embedding.dimensions, 384);
    }

    #[test]
    fn invalid_toml_returns_error() {
        let result = DocaiConfig::from_toml("{{invalid}}");
        assert!(matches!(result, Err(DocaiError::Toml(_))));
    }

    #[test]
    fn from_file_reads_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".docai.toml");
        std::fs::write(&path, "[search]\ntop_k = 3\n").unwrap();
        let config = DocaiConfig::from_file(&path).unwrap();
        assert_eq!(config.search.top_k, 3);
    }

    #[test]
    fn overlap_not_smaller_than_size_is_rejected() {
        let config = DocaiConfig::from_toml("[search]\nchunk_size = 100\nchunk_overlap = 100\n")
            .unwrap();
        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("chunk_overlap"), "unexpected error: {err}");
    }

    #[test]
    fn negative_weight_is_rejected() {
        let config = DocaiConfig::from_toml("[search]\nkeyword_weight = -0.1\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_dimensions_is_rejected() {
        let config = DocaiConfig::from_toml("[embedding]\ndimensions = 0\n").unwrap();
        assert!(config.validate().is_err());
    }
}
