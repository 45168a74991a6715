//! Hybrid retrieval and result formatting.
//!
//! Candidates come from vector search over an over-fetched pool of
//! `top_k * 2`; each is re-scored with a weighted sum of its similarity and
//! the fraction of query terms it contains. Chunks outside the pool are never
//! reconsidered, however well they match lexically.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use docai_core::{
    Cache, Chunk, DocaiError, FormattedResult, Metadata, Provider, SearchConfig,
};
use tracing::debug;

use crate::embedding::Embedder;
use crate::store::SearchIndex;

/// Characters kept before the first matched term in a highlight.
const HIGHLIGHT_BEFORE: usize = 50;
/// Characters kept from the first matched term onward in a highlight.
const HIGHLIGHT_LENGTH: usize = 200;
const ELLIPSIS: &str = "...";

/// Weights for combining semantic and keyword scores.
///
/// They are not normalised; callers choose sensible values.
///
/// # Examples
///
/// ```
/// use docai_search::search::HybridWeights;
///
/// let weights = HybridWeights::default();
/// assert_eq!(weights.semantic, 0.7);
/// assert_eq!(weights.keyword, 0.3);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HybridWeights {
    /// Multiplier for rescaled cosine similarity.
    pub semantic: f64,
    /// Multiplier for keyword overlap.
    pub keyword: f64,
}

impl Default for HybridWeights {
    fn default() -> Self {
        Self {
            semantic: 0.7,
            keyword: 0.3,
        }
    }
}

/// A re-ranked hybrid search hit.
#[derive(Debug, Clone, PartialEq)]
pub struct HybridHit {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Rescaled cosine similarity in `[0, 1]`.
    pub similarity: f64,
    /// Fraction of query terms present in the chunk.
    pub keyword_score: f64,
    /// `semantic * similarity + keyword * keyword_score`.
    pub combined_score: f64,
}

/// Hybrid ranker over a [`SearchIndex`].
///
/// # Examples
///
/// ```
/// use docai_core::{Chunk, Metadata};
/// use docai_search::search::{HybridSearch, HybridWeights};
/// use docai_search::store::SearchIndex;
///
/// let mut index = SearchIndex::in_memory();
/// index.add_chunk(Chunk::new("install the plugin", Metadata::new()).with_embedding(vec![1.0, 0.0]));
///
/// let hits = HybridSearch::new(&index).search("plugin", &[1.0, 0.0], 5, HybridWeights::default(), None);
/// assert_eq!(hits.len(), 1);
/// assert!((hits[0].combined_score - 1.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct HybridSearch<'a> {
    index: &'a SearchIndex,
}

impl<'a> HybridSearch<'a> {
    /// Rank against `index`.
    pub fn new(index: &'a SearchIndex) -> Self {
        Self { index }
    }

    /// Search with vector similarity, then re-rank by keyword overlap.
    ///
    /// `filter` restricts the candidate pool exactly as in
    /// [`SearchIndex::search`]. Ties keep candidate order.
    pub fn search(
        &self,
        query: &str,
        query_vector: &[f32],
        top_k: usize,
        weights: HybridWeights,
        filter: Option<&Metadata>,
    ) -> Vec<HybridHit> {
        let candidates = self
            .index
            .search(query_vector, top_k.saturating_mul(2), filter);
        let query_terms = term_set(query);

        let mut hits: Vec<HybridHit> = candidates
            .into_iter()
            .map(|scored| {
                let keyword_score = keyword_score(&query_terms, &scored.chunk.text);
                let combined_score =
                    weights.semantic * scored.similarity + weights.keyword * keyword_score;
                HybridHit {
                    chunk: scored.chunk,
                    similarity: scored.similarity,
                    keyword_score,
                    combined_score,
                }
            })
            .collect();

        hits.sort_by(|a, b| {
            b.combined_score
                .partial_cmp(&a.combined_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        hits.truncate(top_k);
        hits
    }
}

fn term_set(text: &str) -> HashSet<String> {
    text.to_lowercase()
        .split_whitespace()
        .map(str::to_string)
        .collect()
}

/// Fraction of `query_terms` that appear among the lowercase
/// whitespace-delimited terms of `text`; 0 when there are no query terms.
fn keyword_score(query_terms: &HashSet<String>, text: &str) -> f64 {
    if query_terms.is_empty() {
        return 0.0;
    }
    let text_terms = term_set(text);
    let overlap = query_terms.intersection(&text_terms).count();
    overlap as f64 / query_terms.len() as f64
}

/// Query-time options for [`SemanticSearch::search`].
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOptions {
    /// Number of results to return.
    pub top_k: usize,
    /// Re-rank with keyword overlap.
    pub use_hybrid: bool,
    /// Only consider chunks whose metadata matches every entry.
    pub filter_metadata: Option<Metadata>,
    /// Hybrid weights; ignored when `use_hybrid` is false.
    pub weights: HybridWeights,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            top_k: 10,
            use_hybrid: true,
            filter_metadata: None,
            weights: HybridWeights::default(),
        }
    }
}

impl SearchOptions {
    /// Options taken from the `[search]` configuration section.
    pub fn from_config(config: &SearchConfig) -> Self {
        Self {
            top_k: config.top_k,
            use_hybrid: config.use_hybrid,
            filter_metadata: None,
            weights: HybridWeights {
                semantic: config.semantic_weight,
                keyword: config.keyword_weight,
            },
        }
    }
}

/// Query facade: embeds the query, ranks, and formats results.
#[derive(Debug)]
pub struct SemanticSearch {
    index: SearchIndex,
    embedder: Embedder,
}

impl SemanticSearch {
    /// Search `index`, embedding queries with `embedder`.
    pub fn new(index: SearchIndex, embedder: Embedder) -> Self {
        Self { index, embedder }
    }

    /// The searched index.
    pub fn index(&self) -> &SearchIndex {
        &self.index
    }

    /// Run a query and format the results.
    ///
    /// In hybrid mode the score is the combined score; otherwise it is the
    /// rescaled similarity.
    pub async fn search(&self, query: &str, options: &SearchOptions) -> Vec<FormattedResult> {
        let query_vector = self.embedder.embed(query).await;
        let filter = options.filter_metadata.as_ref();

        let ranked: Vec<(Chunk, f64)> = if options.use_hybrid {
            HybridSearch::new(&self.index)
                .search(query, &query_vector, options.top_k, options.weights, filter)
                .into_iter()
                .map(|hit| (hit.chunk, hit.combined_score))
                .collect()
        } else {
            self.index
                .search(&query_vector, options.top_k, filter)
                .into_iter()
                .map(|hit| (hit.chunk, hit.similarity))
                .collect()
        };

        debug!("query {query:?} matched {} chunks", ranked.len());

        ranked
            .into_iter()
            .map(|(chunk, score)| FormattedResult {
                highlight: highlight(&chunk.text, query),
                text: chunk.text,
                score,
                metadata: chunk.metadata,
            })
            .collect()
    }
}

/// Load the index at `index_path` and run a hybrid query against it.
///
/// # Errors
///
/// Returns [`DocaiError::IndexNotFound`] if no index has been built at
/// `index_path`, or the error from [`SearchIndex::load`].
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use std::sync::Arc;
/// use docai_core::OfflineProvider;
/// use docai_search::search::search_documents;
///
/// # async fn example() {
/// let provider = Arc::new(OfflineProvider::default());
/// let results = search_documents(
///     "configure navigation",
///     Path::new(".ai-cache/search_index.json"),
///     provider,
///     None,
///     5,
/// )
/// .await
/// .unwrap();
/// for result in results {
///     println!("{:.3} {}", result.score, result.highlight);
/// }
/// # }
/// ```
pub async fn search_documents(
    query: &str,
    index_path: &Path,
    provider: Arc<dyn Provider>,
    cache: Option<Arc<dyn Cache>>,
    top_k: usize,
) -> Result<Vec<FormattedResult>, DocaiError> {
    if !index_path.exists() {
        return Err(DocaiError::IndexNotFound(index_path.to_path_buf()));
    }
    let index = SearchIndex::open(index_path)?;
    let search = SemanticSearch::new(index, Embedder::new(provider, cache));

    let options = SearchOptions {
        top_k,
        ..SearchOptions::default()
    };
    Ok(search.search(query, &options).await)
}

/// Snippet of `text` around the first case-insensitive occurrence of any
/// query term.
///
/// Keeps 50 characters before the match and 200 from it onward, marking
/// truncated ends with `...`. Without a match, the first 200 characters.
///
/// # Examples
///
/// ```
/// use docai_search::search::highlight;
///
/// assert_eq!(highlight("The quick brown fox jumps", "BROWN"), "The quick brown fox jumps");
///
/// let long = format!("{}needle{}", "a".repeat(60), "b".repeat(300));
/// let snippet = highlight(&long, "needle");
/// assert!(snippet.starts_with("...aaaa"));
/// assert!(snippet.ends_with("b..."));
/// ```
pub fn highlight(text: &str, query: &str) -> String {
    let chars: Vec<char> = text.chars().collect();

    let first = query
        .split_whitespace()
        .map(lowercase_chars)
        .filter_map(|term| find_case_insensitive(text, &term))
        .min();

    let Some(pos) = first else {
        let mut snippet: String = chars.iter().take(HIGHLIGHT_LENGTH).collect();
        if chars.len() > HIGHLIGHT_LENGTH {
            snippet.push_str(ELLIPSIS);
        }
        return snippet;
    };

    let start = pos.saturating_sub(HIGHLIGHT_BEFORE);
    let end = (pos + HIGHLIGHT_LENGTH).min(chars.len());

    let mut snippet = String::new();
    if start > 0 {
        snippet.push_str(ELLIPSIS);
    }
    snippet.extend(&chars[start..end]);
    if end < chars.len() {
        snippet.push_str(ELLIPSIS);
    }
    snippet
}

/// Lowercase one character at a time, ignoring context-sensitive mappings
/// such as word-final sigma, so terms and text fold identically.
fn lowercase_chars(s: &str) -> String {
    s.chars().flat_map(char::to_lowercase).collect()
}

/// Character index in `text` where `term` (folded by [`lowercase_chars`])
/// first occurs in the per-character lowercased text.
fn find_case_insensitive(text: &str, term: &str) -> Option<usize> {
    let mut lowered = String::with_capacity(text.len());
    // Byte offset in `lowered` -> char index in `text`.
    let mut origin = Vec::with_capacity(text.len());
    for (char_idx, c) in text.chars().enumerate() {
        for lower in c.to_lowercase() {
            let before = lowered.len();
            lowered.push(lower);
            origin.extend(std::iter::repeat(char_idx).take(lowered.len() - before));
        }
    }
    lowered.find(term).map(|byte| origin[byte])
}
