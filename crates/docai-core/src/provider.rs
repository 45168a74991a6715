//! AI provider boundary.
//!
//! Concrete HTTP clients live outside this workspace; the search pipeline only
//! needs text generation and, when available, native embeddings.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DocaiError;

/// Text returned by [`Provider::generate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderResponse {
    /// Generated text.
    pub content: String,
}

/// An AI provider consumed by the embedder and enhancement components.
///
/// Implementations that expose an embedding model return `true` from
/// [`supports_embeddings`](Provider::supports_embeddings); the embedder reads
/// this once at construction and never probes again.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Model identifier, used to qualify cached responses.
    fn model(&self) -> &str;

    /// Generate text for `prompt` under `system_prompt`.
    async fn generate(
        &self,
        prompt: &str,
        system_prompt: &str,
        temperature: f64,
    ) -> Result<ProviderResponse, DocaiError>;

    /// Whether [`embed`](Provider::embed) is backed by a real embedding model.
    fn supports_embeddings(&self) -> bool {
        false
    }

    /// Produce an embedding for `text`.
    async fn embed(&self, _text: &str) -> Result<Vec<f32>, DocaiError> {
        Err(DocaiError::Unsupported(format!(
            "provider model '{}' has no embedding endpoint",
            self.model()
        )))
    }
}

/// A provider that never touches the network.
///
/// Has no embedding capability, so embedders built on it always use the
/// deterministic hash-based fallback. Useful for building indexes offline
/// and in tests.
///
/// # Examples
///
/// ```
/// use docai_core::{OfflineProvider, Provider};
///
/// let provider = OfflineProvider::new("local");
/// assert_eq!(provider.model(), "local");
/// assert!(!provider.supports_embeddings());
/// ```
#[derive(Debug, Clone)]
pub struct OfflineProvider {
    model: String,
}

impl OfflineProvider {
    /// Create an offline provider reporting `model` as its identifier.
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
        }
    }
}

impl Default for OfflineProvider {
    fn default() -> Self {
        Self::new("offline")
    }
}

#[async_trait]
impl Provider for OfflineProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(
        &self,
        _prompt: &str,
        _system_prompt: &str,
        _temperature: f64,
    ) -> Result<ProviderResponse, DocaiError> {
        Err(DocaiError::Unsupported(
            "offline provider cannot generate text".into(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn offline_provider_refuses_generation() {
        let provider = OfflineProvider::default();
        let result = provider.generate("hi", "be brief", 0.3).await;
        assert!(matches!(result, Err(DocaiError::Unsupported(_))));
    }

    #[tokio::test]
    async fn default_embed_is_unsupported() {
        let provider = OfflineProvider::new("m1");
        let err = provider.embed("text").await.unwrap_err().to_string();
        assert!(err.contains("m1"), "unexpected error: {err}");
    }

    #[test]
    fn response_serializes_content() {
        let response = ProviderResponse {
            content: "done".into(),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["content"], "done");
    }
}
