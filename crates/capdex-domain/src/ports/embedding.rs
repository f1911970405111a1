//! Embedding provider port

use crate::error::Result;
use crate::value_objects::Embedding;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Which back-end family produced an embedding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmbeddingBackend {
    /// The configured transformer model
    Primary,
    /// The deterministic term-frequency fallback
    Fallback,
}

impl EmbeddingBackend {
    /// Wire-format string of this backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Fallback => "fallback",
        }
    }
}

/// Contract for embedding back-ends.
///
/// Implementations receive already-normalized text and return unit-L2-norm
/// vectors of a fixed dimension. `embed` has a default implementation that
/// delegates to `embed_batch`.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single normalized text
    async fn embed(&self, text: &str) -> Result<Embedding> {
        let embeddings = self.embed_batch(&[text.to_string()]).await?;
        embeddings
            .into_iter()
            .next()
            .ok_or_else(|| crate::error::Error::embedding("no embedding returned"))
    }

    /// Embed multiple normalized texts
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>>;

    /// Dimensionality of produced vectors
    fn dimensions(&self) -> usize;

    /// Identifier of the underlying model; persisted in index snapshots
    fn model_id(&self) -> &str;

    /// Which back-end family this provider is
    fn backend(&self) -> EmbeddingBackend;

    /// Probe the provider with a trivial embed
    async fn health_check(&self) -> Result<()> {
        self.embed("health check").await?;
        Ok(())
    }
}
