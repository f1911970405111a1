//! Null embedding provider for wiring tests

use async_trait::async_trait;
use capdex_domain::error::Result;
use capdex_domain::ports::{EmbeddingBackend, EmbeddingProvider};
use capdex_domain::value_objects::Embedding;

/// Returns a fixed basis vector for any input. Test use only.
pub struct NullEmbeddingProvider {
    dimensions: usize,
}

impl NullEmbeddingProvider {
    /// Create a null provider with the given dimensionality
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts
            .iter()
            .map(|_| {
                let mut vector = vec![0.0; self.dimensions];
                if let Some(first) = vector.first_mut() {
                    *first = 1.0;
                }
                Embedding {
                    vector,
                    model: "null".to_string(),
                    dimensions: self.dimensions,
                }
            })
            .collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        "null"
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Fallback
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_text_maps_to_the_same_basis_vector() {
        let provider = NullEmbeddingProvider::new(4);
        let a = provider.embed("one").await.unwrap();
        let b = provider.embed("completely different").await.unwrap();
        assert_eq!(a.vector, vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(a.vector, b.vector);
        assert_eq!(provider.dimensions(), 4);
    }
}
