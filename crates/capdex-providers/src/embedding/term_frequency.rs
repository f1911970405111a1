//! Deterministic term-frequency fallback embedder
//!
//! Used when the primary transformer model cannot be loaded. Builds a
//! TF-IDF weighting from the registry corpus at construction time and
//! projects token weights into the configured dimensionality through a
//! fixed random projection seeded from configuration. Equal configuration
//! and corpus always produce bit-identical vectors, across processes.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use sha2::{Digest, Sha256};
use std::collections::HashMap;

use capdex_domain::error::Result;
use capdex_domain::normalize::{normalize_text, tokenize};
use capdex_domain::ports::{EmbeddingBackend, EmbeddingProvider};
use capdex_domain::value_objects::Embedding;

/// Term-frequency fallback embedding provider
pub struct TermFrequencyEmbedder {
    dimensions: usize,
    seed: u64,
    /// token -> inverse document frequency, fitted on the corpus
    idf: HashMap<String, f64>,
    /// IDF assigned to tokens outside the fitted vocabulary
    default_idf: f64,
    model_id: String,
}

impl TermFrequencyEmbedder {
    /// Fit the embedder on a document corpus.
    ///
    /// `corpus` is the set of embedding documents currently in the registry;
    /// an empty corpus is accepted and yields pure hashed-TF behavior.
    pub fn fit(corpus: &[String], dimensions: usize, seed: u64) -> Self {
        let mut document_frequency: HashMap<String, usize> = HashMap::new();
        for doc in corpus {
            let mut seen: Vec<String> = tokenize(&normalize_text(doc));
            seen.sort();
            seen.dedup();
            for token in seen {
                *document_frequency.entry(token).or_insert(0) += 1;
            }
        }

        let n = corpus.len().max(1) as f64;
        let idf = document_frequency
            .into_iter()
            .map(|(token, df)| (token, (1.0 + n / (1.0 + df as f64)).ln()))
            .collect();

        Self {
            dimensions,
            seed,
            idf,
            default_idf: (1.0 + n).ln(),
            model_id: format!("tf-fallback-{dimensions}d-s{seed}"),
        }
    }

    /// Deterministic projection row for one token.
    ///
    /// Rows are generated lazily from a per-token seed, so the projection
    /// matrix is never materialized.
    fn projection_row(&self, token: &str) -> Vec<f32> {
        let digest = Sha256::digest(token.as_bytes());
        let token_seed = u64::from_le_bytes(
            digest[..8]
                .try_into()
                .unwrap_or([0u8; 8]),
        );
        let mut rng = StdRng::seed_from_u64(self.seed ^ token_seed);
        (0..self.dimensions)
            .map(|_| rng.gen::<f32>() * 2.0 - 1.0)
            .collect()
    }

    fn embed_one(&self, text: &str) -> Embedding {
        let tokens = tokenize(&normalize_text(text));
        let mut term_frequency: HashMap<&str, f64> = HashMap::new();
        for token in &tokens {
            *term_frequency.entry(token.as_str()).or_insert(0.0) += 1.0;
        }

        let mut vector = vec![0.0f32; self.dimensions];
        for (token, tf) in term_frequency {
            let idf = self.idf.get(token).copied().unwrap_or(self.default_idf);
            let weight = (tf * idf) as f32;
            let row = self.projection_row(token);
            for (acc, r) in vector.iter_mut().zip(row.iter()) {
                *acc += weight * r;
            }
        }
        Embedding::l2_normalize(&mut vector);

        Embedding {
            vector,
            model: self.model_id.clone(),
            dimensions: self.dimensions,
        }
    }
}

#[async_trait]
impl EmbeddingProvider for TermFrequencyEmbedder {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Fallback
    }
}
