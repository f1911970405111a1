//! FastEmbed local embedding provider
//!
//! Implements the primary embedding back-end using the fastembed library for
//! local ONNX inference. The model is owned by an actor task so the session
//! is never shared across threads; callers talk to it over a channel.

use async_trait::async_trait;
use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};
use tokio::sync::{mpsc, oneshot};

use capdex_domain::error::{Error, Result};
use capdex_domain::ports::{EmbeddingBackend, EmbeddingProvider};
use capdex_domain::value_objects::Embedding;

use crate::constants::{EMBEDDING_DIMENSION_FASTEMBED_DEFAULT, FASTEMBED_ACTOR_QUEUE};

/// Messages for the FastEmbed actor
enum FastEmbedMessage {
    EmbedBatch {
        texts: Vec<String>,
        tx: oneshot::Sender<Result<Vec<Embedding>>>,
    },
}

/// FastEmbed local embedding provider using the actor pattern.
///
/// Initialization failure is surfaced to the caller so the bootstrap can
/// bind the fallback instead; once constructed, inference failures fail the
/// current request only.
pub struct FastEmbedProvider {
    sender: mpsc::Sender<FastEmbedMessage>,
    model_name: String,
    dimensions: usize,
}

impl FastEmbedProvider {
    /// Create a provider with the default model (AllMiniLML6V2)
    pub fn new() -> Result<Self> {
        Self::with_model(EmbeddingModel::AllMiniLML6V2, EMBEDDING_DIMENSION_FASTEMBED_DEFAULT)
    }

    /// Create a provider with a specific model and its dimensionality
    pub fn with_model(model: EmbeddingModel, dimensions: usize) -> Result<Self> {
        let model_name = format!("{model:?}");
        let init_options = InitOptions::new(model);
        let text_embedding = TextEmbedding::try_new(init_options).map_err(|e| {
            Error::embedding(format!("failed to initialize fastembed model: {e}"))
        })?;

        let (tx, rx) = mpsc::channel(FASTEMBED_ACTOR_QUEUE);
        let mut actor = FastEmbedActor {
            receiver: rx,
            model: text_embedding,
            model_name: model_name.clone(),
        };
        tokio::spawn(async move {
            actor.run().await;
        });

        Ok(Self {
            sender: tx,
            model_name,
            dimensions,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for FastEmbedProvider {
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Embedding>> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(FastEmbedMessage::EmbedBatch {
                texts: texts.to_vec(),
                tx,
            })
            .await
            .map_err(|_| Error::embedding("fastembed actor channel closed"))?;

        rx.await
            .unwrap_or_else(|_| Err(Error::embedding("fastembed actor closed")))
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_id(&self) -> &str {
        &self.model_name
    }

    fn backend(&self) -> EmbeddingBackend {
        EmbeddingBackend::Primary
    }
}

impl Clone for FastEmbedProvider {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            model_name: self.model_name.clone(),
            dimensions: self.dimensions,
        }
    }
}

/// Internal actor that owns the ONNX session
struct FastEmbedActor {
    receiver: mpsc::Receiver<FastEmbedMessage>,
    model: TextEmbedding,
    model_name: String,
}

impl FastEmbedActor {
    async fn run(&mut self) {
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                FastEmbedMessage::EmbedBatch { texts, tx } => {
                    let text_refs: Vec<&str> = texts.iter().map(String::as_str).collect();
                    let result = match self.model.embed(text_refs, None) {
                        Ok(rows) => Ok(rows
                            .into_iter()
                            .map(|mut v| {
                                Embedding::l2_normalize(&mut v);
                                let dimensions = v.len();
                                Embedding {
                                    vector: v,
                                    model: self.model_name.clone(),
                                    dimensions,
                                }
                            })
                            .collect()),
                        Err(e) => Err(Error::embedding(format!("fastembed inference failed: {e}"))),
                    };
                    let _ = tx.send(result);
                }
            }
        }
    }
}
