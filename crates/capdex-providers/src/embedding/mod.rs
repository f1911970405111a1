//! Embedding providers
//!
//! The primary back-end wraps a local transformer model; the fallback is a
//! deterministic term-frequency embedder fitted on the registry corpus. The
//! bootstrap decides which one a process binds; the pipeline never swaps
//! back-ends mid-flight.

#[cfg(feature = "embedding-fastembed")]
mod fastembed;
mod null;
mod term_frequency;

#[cfg(feature = "embedding-fastembed")]
pub use fastembed::FastEmbedProvider;
pub use null::NullEmbeddingProvider;
pub use term_frequency::TermFrequencyEmbedder;
