//! Port traits
//!
//! Contracts the domain depends on, implemented by the provider and
//! infrastructure crates.
//!
//! | Port | Description |
//! |------|-------------|
//! | EmbeddingProvider | Text to unit-vector embedding back-ends |
//! | VectorIndexProvider | ANN structure over stable integer ids |
//! | CacheProvider | Embedding / response cache back-ends |
//! | RegistryReader | Consistent snapshots of the registry projection |
//! | FeedbackStore | Append-only search / selection log |

/// Cache provider port
pub mod cache;
/// Embedding provider port
pub mod embedding;
/// Feedback store port
pub mod feedback;
/// Snapshot persistence port
pub mod persistence;
/// Registry reader port
pub mod registry;
/// Vector index port
pub mod vector_index;

pub use cache::{CacheEntryConfig, CacheProvider};
pub use embedding::{EmbeddingBackend, EmbeddingProvider};
pub use feedback::FeedbackStore;
pub use persistence::SnapshotStore;
pub use registry::RegistryReader;
pub use vector_index::VectorIndexProvider;
