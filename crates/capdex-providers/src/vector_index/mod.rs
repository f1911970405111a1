//! Vector index providers

mod in_memory;

pub use in_memory::InMemoryVectorIndex;
