//! CAPDEX domain layer
//!
//! Core business types for the capability-discovery service: registry
//! entities, search value objects, registry mutation events, the error
//! taxonomy and the port traits implemented by the outer layers.
//!
//! This crate is dependency-light on purpose. Anything that talks to the
//! network, the filesystem or a model runtime lives behind the traits in
//! [`ports`].

/// Domain-wide default values and limits
pub mod constants;
/// Registry entities: services, tools, policies, identities
pub mod entities;
/// Error handling types
pub mod error;
/// Registry mutation events
pub mod events;
/// Query text normalization
pub mod normalize;
/// Port traits implemented by providers and infrastructure
pub mod ports;
/// Value objects shared across layers
pub mod value_objects;

pub use error::{Error, Result};
