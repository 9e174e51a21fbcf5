//! Schema Registry Cache Library
//!
//! This library provides a permanent, disk-backed cache in front of a
//! Confluent-compatible schema registry, plus the HTTP pieces used by the
//! caching proxy binary.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod upstream;

pub use cache::CachingRegistry;
pub use error::{RegistryError, Result};
pub use upstream::{ConfluentClient, ConfluentConfig, SchemaId, SchemaRegistry};
