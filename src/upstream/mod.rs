//! Upstream Registry
//!
//! The contract every schema registry backend satisfies, whether it is the
//! remote Confluent service or a cache sitting in front of it.

mod confluent;

pub use confluent::{ConfluentClient, ConfluentConfig};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identifier assigned by the registry to a schema document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(pub u32);

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SchemaId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        s.parse().map(SchemaId)
    }
}

impl From<u32> for SchemaId {
    fn from(id: u32) -> Self {
        SchemaId(id)
    }
}

/// A schema registry: resolves ids to documents and registers documents
/// under subjects.
#[async_trait]
pub trait SchemaRegistry: Send + Sync {
    /// Fetch the schema document bound to `id`
    async fn fetch(&self, id: SchemaId) -> Result<String>;

    /// Register `schema` under `subject`, returning the assigned id
    async fn register(&self, subject: &str, schema: &str) -> Result<SchemaId>;
}

#[async_trait]
impl<T: SchemaRegistry + ?Sized> SchemaRegistry for std::sync::Arc<T> {
    async fn fetch(&self, id: SchemaId) -> Result<String> {
        (**self).fetch(id).await
    }

    async fn register(&self, subject: &str, schema: &str) -> Result<SchemaId> {
        (**self).register(subject, schema).await
    }
}
