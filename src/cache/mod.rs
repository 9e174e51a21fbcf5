//! Caching Registry
//!
//! Schema registry mappings never change once created, so every answer the
//! upstream gives is kept forever: in memory, and optionally on disk so that
//! the next process starts warm.
//!
//! Directory structure (when a disk path is configured):
//! ```text
//! {disk_path}/
//!   ├── schemas_by_id.json   # {"<id>": "<schema>"}
//!   └── ids_by_schema.json   # {"[\"<subject>\",\"<schema>\"]": <id>}
//! ```

mod snapshot;
mod tier;

use crate::error::Result;
use crate::upstream::{SchemaId, SchemaRegistry};
use async_trait::async_trait;
use snapshot::Snapshot;
use std::path::{Path, PathBuf};
use tier::Tier;
use tracing::info;

pub const SCHEMAS_BY_ID_FILE: &str = "schemas_by_id.json";
pub const IDS_BY_SCHEMA_FILE: &str = "ids_by_schema.json";

/// Read-through, write-through cache in front of another registry
pub struct CachingRegistry<U> {
    upstream: U,
    schemas_by_id: Tier<SchemaId, String>,
    ids_by_schema: Tier<(String, String), SchemaId>,
}

impl<U: SchemaRegistry> CachingRegistry<U> {
    /// Memory-only cache; never touches the filesystem
    pub fn new(upstream: U) -> Self {
        Self::build(upstream, None)
    }

    /// Cache persisted under `disk_path`
    pub fn with_disk_path(upstream: U, disk_path: impl AsRef<Path>) -> Self {
        Self::build(upstream, Some(disk_path.as_ref().to_path_buf()))
    }

    fn build(upstream: U, disk_path: Option<PathBuf>) -> Self {
        match &disk_path {
            Some(path) => info!("Schema cache persisted under {}", path.display()),
            None => info!("Schema cache running in memory only"),
        }

        let snapshot = |file_name: &'static str| {
            disk_path
                .as_deref()
                .map(|dir| Snapshot::new(dir, file_name))
        };

        Self {
            schemas_by_id: Tier::new("schemas_by_id", snapshot(SCHEMAS_BY_ID_FILE)),
            ids_by_schema: Tier::new("ids_by_schema", snapshot(IDS_BY_SCHEMA_FILE)),
            upstream,
        }
    }
}

#[async_trait]
impl<U: SchemaRegistry> SchemaRegistry for CachingRegistry<U> {
    async fn fetch(&self, id: SchemaId) -> Result<String> {
        self.schemas_by_id
            .get_or_resolve(id, || self.upstream.fetch(id))
            .await
    }

    async fn register(&self, subject: &str, schema: &str) -> Result<SchemaId> {
        let key = (subject.to_string(), schema.to_string());
        self.ids_by_schema
            .get_or_resolve(key, || self.upstream.register(subject, schema))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegistryError;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Upstream stand-in that counts every call it receives
    #[derive(Default)]
    struct FakeRegistry {
        schemas: HashMap<SchemaId, String>,
        ids: HashMap<(String, String), SchemaId>,
        delay: Option<Duration>,
        fetch_calls: AtomicUsize,
        register_calls: AtomicUsize,
    }

    impl FakeRegistry {
        fn with_schema(mut self, id: u32, schema: &str) -> Self {
            self.schemas.insert(SchemaId(id), schema.to_string());
            self
        }

        fn with_id(mut self, subject: &str, schema: &str, id: u32) -> Self {
            self.ids
                .insert((subject.to_string(), schema.to_string()), SchemaId(id));
            self
        }

        fn fetches(&self) -> usize {
            self.fetch_calls.load(Ordering::SeqCst)
        }

        fn registrations(&self) -> usize {
            self.register_calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SchemaRegistry for FakeRegistry {
        async fn fetch(&self, id: SchemaId) -> Result<String> {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            match id.0 {
                503 => Err(RegistryError::Transport {
                    cause: "connection refused".to_string(),
                }),
                _ => self
                    .schemas
                    .get(&id)
                    .cloned()
                    .ok_or(RegistryError::SchemaNotFound { id }),
            }
        }

        async fn register(&self, subject: &str, schema: &str) -> Result<SchemaId> {
            self.register_calls.fetch_add(1, Ordering::SeqCst);
            self.ids
                .get(&(subject.to_string(), schema.to_string()))
                .copied()
                .ok_or_else(|| RegistryError::InvalidSchema {
                    subject: subject.to_string(),
                    cause: "unknown schema".to_string(),
                })
        }
    }

    fn read_json(path: &Path) -> Value {
        serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_fetch_writes_through_to_disk() {
        let temp_dir = TempDir::new().unwrap();
        let upstream = Arc::new(FakeRegistry::default().with_schema(42, "schemaA"));
        let registry = CachingRegistry::with_disk_path(upstream.clone(), temp_dir.path());

        assert_eq!(registry.fetch(SchemaId(42)).await.unwrap(), "schemaA");
        assert_eq!(registry.fetch(SchemaId(42)).await.unwrap(), "schemaA");

        assert_eq!(upstream.fetches(), 1);
        assert_eq!(
            read_json(&temp_dir.path().join(SCHEMAS_BY_ID_FILE)),
            json!({ "42": "schemaA" })
        );
        assert!(!temp_dir.path().join(IDS_BY_SCHEMA_FILE).exists());
    }

    #[tokio::test]
    async fn test_fetch_uses_preloaded_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        let snapshot_path = temp_dir.path().join(SCHEMAS_BY_ID_FILE);
        let before = json!({ "7": "schemaB" }).to_string();
        fs::write(&snapshot_path, &before).unwrap();

        let upstream = Arc::new(FakeRegistry::default());
        let registry = CachingRegistry::with_disk_path(upstream.clone(), temp_dir.path());

        assert_eq!(registry.fetch(SchemaId(7)).await.unwrap(), "schemaB");
        assert_eq!(registry.fetch(SchemaId(7)).await.unwrap(), "schemaB");

        assert_eq!(upstream.fetches(), 0);
        assert_eq!(fs::read_to_string(&snapshot_path).unwrap(), before);
    }

    #[tokio::test]
    async fn test_fetch_appends_to_existing_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(SCHEMAS_BY_ID_FILE),
            json!({ "7": "schemaB" }).to_string(),
        )
        .unwrap();

        let upstream = Arc::new(FakeRegistry::default().with_schema(8, "schemaC"));
        let registry = CachingRegistry::with_disk_path(upstream.clone(), temp_dir.path());

        assert_eq!(registry.fetch(SchemaId(8)).await.unwrap(), "schemaC");
        assert_eq!(registry.fetch(SchemaId(8)).await.unwrap(), "schemaC");

        assert_eq!(upstream.fetches(), 1);
        assert_eq!(
            read_json(&temp_dir.path().join(SCHEMAS_BY_ID_FILE)),
            json!({ "7": "schemaB", "8": "schemaC" })
        );
    }

    #[tokio::test]
    async fn test_register_writes_through_to_disk() {
        let temp_dir = TempDir::new().unwrap();
        let upstream = Arc::new(
            FakeRegistry::default()
                .with_id("orders", "schemaC", 99)
                .with_id("billing", "schemaC", 100),
        );
        let registry = CachingRegistry::with_disk_path(upstream.clone(), temp_dir.path());

        assert_eq!(registry.register("orders", "schemaC").await.unwrap(), SchemaId(99));
        assert_eq!(registry.register("orders", "schemaC").await.unwrap(), SchemaId(99));
        assert_eq!(upstream.registrations(), 1);
        assert_eq!(
            read_json(&temp_dir.path().join(IDS_BY_SCHEMA_FILE)),
            json!({ r#"["orders","schemaC"]"#: 99 })
        );

        // Same document under another subject is a separate entry
        assert_eq!(registry.register("billing", "schemaC").await.unwrap(), SchemaId(100));
        assert_eq!(upstream.registrations(), 2);
        assert_eq!(
            read_json(&temp_dir.path().join(IDS_BY_SCHEMA_FILE)),
            json!({
                r#"["orders","schemaC"]"#: 99,
                r#"["billing","schemaC"]"#: 100,
            })
        );
        assert!(!temp_dir.path().join(SCHEMAS_BY_ID_FILE).exists());
    }

    #[tokio::test]
    async fn test_register_uses_preloaded_snapshot() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join(IDS_BY_SCHEMA_FILE),
            json!({ r#"["a_subject","{\"type\":\"string\"}"]"#: 5 }).to_string(),
        )
        .unwrap();

        let upstream = Arc::new(FakeRegistry::default());
        let registry = CachingRegistry::with_disk_path(upstream.clone(), temp_dir.path());

        let id = registry
            .register("a_subject", r#"{"type":"string"}"#)
            .await
            .unwrap();
        assert_eq!(id, SchemaId(5));
        assert_eq!(upstream.registrations(), 0);
    }

    #[tokio::test]
    async fn test_concatenation_collisions_stay_distinct() {
        let upstream = Arc::new(
            FakeRegistry::default()
                .with_id("ab", "c", 1)
                .with_id("a", "bc", 2),
        );
        let registry = CachingRegistry::new(upstream.clone());

        assert_eq!(registry.register("ab", "c").await.unwrap(), SchemaId(1));
        assert_eq!(registry.register("a", "bc").await.unwrap(), SchemaId(2));
        assert_eq!(upstream.registrations(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_survives_new_instance() {
        let temp_dir = TempDir::new().unwrap();
        let upstream = Arc::new(
            FakeRegistry::default()
                .with_schema(1, "one")
                .with_schema(2, "two")
                .with_id("orders", "one", 1),
        );

        {
            let registry = CachingRegistry::with_disk_path(upstream.clone(), temp_dir.path());
            registry.fetch(SchemaId(1)).await.unwrap();
            registry.fetch(SchemaId(2)).await.unwrap();
            registry.register("orders", "one").await.unwrap();
        }
        assert_eq!(upstream.fetches(), 2);
        assert_eq!(upstream.registrations(), 1);

        let restarted = CachingRegistry::with_disk_path(upstream.clone(), temp_dir.path());
        assert_eq!(restarted.fetch(SchemaId(1)).await.unwrap(), "one");
        assert_eq!(restarted.fetch(SchemaId(2)).await.unwrap(), "two");
        assert_eq!(restarted.register("orders", "one").await.unwrap(), SchemaId(1));

        assert_eq!(upstream.fetches(), 2);
        assert_eq!(upstream.registrations(), 1);
    }

    #[tokio::test]
    async fn test_memory_only_cache() {
        let upstream = Arc::new(FakeRegistry::default().with_schema(1, "one"));
        let registry = CachingRegistry::new(upstream.clone());

        assert_eq!(registry.fetch(SchemaId(1)).await.unwrap(), "one");
        assert_eq!(registry.fetch(SchemaId(1)).await.unwrap(), "one");
        assert_eq!(upstream.fetches(), 1);
    }

    #[tokio::test]
    async fn test_errors_are_not_cached() {
        let upstream = Arc::new(FakeRegistry::default());
        let registry = CachingRegistry::new(upstream.clone());

        for _ in 0..2 {
            let err = registry.fetch(SchemaId(404)).await.unwrap_err();
            assert!(matches!(err, RegistryError::SchemaNotFound { .. }));
        }
        assert_eq!(upstream.fetches(), 2);

        let err = registry.fetch(SchemaId(503)).await.unwrap_err();
        assert!(matches!(err, RegistryError::Transport { .. }));

        let err = registry.register("orders", "bad").await.unwrap_err();
        assert!(matches!(err, RegistryError::InvalidSchema { .. }));
    }

    #[tokio::test]
    async fn test_malformed_snapshot_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join(SCHEMAS_BY_ID_FILE), "[1, 2").unwrap();

        let upstream = Arc::new(FakeRegistry::default().with_schema(1, "one"));
        let registry = CachingRegistry::with_disk_path(upstream.clone(), temp_dir.path());

        let err = registry.fetch(SchemaId(1)).await.unwrap_err();
        assert!(matches!(err, RegistryError::SnapshotRead { .. }));
        assert_eq!(upstream.fetches(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_keeps_entry_in_memory() {
        let temp_dir = TempDir::new().unwrap();
        let cache_dir = temp_dir.path().join("cache");
        fs::create_dir_all(&cache_dir).unwrap();
        fs::write(
            cache_dir.join(SCHEMAS_BY_ID_FILE),
            json!({ "1": "one" }).to_string(),
        )
        .unwrap();

        let upstream = Arc::new(FakeRegistry::default().with_schema(2, "two"));
        let registry = CachingRegistry::with_disk_path(upstream.clone(), &cache_dir);
        assert_eq!(registry.fetch(SchemaId(1)).await.unwrap(), "one");

        // Replace the cache directory with a plain file so the write fails
        fs::remove_dir_all(&cache_dir).unwrap();
        fs::write(&cache_dir, "not a directory").unwrap();

        let err = registry.fetch(SchemaId(2)).await.unwrap_err();
        assert!(matches!(err, RegistryError::SnapshotWrite { .. }));

        assert_eq!(registry.fetch(SchemaId(2)).await.unwrap(), "two");
        assert_eq!(upstream.fetches(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_misses_call_upstream_once() {
        let temp_dir = TempDir::new().unwrap();
        let upstream = Arc::new(FakeRegistry {
            delay: Some(Duration::from_millis(20)),
            ..FakeRegistry::default().with_schema(42, "schemaA")
        });
        let registry = Arc::new(CachingRegistry::with_disk_path(
            upstream.clone(),
            temp_dir.path(),
        ));

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let registry = registry.clone();
                tokio::spawn(async move { registry.fetch(SchemaId(42)).await })
            })
            .collect();

        for handle in handles {
            assert_eq!(handle.await.unwrap().unwrap(), "schemaA");
        }
        assert_eq!(upstream.fetches(), 1);
    }

    #[tokio::test]
    async fn test_caches_can_be_stacked() {
        let upstream = Arc::new(FakeRegistry::default().with_schema(1, "one"));
        let inner = CachingRegistry::new(upstream.clone());
        let outer = CachingRegistry::new(inner);

        assert_eq!(outer.fetch(SchemaId(1)).await.unwrap(), "one");
        assert_eq!(outer.fetch(SchemaId(1)).await.unwrap(), "one");
        assert_eq!(upstream.fetches(), 1);
    }
}
