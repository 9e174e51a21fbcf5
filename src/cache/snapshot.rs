//! Snapshot Files
//!
//! Each cache keeps its full contents in one flat JSON object on disk.
//! Keys are always strings; values are whatever the cache stores.
//! Writes replace the whole file atomically via a temp file in the same
//! directory, so a reader never sees a half-written snapshot.

use crate::error::{RegistryError, Result};
use crate::upstream::SchemaId;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::hash::Hash;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

/// A cache key that can be written as a JSON object key
pub(crate) trait SnapshotKey: Sized {
    fn encode(&self) -> String;
    fn decode(raw: &str) -> Option<Self>;
}

impl SnapshotKey for SchemaId {
    fn encode(&self) -> String {
        self.to_string()
    }

    fn decode(raw: &str) -> Option<Self> {
        raw.parse().ok()
    }
}

/// `(subject, schema)` is written as the JSON array `["subject","schema"]`,
/// which keeps the key flat but never lets two pairs collide.
impl SnapshotKey for (String, String) {
    fn encode(&self) -> String {
        serde_json::to_string(&[&self.0, &self.1]).unwrap_or_default()
    }

    fn decode(raw: &str) -> Option<Self> {
        let [subject, schema]: [String; 2] = serde_json::from_str(raw).ok()?;
        Some((subject, schema))
    }
}

/// Location of one cache's snapshot file
#[derive(Debug, Clone)]
pub(crate) struct Snapshot {
    path: PathBuf,
}

impl Snapshot {
    pub fn new(dir: &Path, file_name: &str) -> Self {
        Self {
            path: dir.join(file_name),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot. A missing file is an empty map.
    pub async fn load<K, V>(&self) -> Result<HashMap<K, V>>
    where
        K: SnapshotKey + Eq + Hash,
        V: DeserializeOwned,
    {
        let path = self.path.clone();
        let content = tokio::task::spawn_blocking(move || fs::read_to_string(path)).await?;

        let content = match content {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No snapshot at {}, starting empty", self.path.display());
                return Ok(HashMap::new());
            }
            Err(e) => return Err(RegistryError::snapshot_read(&self.path, e)),
        };

        let raw: BTreeMap<String, V> = serde_json::from_str(&content)
            .map_err(|e| RegistryError::snapshot_read(&self.path, e))?;

        let mut entries = HashMap::with_capacity(raw.len());
        for (key, value) in raw {
            let decoded = K::decode(&key).ok_or_else(|| {
                RegistryError::snapshot_read(&self.path, format!("invalid key '{}'", key))
            })?;
            entries.insert(decoded, value);
        }

        debug!("Loaded {} entries from {}", entries.len(), self.path.display());
        Ok(entries)
    }

    /// Replace the snapshot with `entries`
    pub async fn store<K, V>(&self, entries: &HashMap<K, V>) -> Result<()>
    where
        K: SnapshotKey,
        V: Serialize,
    {
        let content = {
            let ordered: BTreeMap<String, &V> =
                entries.iter().map(|(k, v)| (k.encode(), v)).collect();
            serde_json::to_string_pretty(&ordered)
                .map_err(|e| RegistryError::snapshot_write(&self.path, e))?
        };

        let path = self.path.clone();
        tokio::task::spawn_blocking(move || write_atomic(&path, content.as_bytes()))
            .await?
            .map_err(|e| RegistryError::snapshot_write(&self.path, e))
    }
}

fn write_atomic(path: &Path, content: &[u8]) -> std::io::Result<()> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;

    let mut file = NamedTempFile::new_in(dir)?;
    file.write_all(content)?;
    file.as_file().sync_all()?;
    file.persist(path).map_err(|e| e.error)?;

    Ok(())
}
