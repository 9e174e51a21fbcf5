use super::snapshot::{Snapshot, SnapshotKey};
use crate::error::Result;
use serde::{de::DeserializeOwned, Serialize};
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use tokio::sync::Mutex;
use tracing::{debug, info};

struct TierState<K, V> {
    entries: HashMap<K, V>,
    /// Snapshot has been merged into `entries`
    loaded: bool,
}

/// One insert-only key/value cache with an optional snapshot file.
///
/// The mutex is held from the memory lookup through the snapshot write,
/// so concurrent misses on the same key resolve upstream once.
pub(crate) struct Tier<K, V> {
    name: &'static str,
    snapshot: Option<Snapshot>,
    state: Mutex<TierState<K, V>>,
}

impl<K, V> Tier<K, V>
where
    K: SnapshotKey + Eq + Hash + Send + Sync,
    V: Serialize + DeserializeOwned + Clone + Send + Sync,
{
    pub fn new(name: &'static str, snapshot: Option<Snapshot>) -> Self {
        Self {
            name,
            snapshot,
            state: Mutex::new(TierState {
                entries: HashMap::new(),
                loaded: false,
            }),
        }
    }

    /// Return the cached value for `key`, calling `resolve` only when neither
    /// memory nor the snapshot has it.
    pub async fn get_or_resolve<F, Fut>(&self, key: K, resolve: F) -> Result<V>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V>> + Send,
    {
        let mut state = self.state.lock().await;

        if let Some(value) = state.entries.get(&key) {
            debug!("{}: cache hit", self.name);
            return Ok(value.clone());
        }

        if !state.loaded {
            if let Some(snapshot) = &self.snapshot {
                let stored: HashMap<K, V> = snapshot.load().await?;
                for (k, v) in stored {
                    state.entries.entry(k).or_insert(v);
                }
                debug!(
                    "{}: loaded snapshot {} ({} entries)",
                    self.name,
                    snapshot.path().display(),
                    state.entries.len()
                );
            }
            state.loaded = true;

            if let Some(value) = state.entries.get(&key) {
                debug!("{}: snapshot hit", self.name);
                return Ok(value.clone());
            }
        }

        let value = resolve().await?;
        state.entries.insert(key, value.clone());
        info!("{}: cached new entry from upstream", self.name);

        if let Some(snapshot) = &self.snapshot {
            snapshot.store(&state.entries).await?;
            debug!(
                "{}: wrote {} entries to {}",
                self.name,
                state.entries.len(),
                snapshot.path().display()
            );
        }

        Ok(value)
    }
}
