use activesync_backend_core::{BackendError, StateKey, StateStore};
use async_trait::async_trait;
use dashmap::DashMap;
use tracing::{debug, instrument};

/// Folder state kept in process memory.
///
/// Each slot is replaced wholesale under the map's shard lock, so readers
/// never observe a partial write. Nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryStateStore {
    blobs: DashMap<StateKey, Vec<u8>>,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys stored for a device, sorted.
    pub fn list(&self, device_id: &str) -> Vec<StateKey> {
        let mut keys: Vec<StateKey> = self
            .blobs
            .iter()
            .filter(|entry| entry.key().device_id == device_id)
            .map(|entry| entry.key().clone())
            .collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

#[async_trait]
impl StateStore for MemoryStateStore {
    #[instrument(skip(self), level = "debug")]
    async fn load(&self, key: &StateKey) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.blobs.get(key).map(|blob| blob.value().clone()))
    }

    #[instrument(skip(self, blob), level = "debug", fields(blob_len = blob.len()))]
    async fn save(&self, key: &StateKey, blob: &[u8]) -> Result<(), BackendError> {
        self.blobs.insert(key.clone(), blob.to_vec());
        debug!("Stored {} bytes for {}", blob.len(), key);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove(&self, key: &StateKey) -> Result<bool, BackendError> {
        Ok(self.blobs.remove(key).is_some())
    }
}
