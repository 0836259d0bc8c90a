use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::folder::CollectionClass;

/// Identifies one persisted folder state slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct StateKey {
    pub device_id: String,
    pub folder_id: String,
    pub class: CollectionClass,
}

impl StateKey {
    pub fn new(
        device_id: impl Into<String>,
        folder_id: impl Into<String>,
        class: CollectionClass,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            folder_id: folder_id.into(),
            class,
        }
    }
}

impl fmt::Display for StateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.device_id, self.class, self.folder_id)
    }
}

/// Durable storage for serialized folder state.
///
/// Implementations must replace a slot atomically: a `load` racing a `save`
/// of the same key sees either the old or the new blob, never a mix.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the blob stored for `key`, `None` when nothing was saved yet.
    async fn load(&self, key: &StateKey) -> Result<Option<Vec<u8>>, BackendError>;

    /// Replace the blob stored for `key`.
    async fn save(&self, key: &StateKey, blob: &[u8]) -> Result<(), BackendError>;

    /// Drop the blob for `key` so the next pass starts from scratch.
    ///
    /// # Returns
    /// Whether a blob existed.
    async fn remove(&self, key: &StateKey) -> Result<bool, BackendError>;
}
