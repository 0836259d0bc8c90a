//! Per device, per folder change tracking.
//!
//! A [`FolderState`] caches the last stat of every item the device has been
//! told about. During a sync pass the engine reports what the backend says
//! changed; the state classifies each report against the cache, holds the
//! result as pending changes, and folds them into the cache on
//! [`FolderState::update_state`]. The whole value round-trips through
//! [`FolderState::serialize`] / [`FolderState::unserialize`] between passes.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::BackendError;
use crate::folder::CollectionClass;
use crate::message::{MessageFlags, MessageStat};
use crate::state::{StateKey, StateStore};

/// Version tag written into every serialized state.
pub const STATE_FORMAT_VERSION: u32 = 1;

/// Lifecycle of a folder state within one sync pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Constructed, nothing loaded yet.
    Uninitialized,
    /// Loaded from a prior pass or freshly created.
    Hydrated,
    /// Pending changes folded into the cache.
    Updated,
    /// Written out; the next pass hydrates from the blob.
    Serialized,
}

/// What the device last saw of an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSnapshot {
    #[serde(rename = "mod")]
    pub modification: String,
    pub flags: MessageFlags,
}

impl From<&MessageStat> for ItemSnapshot {
    fn from(stat: &MessageStat) -> Self {
        Self {
            modification: stat.modification.clone(),
            flags: stat.flags,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Added,
    Modified,
    /// Only the flags differ from the cached snapshot.
    Flags,
    Deleted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct PendingChange {
    kind: ChangeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    item: Option<ItemSnapshot>,
}

/// A batch of server side changes for one folder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ServerChanges {
    /// Current stats of items reported as changed.
    pub stats: Vec<MessageStat>,
    /// Ids reported as gone.
    pub removed: Vec<String>,
    /// End of the change window these were collected for.
    pub to: Option<DateTime<Utc>>,
}

/// Counts of what an `update_state` call folded in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateSummary {
    pub added: usize,
    pub modified: usize,
    pub flags: usize,
    pub deleted: usize,
}

impl UpdateSummary {
    pub fn total(&self) -> usize {
        self.added + self.modified + self.flags + self.deleted
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    server_id: String,
    class: CollectionClass,
    #[serde(default)]
    checkpoint: Option<DateTime<Utc>>,
    #[serde(default)]
    items: BTreeMap<String, ItemSnapshot>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pending: BTreeMap<String, PendingChange>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pending_checkpoint: Option<DateTime<Utc>>,
}

impl Snapshot {
    /// Every pending add or modify must carry the item it installs.
    fn check_pending(&self) -> Result<(), BackendError> {
        for (id, change) in &self.pending {
            if change.kind != ChangeKind::Deleted && change.item.is_none() {
                return Err(BackendError::CorruptState(format!(
                    "Pending {:?} change for {} carries no item",
                    change.kind, id
                )));
            }
        }
        Ok(())
    }
}

/// Change tracking state for one (device, folder, collection) triple.
///
/// Owned by exactly one sync pass at a time.
#[derive(Debug, Clone)]
pub struct FolderState {
    snapshot: Snapshot,
    phase: Phase,
}

/// Equality ignores the lifecycle phase: a state read back from its own
/// serialized form is equal to the state that wrote it.
impl PartialEq for FolderState {
    fn eq(&self, other: &Self) -> bool {
        self.snapshot == other.snapshot
    }
}

impl Eq for FolderState {}

impl FolderState {
    pub fn new(server_id: impl Into<String>, class: CollectionClass) -> Self {
        Self {
            snapshot: Snapshot {
                version: STATE_FORMAT_VERSION,
                server_id: server_id.into(),
                class,
                checkpoint: None,
                items: BTreeMap::new(),
                pending: BTreeMap::new(),
                pending_checkpoint: None,
            },
            phase: Phase::Uninitialized,
        }
    }

    /// An empty, hydrated state for a folder seen for the first time.
    pub fn fresh(server_id: impl Into<String>, class: CollectionClass) -> Self {
        let mut state = Self::new(server_id, class);
        state.phase = Phase::Hydrated;
        state
    }

    /// Load the prior pass's blob, or start empty when there is none.
    ///
    /// A blob written for a different folder or class is rejected as
    /// corrupt rather than silently adopted.
    pub fn hydrate(&mut self, prior: Option<&[u8]>) -> Result<(), BackendError> {
        if self.phase != Phase::Uninitialized {
            return Err(BackendError::InvalidArgument(format!(
                "Folder state for {} is already hydrated",
                self.snapshot.server_id
            )));
        }

        if let Some(blob) = prior {
            let loaded = Self::unserialize(blob)?;
            if loaded.snapshot.server_id != self.snapshot.server_id
                || loaded.snapshot.class != self.snapshot.class
            {
                return Err(BackendError::CorruptState(format!(
                    "State blob belongs to {} ({}), expected {} ({})",
                    loaded.snapshot.server_id,
                    loaded.snapshot.class,
                    self.snapshot.server_id,
                    self.snapshot.class
                )));
            }
            self.snapshot = loaded.snapshot;
        }

        self.phase = Phase::Hydrated;
        Ok(())
    }

    /// Rebuild a state from [`FolderState::serialize`] output.
    pub fn unserialize(blob: &[u8]) -> Result<Self, BackendError> {
        let snapshot: Snapshot = serde_json::from_slice(blob)
            .map_err(|e| BackendError::CorruptState(format!("Unreadable folder state: {}", e)))?;

        if snapshot.version != STATE_FORMAT_VERSION {
            return Err(BackendError::CorruptState(format!(
                "Unsupported folder state version {} (expected {})",
                snapshot.version, STATE_FORMAT_VERSION
            )));
        }
        snapshot.check_pending()?;

        Ok(Self {
            snapshot,
            phase: Phase::Hydrated,
        })
    }

    pub fn serialize(&mut self) -> Result<Vec<u8>, BackendError> {
        self.require_loaded("serialize")?;
        let blob = serde_json::to_vec(&self.snapshot).map_err(|e| {
            BackendError::BackendFault(format!("Failed to serialize folder state: {}", e))
        })?;
        self.phase = Phase::Serialized;
        Ok(blob)
    }

    /// Load the state for `key`; a missing slot yields a fresh state.
    pub async fn restore(store: &dyn StateStore, key: &StateKey) -> Result<Self, BackendError> {
        let blob = store.load(key).await?;
        if blob.is_none() {
            debug!("No prior state for {}, starting fresh", key);
        }
        let mut state = Self::new(key.folder_id.clone(), key.class);
        if let Err(e) = state.hydrate(blob.as_deref()) {
            warn!("Discarding unusable state for {}: {}", key, e);
            return Err(e);
        }
        Ok(state)
    }

    pub async fn persist(
        &mut self,
        store: &dyn StateStore,
        key: &StateKey,
    ) -> Result<(), BackendError> {
        let blob = self.serialize()?;
        store.save(key, &blob).await?;
        debug!(
            "Persisted state for {} ({} items, {} bytes)",
            key,
            self.snapshot.items.len(),
            blob.len()
        );
        Ok(())
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn server_id(&self) -> &str {
        &self.snapshot.server_id
    }

    pub fn class(&self) -> CollectionClass {
        self.snapshot.class
    }

    /// End of the last change window folded in.
    pub fn checkpoint(&self) -> Option<DateTime<Utc>> {
        self.snapshot.checkpoint
    }

    pub fn get(&self, id: &str) -> Option<&ItemSnapshot> {
        self.snapshot.items.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.snapshot.items.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.snapshot.items.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.snapshot.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshot.items.is_empty()
    }

    /// Changes waiting for the next `update_state`.
    pub fn pending(&self) -> impl Iterator<Item = (&str, ChangeKind)> {
        self.snapshot
            .pending
            .iter()
            .map(|(id, change)| (id.as_str(), change.kind))
    }

    pub fn has_pending(&self) -> bool {
        !self.snapshot.pending.is_empty()
    }

    /// Classify reported server changes against the cache.
    ///
    /// Stats identical to the cached snapshot are dropped, so reporting the
    /// same batch twice never double counts. A later report for an id
    /// supersedes an earlier pending one.
    ///
    /// # Returns
    /// The number of pending entries this call created or altered.
    pub fn set_changes(&mut self, changes: ServerChanges) -> Result<usize, BackendError> {
        self.require_mutable("set_changes")?;
        let mut touched = 0;

        for stat in &changes.stats {
            let kind = match self.snapshot.items.get(&stat.id) {
                None => Some(ChangeKind::Added),
                Some(cached) if cached.modification != stat.modification => {
                    Some(ChangeKind::Modified)
                }
                Some(cached) if cached.flags != stat.flags => Some(ChangeKind::Flags),
                Some(_) => None,
            };

            match kind {
                Some(kind) => {
                    let change = PendingChange {
                        kind,
                        item: Some(stat.into()),
                    };
                    if self.snapshot.pending.get(&stat.id) != Some(&change) {
                        self.snapshot.pending.insert(stat.id.clone(), change);
                        touched += 1;
                    }
                }
                None => {
                    if self.snapshot.pending.remove(&stat.id).is_some() {
                        touched += 1;
                    }
                }
            }
        }

        for id in changes.removed {
            if self.snapshot.items.contains_key(&id) {
                let change = PendingChange {
                    kind: ChangeKind::Deleted,
                    item: None,
                };
                if self.snapshot.pending.get(&id) != Some(&change) {
                    self.snapshot.pending.insert(id, change);
                    touched += 1;
                }
            } else if self.snapshot.pending.remove(&id).is_some() {
                // Added and removed within the same pass: the device never saw it.
                touched += 1;
            }
        }

        if let Some(to) = changes.to {
            self.snapshot.pending_checkpoint = self.snapshot.pending_checkpoint.max(Some(to));
        }

        debug!(
            "Folder {}: {} pending change(s) after {} stat(s)",
            self.snapshot.server_id,
            self.snapshot.pending.len(),
            changes.stats.len()
        );
        Ok(touched)
    }

    /// Diff a complete listing of the folder against the cache.
    ///
    /// Cached ids absent from `current` are reported as deleted.
    pub fn diff_full(
        &mut self,
        current: Vec<MessageStat>,
        to: Option<DateTime<Utc>>,
    ) -> Result<usize, BackendError> {
        let removed = {
            let present: HashSet<&str> = current.iter().map(|stat| stat.id.as_str()).collect();
            self.snapshot
                .items
                .keys()
                .filter(|id| !present.contains(id.as_str()))
                .cloned()
                .collect()
        };
        self.set_changes(ServerChanges {
            stats: current,
            removed,
            to,
        })
    }

    /// Fold pending changes into the cache and clear them.
    ///
    /// Calling this again with nothing pending changes nothing.
    pub fn update_state(&mut self) -> Result<UpdateSummary, BackendError> {
        self.require_mutable("update_state")?;
        self.snapshot.check_pending()?;
        let mut summary = UpdateSummary::default();

        for (id, change) in std::mem::take(&mut self.snapshot.pending) {
            match (change.kind, change.item) {
                (ChangeKind::Deleted, _) => {
                    self.snapshot.items.remove(&id);
                    summary.deleted += 1;
                }
                (kind, Some(item)) => {
                    self.snapshot.items.insert(id, item);
                    match kind {
                        ChangeKind::Added => summary.added += 1,
                        ChangeKind::Modified => summary.modified += 1,
                        _ => summary.flags += 1,
                    }
                }
                // Ruled out by check_pending
                (_, None) => {}
            }
        }

        if let Some(to) = self.snapshot.pending_checkpoint.take() {
            self.snapshot.checkpoint = self.snapshot.checkpoint.max(Some(to));
        }

        self.phase = Phase::Updated;
        if summary.total() > 0 {
            debug!(
                "Folder {} updated: +{} ~{} flags:{} -{}",
                self.snapshot.server_id,
                summary.added,
                summary.modified,
                summary.flags,
                summary.deleted
            );
        }
        Ok(summary)
    }

    /// Record a device-originated edit so it is not echoed back.
    pub fn acknowledge(&mut self, stat: &MessageStat) -> Result<(), BackendError> {
        self.require_mutable("acknowledge")?;
        self.snapshot.pending.remove(&stat.id);
        self.snapshot.items.insert(stat.id.clone(), stat.into());
        Ok(())
    }

    /// Record a device-originated delete.
    pub fn forget(&mut self, id: &str) -> Result<bool, BackendError> {
        self.require_mutable("forget")?;
        self.snapshot.pending.remove(id);
        Ok(self.snapshot.items.remove(id).is_some())
    }

    fn require_loaded(&self, operation: &str) -> Result<(), BackendError> {
        if self.phase == Phase::Uninitialized {
            return Err(BackendError::InvalidArgument(format!(
                "{} called on folder state {} before hydration",
                operation, self.snapshot.server_id
            )));
        }
        Ok(())
    }

    fn require_mutable(&self, operation: &str) -> Result<(), BackendError> {
        self.require_loaded(operation)?;
        if self.phase == Phase::Serialized {
            return Err(BackendError::InvalidArgument(format!(
                "{} called on folder state {} after it was serialized",
                operation, self.snapshot.server_id
            )));
        }
        Ok(())
    }
}
