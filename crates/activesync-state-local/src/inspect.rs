//! Read-only views and resets over a `FileStateStore`.

use std::fmt;

use activesync_backend_core::{BackendError, FolderState, StateKey, StateStore};
use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::store::FileStateStore;

/// One line of `list` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateSummary {
    pub key: StateKey,
    pub items: usize,
    pub pending: bool,
    pub checkpoint: Option<DateTime<Utc>>,
}

impl fmt::Display for StateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}\t{} item(s)", self.key, self.items)?;
        match self.checkpoint {
            Some(at) => write!(f, "\tcheckpoint {}", at.to_rfc3339())?,
            None => write!(f, "\tno checkpoint")?,
        }
        if self.pending {
            write!(f, "\tpending changes")?;
        }
        Ok(())
    }
}

/// Summaries of every state stored for `device_id`.
///
/// Slots that fail to parse are logged and skipped so one bad file does not
/// hide the rest.
pub async fn summarize(
    store: &FileStateStore,
    device_id: &str,
) -> Result<Vec<StateSummary>, BackendError> {
    let mut summaries = Vec::new();
    for key in store.list(device_id).await? {
        let Some(blob) = store.load(&key).await? else {
            continue;
        };
        match FolderState::unserialize(&blob) {
            Ok(state) => summaries.push(StateSummary {
                items: state.len(),
                pending: state.has_pending(),
                checkpoint: state.checkpoint(),
                key,
            }),
            Err(e) => warn!("Skipping {}: {}", key, e),
        }
    }
    Ok(summaries)
}

/// Stored state for `key` rendered as pretty JSON.
///
/// Fails with `CorruptState` when the blob is not a valid folder state.
pub async fn show(store: &dyn StateStore, key: &StateKey) -> Result<Option<String>, BackendError> {
    let Some(blob) = store.load(key).await? else {
        return Ok(None);
    };
    FolderState::unserialize(&blob)?;

    let value: serde_json::Value = serde_json::from_slice(&blob)
        .map_err(|e| BackendError::CorruptState(format!("{}: {}", key, e)))?;
    serde_json::to_string_pretty(&value)
        .map(Some)
        .map_err(|e| BackendError::BackendFault(e.to_string()))
}

/// Remove stored state, for one slot or every slot of the device.
///
/// # Returns
/// Number of slots removed.
pub async fn reset(
    store: &FileStateStore,
    device_id: &str,
    only: Option<StateKey>,
) -> Result<usize, BackendError> {
    let keys = match only {
        Some(key) => vec![key],
        None => store.list(device_id).await?,
    };

    let mut removed = 0;
    for key in keys {
        if store.remove(&key).await? {
            info!("Reset {}", key);
            removed += 1;
        }
    }
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use activesync_backend_core::{CollectionClass, MessageFlags, MessageStat, ServerChanges};
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    async fn seeded() -> (FileStateStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = FileStateStore::new(temp_dir.path());

        let inbox = StateKey::new("dev", "INBOX", CollectionClass::Email);
        let mut state = FolderState::fresh("INBOX", CollectionClass::Email);
        state
            .set_changes(ServerChanges {
                stats: vec![
                    MessageStat::new("1", "a", MessageFlags::default()),
                    MessageStat::new("2", "a", MessageFlags::default()),
                ],
                to: Some(DateTime::from_timestamp(1_700_000_000, 0).unwrap()),
                ..Default::default()
            })
            .unwrap();
        state.update_state().unwrap();
        state.persist(&store, &inbox).await.unwrap();

        let calendar = StateKey::new("dev", "cal", CollectionClass::Calendar);
        FolderState::fresh("cal", CollectionClass::Calendar)
            .persist(&store, &calendar)
            .await
            .unwrap();

        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_summarize() {
        let (store, _temp_dir) = seeded().await;
        let summaries = summarize(&store, "dev").await.unwrap();

        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].key.folder_id, "INBOX");
        assert_eq!(summaries[0].items, 2);
        assert!(!summaries[0].pending);
        assert!(summaries[0].checkpoint.is_some());
        assert_eq!(summaries[1].items, 0);
        assert!(summaries[1].to_string().contains("no checkpoint"));
    }

    #[tokio::test]
    async fn test_summarize_skips_corrupt() {
        let (store, _temp_dir) = seeded().await;
        let bad = StateKey::new("dev", "Notes", CollectionClass::Notes);
        store.save(&bad, b"not json").await.unwrap();

        let summaries = summarize(&store, "dev").await.unwrap();
        assert_eq!(summaries.len(), 2);
    }

    #[tokio::test]
    async fn test_show() {
        let (store, _temp_dir) = seeded().await;
        let key = StateKey::new("dev", "INBOX", CollectionClass::Email);

        let rendered = show(&store, &key).await.unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert_eq!(value["server_id"], "INBOX");

        let missing = StateKey::new("dev", "Trash", CollectionClass::Email);
        assert!(show(&store, &missing).await.unwrap().is_none());

        store.save(&missing, b"{}").await.unwrap();
        let err = show(&store, &missing).await.unwrap_err();
        assert!(matches!(err, BackendError::CorruptState(_)));
    }

    #[tokio::test]
    async fn test_reset_one_and_all() {
        let (store, _temp_dir) = seeded().await;

        let inbox = StateKey::new("dev", "INBOX", CollectionClass::Email);
        assert_eq!(reset(&store, "dev", Some(inbox.clone())).await.unwrap(), 1);
        assert_eq!(reset(&store, "dev", Some(inbox)).await.unwrap(), 0);

        assert_eq!(reset(&store, "dev", None).await.unwrap(), 1);
        assert!(store.list("dev").await.unwrap().is_empty());
    }
}
