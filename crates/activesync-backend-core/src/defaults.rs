//! Behaviors composed from the primitive backend operations.
//!
//! These are free functions over the capability traits rather than trait
//! methods, so a backend never has to inherit them to get them.

use futures::future::try_join_all;
use tracing::{debug, Instrument};

use crate::backend::{ChangesBackend, HierarchyBackend, MessageBackend};
use crate::body::CollectionOptions;
use crate::changes::ChangeQuery;
use crate::error::BackendError;
use crate::folder::{CollectionClass, FolderObject};
use crate::folder_state::{FolderState, ServerChanges};
use crate::message::MessageObject;

/// Retrieve an item in full, whatever truncation the caller asked for.
///
/// Like every helper here, fails with `InvalidArgument` until `setup` has
/// bound a user.
pub async fn fetch<B>(
    backend: &B,
    folder_id: &str,
    id: &str,
    mut options: CollectionOptions,
) -> Result<MessageObject, BackendError>
where
    B: MessageBackend + ?Sized,
{
    backend.context().user()?;
    options.force_full_retrieval();
    backend
        .get_message(folder_id, id, &options)
        .instrument(backend.context().logger().clone())
        .await
}

/// Every visible folder, built from `get_folder_list` and `get_folder`.
///
/// Produces exactly the folders `get_folder_list` reports. Backends that
/// can do better in bulk expose it through `get_folders`.
pub async fn get_hierarchy<B>(backend: &B) -> Result<Vec<FolderObject>, BackendError>
where
    B: HierarchyBackend + ?Sized,
{
    backend.context().user()?;
    let span = backend.context().logger().clone();
    async {
        let stats = backend.get_folder_list().await?;
        let folders = try_join_all(stats.iter().map(|stat| backend.get_folder(&stat.id))).await?;
        debug!("Built hierarchy of {} folder(s)", folders.len());
        Ok::<_, BackendError>(folders)
    }
    .instrument(span)
    .await
}

/// Ask the backend for the changes in `query` and stat each changed item.
///
/// Items that vanished between the two calls are reported as removed if
/// the device knows them. A ping query never advances the checkpoint since
/// its result is not the authoritative change set.
pub async fn gather_changes<B>(
    backend: &B,
    state: &FolderState,
    query: &ChangeQuery,
) -> Result<ServerChanges, BackendError>
where
    B: ChangesBackend + ?Sized,
{
    backend.context().user()?;
    let folder_id = state.server_id();
    let ids = backend.get_server_changes(folder_id, query).await?;

    let mut changes = ServerChanges {
        to: (!query.ping).then_some(query.to),
        ..Default::default()
    };

    for id in ids {
        let stat = if state.class() == CollectionClass::Email {
            backend.stat_mail_message(folder_id, &id).await
        } else {
            backend.stat_message(folder_id, &id).await
        };

        match stat {
            Ok(stat) => changes.stats.push(stat),
            Err(BackendError::NotFound(_)) => {
                if state.contains(&id) {
                    changes.removed.push(id);
                }
            }
            Err(e) => return Err(e),
        }
    }

    debug!(
        parent: backend.context().logger(),
        "Folder {}: {} changed, {} removed",
        folder_id,
        changes.stats.len(),
        changes.removed.len()
    );
    Ok(changes)
}
