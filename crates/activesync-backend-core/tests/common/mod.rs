//! In-memory reference backend used to exercise the adapter contract.

#![allow(dead_code)]

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use activesync_backend_core::{
    AncillaryBackend, BackendContext, BackendError, ChangeOutcome, ChangeQuery, ChangesBackend,
    CollectionClass, CollectionOptions, DeviceContext, FolderObject, FolderStat, FolderType,
    HierarchyBackend, MessageBackend, MessageFlags, MessageObject, MessageStat, SessionBackend,
    SpecialFolder, StateKey, StateStore, ROOT_PARENT,
};
use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// State store backed by a mutex-guarded map.
#[derive(Default)]
pub struct MapStore {
    blobs: Mutex<HashMap<StateKey, Vec<u8>>>,
}

impl MapStore {
    pub fn put_raw(&self, key: &StateKey, blob: &[u8]) {
        self.blobs.lock().unwrap().insert(key.clone(), blob.to_vec());
    }
}

#[async_trait]
impl StateStore for MapStore {
    async fn load(&self, key: &StateKey) -> Result<Option<Vec<u8>>, BackendError> {
        Ok(self.blobs.lock().unwrap().get(key).cloned())
    }

    async fn save(&self, key: &StateKey, blob: &[u8]) -> Result<(), BackendError> {
        self.blobs.lock().unwrap().insert(key.clone(), blob.to_vec());
        Ok(())
    }

    async fn remove(&self, key: &StateKey) -> Result<bool, BackendError> {
        Ok(self.blobs.lock().unwrap().remove(key).is_some())
    }
}

struct Item {
    object: MessageObject,
    stat: MessageStat,
    modified_at: DateTime<Utc>,
    revision: u32,
}

struct Folder {
    object: FolderObject,
    items: BTreeMap<String, Item>,
    /// Deleted ids with their deletion time.
    tombstones: Vec<(String, DateTime<Utc>)>,
}

#[derive(Default)]
struct Inner {
    folders: BTreeMap<String, Folder>,
    clock: i64,
    next_id: u64,
    last_options: Option<CollectionOptions>,
}

impl Inner {
    fn tick(&mut self) -> DateTime<Utc> {
        self.clock += 10;
        ts(self.clock)
    }

    fn folder_mut(&mut self, id: &str) -> Result<&mut Folder, BackendError> {
        self.folders
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(format!("folder {}", id)))
    }
}

/// A backend keeping folders and items in memory, with a logical clock
/// advancing ten seconds per mutation.
pub struct MemoryBackend {
    context: BackendContext,
    inner: Mutex<Inner>,
}

impl MemoryBackend {
    pub fn new(context: BackendContext) -> Self {
        Self {
            context,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn with_store(store: Arc<dyn StateStore>) -> Self {
        Self::new(BackendContext::builder().state(store).build().unwrap())
    }

    pub fn now(&self) -> DateTime<Utc> {
        ts(self.inner.lock().unwrap().clock)
    }

    pub fn add_folder(&self, id: &str, name: &str, folder_type: FolderType) {
        let mut inner = self.inner.lock().unwrap();
        inner.folders.insert(
            id.to_string(),
            Folder {
                object: FolderObject {
                    server_id: id.to_string(),
                    parent_id: ROOT_PARENT.to_string(),
                    display_name: name.to_string(),
                    folder_type,
                },
                items: BTreeMap::new(),
                tombstones: Vec::new(),
            },
        );
    }

    pub fn rename_folder(&self, id: &str, name: &str) {
        let mut inner = self.inner.lock().unwrap();
        inner.folders.get_mut(id).unwrap().object.display_name = name.to_string();
    }

    /// Add an item with a plain text body, returning its id.
    pub fn add_item(&self, folder_id: &str, text: &str) -> String {
        let mut inner = self.inner.lock().unwrap();
        inner.next_id += 1;
        let id = format!("item-{}", inner.next_id);
        let at = inner.tick();
        let folder = inner.folder_mut(folder_id).unwrap();
        let object = MessageObject::new(folder.object.class()).with_property("text", text);
        folder.items.insert(
            id.clone(),
            Item {
                object,
                stat: MessageStat::new(&id, "1", MessageFlags::default()),
                modified_at: at,
                revision: 1,
            },
        );
        id
    }

    /// Server side edit bumping the item's signature.
    pub fn touch_item(&self, folder_id: &str, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        let at = inner.tick();
        let item = inner.folder_mut(folder_id).unwrap().items.get_mut(id).unwrap();
        item.revision += 1;
        item.stat.modification = item.revision.to_string();
        item.modified_at = at;
    }

    pub fn remove_item(&self, folder_id: &str, id: &str) {
        let mut inner = self.inner.lock().unwrap();
        let at = inner.tick();
        let folder = inner.folder_mut(folder_id).unwrap();
        folder.items.remove(id);
        folder.tombstones.push((id.to_string(), at));
    }

    /// Options passed to the most recent `get_message`.
    pub fn last_options(&self) -> Option<CollectionOptions> {
        self.inner.lock().unwrap().last_options.clone()
    }
}

#[async_trait]
impl SessionBackend for MemoryBackend {
    fn context(&self) -> &BackendContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut BackendContext {
        &mut self.context
    }
}

#[async_trait]
impl HierarchyBackend for MemoryBackend {
    async fn get_folder_list(&self) -> Result<Vec<FolderStat>, BackendError> {
        self.context.user()?;
        let inner = self.inner.lock().unwrap();
        Ok(inner.folders.values().map(|f| f.object.stat()).collect())
    }

    async fn get_folder(&self, id: &str) -> Result<FolderObject, BackendError> {
        self.context.user()?;
        let inner = self.inner.lock().unwrap();
        inner
            .folders
            .get(id)
            .map(|f| f.object.clone())
            .ok_or_else(|| BackendError::NotFound(format!("folder {}", id)))
    }

    async fn get_folders(&self) -> Result<Vec<FolderObject>, BackendError> {
        let inner = self.inner.lock().unwrap();
        Ok(inner.folders.values().map(|f| f.object.clone()).collect())
    }

    async fn stat_folder(&self, id: &str) -> Result<FolderStat, BackendError> {
        self.get_folder(id).await.map(|f| f.stat())
    }
}

#[async_trait]
impl ChangesBackend for MemoryBackend {
    async fn get_server_changes(
        &self,
        folder_id: &str,
        query: &ChangeQuery,
    ) -> Result<Vec<String>, BackendError> {
        self.context.user()?;
        let inner = self.inner.lock().unwrap();
        let folder = inner
            .folders
            .get(folder_id)
            .ok_or_else(|| BackendError::NotFound(format!("folder {}", folder_id)))?;
        let live = folder
            .items
            .iter()
            .map(|(id, item)| (id.clone(), item.modified_at));
        let dead = folder.tombstones.iter().cloned();
        Ok(query.select_changes(live.chain(dead)))
    }

    async fn stat_message(&self, folder_id: &str, id: &str) -> Result<MessageStat, BackendError> {
        self.context.user()?;
        let inner = self.inner.lock().unwrap();
        inner
            .folders
            .get(folder_id)
            .and_then(|f| f.items.get(id))
            .map(|item| {
                let flags = MessageFlags::read(item.stat.flags.read);
                MessageStat::new(id, item.stat.modification.clone(), flags)
            })
            .ok_or_else(|| BackendError::NotFound(format!("item {}", id)))
    }

    async fn stat_mail_message(
        &self,
        folder_id: &str,
        id: &str,
    ) -> Result<MessageStat, BackendError> {
        self.context.user()?;
        let inner = self.inner.lock().unwrap();
        inner
            .folders
            .get(folder_id)
            .and_then(|f| f.items.get(id))
            .map(|item| item.stat.clone())
            .ok_or_else(|| BackendError::NotFound(format!("item {}", id)))
    }
}

#[async_trait]
impl MessageBackend for MemoryBackend {
    async fn get_message(
        &self,
        folder_id: &str,
        id: &str,
        options: &CollectionOptions,
    ) -> Result<MessageObject, BackendError> {
        self.context.user()?;
        let mut inner = self.inner.lock().unwrap();
        inner.last_options = Some(options.clone());
        let item = inner
            .folders
            .get(folder_id)
            .and_then(|f| f.items.get(id))
            .ok_or_else(|| BackendError::NotFound(format!("item {}", id)))?;

        let mut object = item.object.clone();
        if let Some(text) = object.property("text").and_then(|v| v.as_str()).map(str::to_string) {
            if let Some(body_type) = options.preferred_body_type() {
                let pref = options.body_prefs.get(&body_type).cloned().unwrap_or_default();
                object.body = Some(pref.truncate(body_type, &text));
            }
        }
        object.flags = Some(item.stat.flags);
        Ok(object)
    }

    async fn change_message(
        &self,
        folder_id: &str,
        id: Option<&str>,
        message: &MessageObject,
        _device: &DeviceContext,
    ) -> Result<ChangeOutcome, BackendError> {
        let mut inner = self.inner.lock().unwrap();
        let at = inner.tick();
        let id = match id {
            Some(id) => id.to_string(),
            None => {
                inner.next_id += 1;
                format!("item-{}", inner.next_id)
            }
        };
        let folder = inner.folder_mut(folder_id)?;
        let stat = match folder.items.get_mut(&id) {
            Some(item) => {
                item.revision += 1;
                item.stat.modification = item.revision.to_string();
                item.object = message.clone();
                item.modified_at = at;
                item.stat.clone()
            }
            None if message.property("readonly").is_some() => return Ok(ChangeOutcome::Rejected),
            None => {
                let stat = MessageStat::new(&id, "1", MessageFlags::default());
                folder.items.insert(
                    id.clone(),
                    Item {
                        object: message.clone(),
                        stat: stat.clone(),
                        modified_at: at,
                        revision: 1,
                    },
                );
                stat
            }
        };
        Ok(ChangeOutcome::Applied(stat))
    }

    async fn delete_message(&self, folder_id: &str, ids: &[String]) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().unwrap();
        let at = inner.tick();
        let folder = inner.folder_mut(folder_id)?;
        for id in ids {
            if folder.items.remove(id).is_some() {
                folder.tombstones.push((id.clone(), at));
            }
        }
        Ok(())
    }

    async fn set_read_flag(
        &self,
        folder_id: &str,
        id: &str,
        read: bool,
    ) -> Result<(), BackendError> {
        let mut inner = self.inner.lock().unwrap();
        let at = inner.tick();
        let item = inner
            .folder_mut(folder_id)?
            .items
            .get_mut(id)
            .ok_or_else(|| BackendError::NotFound(format!("item {}", id)))?;
        item.stat.flags.read = read;
        item.modified_at = at;
        Ok(())
    }
}

#[async_trait]
impl AncillaryBackend for MemoryBackend {
    async fn get_special_folder_name_by_type(
        &self,
        folder: SpecialFolder,
    ) -> Result<String, BackendError> {
        let inner = self.inner.lock().unwrap();
        inner
            .folders
            .values()
            .find(|f| f.object.folder_type == folder.folder_type())
            .map(|f| f.object.display_name.clone())
            .ok_or_else(|| BackendError::NotFound(format!("special folder {:?}", folder)))
    }

    async fn get_waste_basket(
        &self,
        class: CollectionClass,
    ) -> Result<Option<String>, BackendError> {
        if class != CollectionClass::Email {
            return Ok(None);
        }
        let inner = self.inner.lock().unwrap();
        Ok(inner
            .folders
            .values()
            .find(|f| f.object.folder_type == FolderType::Wastebasket)
            .map(|f| f.object.server_id.clone()))
    }
}

/// A backend that opts into nothing beyond the required operations.
pub struct MinimalBackend {
    pub context: BackendContext,
}

#[async_trait]
impl SessionBackend for MinimalBackend {
    fn context(&self) -> &BackendContext {
        &self.context
    }

    fn context_mut(&mut self) -> &mut BackendContext {
        &mut self.context
    }
}

#[async_trait]
impl AncillaryBackend for MinimalBackend {}
