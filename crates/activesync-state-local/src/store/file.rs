use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use activesync_backend_core::{BackendError, CollectionClass, StateKey, StateStore};
use async_trait::async_trait;
use fs2::FileExt;
use tracing::{debug, instrument, warn};

const STATE_EXTENSION: &str = "state";
const LOCK_EXTENSION: &str = "lock";
const TEMP_EXTENSION: &str = "state.tmp";

/// Folder state stored as one file per slot.
///
/// Layout under the root directory:
/// ```text
/// {hex(device_id)}/{class}/{hex(folder_id)}.state
/// ```
/// Ids are hex encoded so arbitrary server ids map to safe file names.
/// Writes go to a temp file renamed over the target while holding an
/// exclusive lock on the slot's `.lock` file; reads take a shared lock.
#[derive(Debug, Clone)]
pub struct FileStateStore {
    root: PathBuf,
}

impl FileStateStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn device_dir(&self, device_id: &str) -> PathBuf {
        self.root.join(hex::encode(device_id))
    }

    fn slot_path(&self, key: &StateKey, extension: &str) -> PathBuf {
        self.device_dir(&key.device_id)
            .join(key.class.as_str())
            .join(format!("{}.{}", hex::encode(&key.folder_id), extension))
    }

    /// Devices that have stored state.
    pub async fn list_devices(&self) -> Result<Vec<String>, BackendError> {
        let root = self.root.clone();
        blocking(move || {
            let mut devices = Vec::new();
            for entry in read_dir_if_exists(&root)? {
                let name = entry.file_name().to_string_lossy().to_string();
                match decode_component(&name) {
                    Some(device) => devices.push(device),
                    None => warn!("Skipping unexpected entry {} in state root", name),
                }
            }
            devices.sort();
            Ok(devices)
        })
        .await
    }

    /// Keys stored for one device, sorted.
    pub async fn list(&self, device_id: &str) -> Result<Vec<StateKey>, BackendError> {
        let device_dir = self.device_dir(device_id);
        let device_id = device_id.to_string();
        blocking(move || {
            let mut keys = Vec::new();
            for class_entry in read_dir_if_exists(&device_dir)? {
                let class_name = class_entry.file_name().to_string_lossy().to_string();
                let Ok(class) = class_name.parse::<CollectionClass>() else {
                    warn!("Skipping unknown class directory {}", class_name);
                    continue;
                };
                for entry in fs::read_dir(class_entry.path())? {
                    let path = entry?.path();
                    if path.extension().and_then(|e| e.to_str()) != Some(STATE_EXTENSION) {
                        continue;
                    }
                    let folder = path
                        .file_stem()
                        .and_then(|s| s.to_str())
                        .and_then(decode_component);
                    if let Some(folder_id) = folder {
                        keys.push(StateKey::new(device_id.clone(), folder_id, class));
                    }
                }
            }
            keys.sort();
            Ok(keys)
        })
        .await
    }
}

#[async_trait]
impl StateStore for FileStateStore {
    #[instrument(skip(self), level = "debug")]
    async fn load(&self, key: &StateKey) -> Result<Option<Vec<u8>>, BackendError> {
        let path = self.slot_path(key, STATE_EXTENSION);
        let lock_path = self.slot_path(key, LOCK_EXTENSION);

        blocking(move || {
            if !path.exists() {
                return Ok(None);
            }
            let lock = open_lock(&lock_path)?;
            FileExt::lock_shared(&lock)?;
            let result = match fs::read(&path) {
                Ok(blob) => Ok(Some(blob)),
                // Removed between the existence check and the lock
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(e) => Err(e),
            };
            FileExt::unlock(&lock)?;
            result
        })
        .await
    }

    #[instrument(skip(self, blob), level = "debug", fields(blob_len = blob.len()))]
    async fn save(&self, key: &StateKey, blob: &[u8]) -> Result<(), BackendError> {
        let path = self.slot_path(key, STATE_EXTENSION);
        let temp_path = self.slot_path(key, TEMP_EXTENSION);
        let lock_path = self.slot_path(key, LOCK_EXTENSION);
        let blob = blob.to_vec();
        let len = blob.len();

        blocking(move || {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            let lock = open_lock(&lock_path)?;
            FileExt::lock_exclusive(&lock)?;
            let result = fs::write(&temp_path, &blob).and_then(|_| fs::rename(&temp_path, &path));
            FileExt::unlock(&lock)?;
            result
        })
        .await?;

        debug!("Saved {} bytes of state for {}", len, key);
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn remove(&self, key: &StateKey) -> Result<bool, BackendError> {
        let path = self.slot_path(key, STATE_EXTENSION);
        let lock_path = self.slot_path(key, LOCK_EXTENSION);

        blocking(move || {
            if !path.exists() {
                return Ok(false);
            }
            let lock = open_lock(&lock_path)?;
            FileExt::lock_exclusive(&lock)?;
            let result = match fs::remove_file(&path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
                Err(e) => Err(e),
            };
            FileExt::unlock(&lock)?;
            result
        })
        .await
    }
}

/// Run blocking filesystem work off the async runtime.
async fn blocking<T, F>(work: F) -> Result<T, BackendError>
where
    F: FnOnce() -> io::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|e| BackendError::BackendFault(format!("State store task failed: {}", e)))?
        .map_err(|e| BackendError::BackendFault(format!("State store I/O failed: {}", e)))
}

fn open_lock(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
}

fn read_dir_if_exists(dir: &Path) -> io::Result<Vec<fs::DirEntry>> {
    match fs::read_dir(dir) {
        Ok(entries) => entries.collect(),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(e),
    }
}

fn decode_component(name: &str) -> Option<String> {
    hex::decode(name)
        .ok()
        .and_then(|bytes| String::from_utf8(bytes).ok())
}
