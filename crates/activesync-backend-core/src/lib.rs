//! Backend adapter contract and per-folder change tracking for ActiveSync
//! servers.
//!
//! This crate defines what a data store must provide for a protocol engine
//! to synchronize devices against it:
//! - `SessionBackend`, `HierarchyBackend`, `ChangesBackend`,
//!   `MessageBackend`, `AncillaryBackend`: the capability traits, together
//!   forming `Backend`
//! - `FolderState`: the resumable per device, per folder change tracker
//! - `StateStore`: durable storage for serialized folder state
//! - `BackendContext`: collaborators, configuration and session identity
//! - `defaults`: `fetch`, `get_hierarchy` and `gather_changes` composed
//!   from the primitive operations

mod ancillary;
mod backend;
mod body;
mod changes;
mod config;
mod context;
pub mod defaults;
mod error;
mod folder;
mod folder_state;
mod message;
mod policy;
mod session;
mod state;

pub use ancillary::{
    AutodiscoverResult, DeviceInformation, MeetingAnswer, MeetingResponse, OofState,
    OutOfOffice, OutgoingMail, SearchQuery, SearchResult, SearchResults, SearchStore, SendKind,
    SettingStatus, Settings, SettingsOutcome, SettingsRequest, SettingsUpdate, SpecialFolder,
    UserInformation,
};
pub use backend::{
    AncillaryBackend, Backend, ChangesBackend, HierarchyBackend, MessageBackend, SessionBackend,
};
pub use body::{
    add_default_body_pref_truncation, fill_body_pref_truncation, Body, BodyPreference,
    BodyPreferences, BodyType, CollectionOptions, MimeSupport, DEFAULT_TRUNCATION_SIZE,
    NO_TRUNCATION,
};
pub use changes::ChangeQuery;
pub use config::{BackendConfig, HeartbeatCheck, HeartbeatConfig};
pub use context::{BackendContext, BackendContextBuilder};
pub use error::{BackendError, ErrorKind, Result};
pub use folder::{CollectionClass, FolderObject, FolderStat, FolderType, ROOT_PARENT};
pub use folder_state::{
    ChangeKind, FolderState, ItemSnapshot, Phase, ServerChanges, UpdateSummary,
    STATE_FORMAT_VERSION,
};
pub use message::{Attachment, ChangeOutcome, MessageFlags, MessageObject, MessageStat};
pub use policy::{PolicyName, PolicyOverrides, PolicySet, PolicyValue};
pub use session::{DeviceContext, ProtocolVersion, SessionContext};
pub use state::{StateKey, StateStore};
