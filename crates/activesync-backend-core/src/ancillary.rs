//! Types for the leaf operations: search, meetings, mail submission,
//! settings and autodiscover.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::folder::FolderType;

/// Reply to a meeting request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MeetingAnswer {
    Accepted,
    Tentative,
    Declined,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingResponse {
    /// Folder holding the meeting request.
    pub folder_id: String,
    /// Id of the meeting request item.
    pub request_id: String,
    pub answer: MeetingAnswer,
    /// Occurrence being answered, for recurring meetings.
    #[serde(default)]
    pub instance_id: Option<DateTime<Utc>>,
}

/// Where a search runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchStore {
    Mailbox,
    /// Global address list.
    Gal,
    DocumentLibrary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery {
    pub store: SearchStore,
    pub query: String,
    /// Restrict a mailbox search to one folder.
    #[serde(default)]
    pub folder_id: Option<String>,
    /// Zero-based, inclusive result range.
    pub range: (u32, u32),
    #[serde(default)]
    pub deep_traversal: bool,
}

impl SearchQuery {
    pub fn page_size(&self) -> usize {
        (self.range.1.saturating_sub(self.range.0) as usize) + 1
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Id usable with `item_operations_mailbox` or as a GAL entry key.
    pub long_id: String,
    #[serde(default)]
    pub folder_id: Option<String>,
    pub properties: BTreeMap<String, serde_json::Value>,
}

/// Result of a search, paged with the query's range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResults {
    pub rows: Vec<SearchResult>,
    /// Total matches, of which `rows` is the requested range.
    pub total: u32,
}

/// Outgoing mail handed to `send_mail`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    /// Full RFC 822 message.
    pub raw: Vec<u8>,
    pub save_in_sent: bool,
    pub kind: SendKind,
}

/// How an outgoing message relates to an existing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendKind {
    New,
    Reply { folder_id: String, item_id: String },
    Forward { folder_id: String, item_id: String },
}

/// Special folders a backend may name for the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpecialFolder {
    Inbox,
    Drafts,
    Wastebasket,
    Sent,
    Outbox,
}

impl SpecialFolder {
    pub fn folder_type(&self) -> FolderType {
        match self {
            Self::Inbox => FolderType::Inbox,
            Self::Drafts => FolderType::Drafts,
            Self::Wastebasket => FolderType::Wastebasket,
            Self::Sent => FolderType::SentMail,
            Self::Outbox => FolderType::Outbox,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OofState {
    Disabled,
    Global,
    TimeBased,
}

/// Out of office configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutOfOffice {
    pub state: OofState,
    #[serde(default)]
    pub start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end: Option<DateTime<Utc>>,
    #[serde(default)]
    pub internal_message: Option<String>,
    #[serde(default)]
    pub external_message: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserInformation {
    pub emails: Vec<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

/// Hardware and software details reported by a device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInformation {
    pub model: Option<String>,
    pub imei: Option<String>,
    pub friendly_name: Option<String>,
    pub os: Option<String>,
    pub os_language: Option<String>,
    pub phone_number: Option<String>,
    pub user_agent: Option<String>,
    pub mobile_operator: Option<String>,
}

/// Which settings a `get_settings` call asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SettingsRequest {
    pub oof: bool,
    pub user_information: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oof: Option<OutOfOffice>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_information: Option<UserInformation>,
}

/// Values a device pushes through `set_settings`.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct SettingsUpdate {
    pub oof: Option<OutOfOffice>,
    pub device_information: Option<DeviceInformation>,
    /// Recovery password escrowed by the device.
    pub device_password: Option<String>,
}

impl fmt::Debug for SettingsUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsUpdate")
            .field("oof", &self.oof)
            .field("device_information", &self.device_information)
            .field(
                "device_password",
                &self.device_password.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Per setting outcome of `set_settings`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingStatus {
    Success,
    Denied,
    Invalid,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOutcome {
    pub oof: Option<SettingStatus>,
    pub device_information: Option<SettingStatus>,
    pub device_password: Option<SettingStatus>,
}

/// Autodiscover answer for an email address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutodiscoverResult {
    pub display_name: String,
    pub email: String,
    /// Endpoint the device should sync against.
    pub url: String,
}
