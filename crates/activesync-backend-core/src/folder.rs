//! Folder identity: collection classes, wire folder types, stats and
//! hierarchy entries.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::BackendError;

/// Parent id reported for top-level folders.
pub const ROOT_PARENT: &str = "0";

/// The data type a folder carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CollectionClass {
    Email,
    Contacts,
    Calendar,
    Tasks,
    Notes,
    Documents,
}

impl CollectionClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "Email",
            Self::Contacts => "Contacts",
            Self::Calendar => "Calendar",
            Self::Tasks => "Tasks",
            Self::Notes => "Notes",
            Self::Documents => "Documents",
        }
    }
}

impl fmt::Display for CollectionClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CollectionClass {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Email" => Ok(Self::Email),
            "Contacts" => Ok(Self::Contacts),
            "Calendar" => Ok(Self::Calendar),
            "Tasks" => Ok(Self::Tasks),
            "Notes" => Ok(Self::Notes),
            "Documents" => Ok(Self::Documents),
            other => Err(BackendError::InvalidArgument(format!(
                "Unknown collection class: {}",
                other
            ))),
        }
    }
}

/// Folder types as numbered on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum FolderType {
    Generic = 1,
    Inbox = 2,
    Drafts = 3,
    Wastebasket = 4,
    SentMail = 5,
    Outbox = 6,
    Tasks = 7,
    Calendar = 8,
    Contacts = 9,
    Notes = 10,
    Journal = 11,
    UserMail = 12,
    UserCalendar = 13,
    UserContacts = 14,
    UserTasks = 15,
    UserJournal = 16,
    UserNotes = 17,
    Unknown = 18,
    RecipientCache = 19,
}

impl FolderType {
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Collection class of items stored in folders of this type.
    pub fn collection_class(self) -> CollectionClass {
        match self {
            Self::Tasks | Self::UserTasks => CollectionClass::Tasks,
            Self::Calendar | Self::UserCalendar => CollectionClass::Calendar,
            Self::Contacts | Self::UserContacts | Self::RecipientCache => {
                CollectionClass::Contacts
            }
            Self::Notes | Self::UserNotes | Self::Journal | Self::UserJournal => {
                CollectionClass::Notes
            }
            _ => CollectionClass::Email,
        }
    }

    /// Whether this is one of the fixed, server-provided special folders.
    pub fn is_special(self) -> bool {
        !matches!(
            self,
            Self::Generic
                | Self::UserMail
                | Self::UserCalendar
                | Self::UserContacts
                | Self::UserTasks
                | Self::UserJournal
                | Self::UserNotes
                | Self::Unknown
        )
    }
}

impl TryFrom<u8> for FolderType {
    type Error = BackendError;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Ok(match code {
            1 => Self::Generic,
            2 => Self::Inbox,
            3 => Self::Drafts,
            4 => Self::Wastebasket,
            5 => Self::SentMail,
            6 => Self::Outbox,
            7 => Self::Tasks,
            8 => Self::Calendar,
            9 => Self::Contacts,
            10 => Self::Notes,
            11 => Self::Journal,
            12 => Self::UserMail,
            13 => Self::UserCalendar,
            14 => Self::UserContacts,
            15 => Self::UserTasks,
            16 => Self::UserJournal,
            17 => Self::UserNotes,
            18 => Self::Unknown,
            19 => Self::RecipientCache,
            other => {
                return Err(BackendError::InvalidArgument(format!(
                    "Unknown folder type code: {}",
                    other
                )))
            }
        })
    }
}

/// Cheap hierarchy fingerprint of a folder.
///
/// `modification` is opaque to callers; it changes if and only if the
/// folder's observable metadata (its display name) changed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderStat {
    pub id: String,
    pub parent: String,
    #[serde(rename = "mod")]
    pub modification: String,
}

impl FolderStat {
    pub fn new(
        id: impl Into<String>,
        parent: impl Into<String>,
        modification: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            parent: parent.into(),
            modification: modification.into(),
        }
    }

    /// Build a stat whose signature is derived from the display name.
    pub fn for_display_name(
        id: impl Into<String>,
        parent: impl Into<String>,
        display_name: &str,
    ) -> Self {
        Self::new(id, parent, Self::signature_for(display_name))
    }

    /// Derive the opaque modification signature for a display name.
    pub fn signature_for(display_name: &str) -> String {
        let digest = Sha256::digest(display_name.as_bytes());
        hex::encode(&digest[..8])
    }

    pub fn is_top_level(&self) -> bool {
        self.parent == ROOT_PARENT
    }
}

/// Full folder metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderObject {
    pub server_id: String,
    pub parent_id: String,
    pub display_name: String,
    pub folder_type: FolderType,
}

impl FolderObject {
    pub fn class(&self) -> CollectionClass {
        self.folder_type.collection_class()
    }

    /// The stat this folder would report through `stat_folder`.
    pub fn stat(&self) -> FolderStat {
        FolderStat::for_display_name(&self.server_id, &self.parent_id, &self.display_name)
    }
}
