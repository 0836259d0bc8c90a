use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::body::Body;
use crate::folder::CollectionClass;

/// Per item flags tracked alongside the modification signature.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageFlags {
    pub read: bool,
    /// Mail only: follow-up flag set.
    #[serde(default)]
    pub flagged: bool,
    /// Mail only: replied to.
    #[serde(default)]
    pub answered: bool,
    /// Mail only: forwarded.
    #[serde(default)]
    pub forwarded: bool,
}

impl MessageFlags {
    pub fn read(read: bool) -> Self {
        Self {
            read,
            ..Default::default()
        }
    }
}

/// Cheap fingerprint of an item inside a folder.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageStat {
    pub id: String,
    #[serde(rename = "mod")]
    pub modification: String,
    pub flags: MessageFlags,
}

impl MessageStat {
    pub fn new(
        id: impl Into<String>,
        modification: impl Into<String>,
        flags: MessageFlags,
    ) -> Self {
        Self {
            id: id.into(),
            modification: modification.into(),
            flags,
        }
    }
}

/// In-memory shape of an item handed to (or parsed from) the wire codec.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageObject {
    pub class: CollectionClass,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    /// Remaining class specific properties keyed by their wire tag name.
    #[serde(default)]
    pub properties: BTreeMap<String, serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flags: Option<MessageFlags>,
}

impl MessageObject {
    pub fn new(class: CollectionClass) -> Self {
        Self {
            class,
            body: None,
            properties: BTreeMap::new(),
            flags: None,
        }
    }

    pub fn with_body(mut self, body: Body) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_property(
        mut self,
        name: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&serde_json::Value> {
        self.properties.get(name)
    }
}

/// Raw attachment content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Outcome of `change_message`: the new stat, or a business-level rejection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeOutcome {
    Applied(MessageStat),
    /// The backend refused the change (conflict, read-only item, ...).
    Rejected,
}

impl ChangeOutcome {
    pub fn stat(&self) -> Option<&MessageStat> {
        match self {
            Self::Applied(stat) => Some(stat),
            Self::Rejected => None,
        }
    }
}
