//! Body preferences, collection options and truncation helpers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Truncation size applied when a device names a body type without a size.
pub const DEFAULT_TRUNCATION_SIZE: u64 = 1_048_576;

/// A truncation size of zero means "no limit".
pub const NO_TRUNCATION: u64 = 0;

/// Body representations a device can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BodyType {
    Plain,
    Html,
    Rtf,
    Mime,
}

/// Per body type preference sent by the device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPreference {
    #[serde(default, rename = "truncationsize")]
    pub truncation_size: Option<u64>,
    /// Send nothing rather than a truncated body.
    #[serde(default, rename = "allornone")]
    pub all_or_none: bool,
    /// Requested preview length in characters (protocol 14.0+).
    #[serde(default)]
    pub preview: Option<u32>,
}

pub type BodyPreferences = BTreeMap<BodyType, BodyPreference>;

/// Fill in the default truncation size for every preference lacking one.
///
/// Preferences that already carry a size, including zero, are untouched.
pub fn add_default_body_pref_truncation(prefs: &mut BodyPreferences) {
    fill_body_pref_truncation(prefs, DEFAULT_TRUNCATION_SIZE);
}

/// Like [`add_default_body_pref_truncation`] with a configured size.
pub fn fill_body_pref_truncation(prefs: &mut BodyPreferences, size: u64) {
    for pref in prefs.values_mut() {
        pref.truncation_size.get_or_insert(size);
    }
}

/// Options attached to a collection in a sync or fetch request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionOptions {
    /// Legacy (protocol 2.5) plain text truncation.
    #[serde(default)]
    pub truncation: Option<u64>,
    #[serde(default, rename = "mimetruncation")]
    pub mime_truncation: Option<u64>,
    #[serde(default, rename = "mimesupport")]
    pub mime_support: MimeSupport,
    #[serde(default, rename = "bodyprefs")]
    pub body_prefs: BodyPreferences,
}

impl CollectionOptions {
    /// Disable every truncation knob so the full item is returned.
    pub fn force_full_retrieval(&mut self) {
        self.truncation = Some(NO_TRUNCATION);
        self.mime_truncation = Some(NO_TRUNCATION);
        for pref in self.body_prefs.values_mut() {
            pref.truncation_size = Some(NO_TRUNCATION);
        }
    }

    /// Preferred body type: the richest type the device asked for.
    pub fn preferred_body_type(&self) -> Option<BodyType> {
        if self.mime_support == MimeSupport::Always {
            return Some(BodyType::Mime);
        }
        self.body_prefs.keys().next_back().copied()
    }
}

/// Whether the device wants MIME content for mail.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MimeSupport {
    #[default]
    Never,
    SmimeOnly,
    Always,
}

/// An item body after truncation has been applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Body {
    pub body_type: BodyType,
    pub data: String,
    pub truncated: bool,
    /// Size in bytes of the untruncated body.
    pub estimated_size: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preview: Option<String>,
}

impl BodyPreference {
    /// Effective byte limit, `None` meaning unlimited.
    pub fn limit(&self) -> Option<u64> {
        match self.truncation_size {
            None | Some(NO_TRUNCATION) => None,
            Some(size) => Some(size),
        }
    }

    /// Apply this preference to full body content.
    pub fn truncate(&self, body_type: BodyType, content: &str) -> Body {
        let estimated_size = content.len() as u64;
        let preview = self
            .preview
            .map(|chars| content.chars().take(chars as usize).collect());

        let data = match self.limit() {
            Some(limit) if estimated_size > limit => {
                if self.all_or_none {
                    String::new()
                } else {
                    content[..floor_char_boundary(content, limit as usize)].to_string()
                }
            }
            _ => content.to_string(),
        };

        Body {
            body_type,
            truncated: (data.len() as u64) < estimated_size,
            data,
            estimated_size,
            preview,
        }
    }
}

/// Largest index `<= at` that falls on a char boundary.
fn floor_char_boundary(s: &str, at: usize) -> usize {
    if at >= s.len() {
        return s.len();
    }
    let mut idx = at;
    while !s.is_char_boundary(idx) {
        idx -= 1;
    }
    idx
}
