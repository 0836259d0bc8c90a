use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::BackendError;
use crate::policy::PolicySet;

/// Negotiated protocol version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub enum ProtocolVersion {
    #[serde(rename = "2.5")]
    V2_5,
    #[serde(rename = "12.0")]
    V12_0,
    #[serde(rename = "12.1")]
    V12_1,
    #[serde(rename = "14.0")]
    V14_0,
    #[default]
    #[serde(rename = "14.1")]
    V14_1,
    #[serde(rename = "16.0")]
    V16_0,
    #[serde(rename = "16.1")]
    V16_1,
}

impl ProtocolVersion {
    pub const ALL: [ProtocolVersion; 7] = [
        Self::V2_5,
        Self::V12_0,
        Self::V12_1,
        Self::V14_0,
        Self::V14_1,
        Self::V16_0,
        Self::V16_1,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::V2_5 => "2.5",
            Self::V12_0 => "12.0",
            Self::V12_1 => "12.1",
            Self::V14_0 => "14.0",
            Self::V14_1 => "14.1",
            Self::V16_0 => "16.0",
            Self::V16_1 => "16.1",
        }
    }

    /// Body preferences replaced plain truncation in 12.0.
    pub fn supports_body_preferences(&self) -> bool {
        *self >= Self::V12_0
    }

    /// Comma separated list for the `MS-ASProtocolVersions` header.
    pub fn supported_header() -> String {
        Self::ALL
            .iter()
            .map(|v| v.as_str())
            .collect::<Vec<_>>()
            .join(",")
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProtocolVersion {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|v| v.as_str() == s.trim())
            .copied()
            .ok_or_else(|| {
                BackendError::InvalidArgument(format!("Unsupported protocol version: {}", s))
            })
    }
}

/// Per request identity and negotiation state.
///
/// `auth_user` is who logged on; `user` is whose data is synchronized.
/// They differ when one account syncs another's mailbox.
#[derive(Clone, Default)]
pub struct SessionContext {
    pub user: Option<String>,
    pub auth_user: Option<String>,
    auth_pass: Option<String>,
    pub domain: Option<String>,
    pub version: ProtocolVersion,
    policies: PolicySet,
}

impl SessionContext {
    pub fn new(policies: PolicySet) -> Self {
        Self {
            policies,
            ..Default::default()
        }
    }

    pub fn set_credentials(&mut self, username: &str, password: &str, domain: Option<&str>) {
        self.auth_user = Some(username.to_string());
        self.auth_pass = Some(password.to_string());
        self.domain = domain.map(str::to_string);
    }

    pub fn policies(&self) -> &PolicySet {
        &self.policies
    }

    pub fn auth_pass(&self) -> Option<&str> {
        self.auth_pass.as_deref()
    }

    pub fn clear(&mut self) {
        self.user = None;
        self.auth_user = None;
        self.auth_pass = None;
        self.domain = None;
    }

    /// Whether the synchronizing user differs from the authenticated one.
    pub fn is_impersonating(&self) -> bool {
        matches!((&self.user, &self.auth_user), (Some(u), Some(a)) if u != a)
    }
}

impl fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionContext")
            .field("user", &self.user)
            .field("auth_user", &self.auth_user)
            .field("auth_pass", &self.auth_pass.as_ref().map(|_| "<redacted>"))
            .field("domain", &self.domain)
            .field("version", &self.version)
            .field("policies", &self.policies)
            .finish()
    }
}

/// The device a change originates from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceContext {
    pub device_id: String,
    #[serde(default)]
    pub device_type: String,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub version: ProtocolVersion,
}
