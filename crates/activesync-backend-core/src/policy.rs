//! Provisioning policy defaults and override merging.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::error::BackendError;

/// Names of the policies a backend can enforce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PolicyName {
    Pin,
    Extended,
    Inactivity,
    WipeThreshold,
    CodewordFrequency,
    MinimumLength,
    Complexity,
    AttachmentsEnabled,
    MaxAttachmentSize,
    AllowSimplePassword,
    PasswordExpiration,
    PasswordHistory,
}

impl PolicyName {
    pub const ALL: [PolicyName; 12] = [
        Self::Pin,
        Self::Extended,
        Self::Inactivity,
        Self::WipeThreshold,
        Self::CodewordFrequency,
        Self::MinimumLength,
        Self::Complexity,
        Self::AttachmentsEnabled,
        Self::MaxAttachmentSize,
        Self::AllowSimplePassword,
        Self::PasswordExpiration,
        Self::PasswordHistory,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pin => "pin",
            Self::Extended => "extended",
            Self::Inactivity => "inactivity",
            Self::WipeThreshold => "wipethreshold",
            Self::CodewordFrequency => "codewordfrequency",
            Self::MinimumLength => "minimumlength",
            Self::Complexity => "complexity",
            Self::AttachmentsEnabled => "attachments",
            Self::MaxAttachmentSize => "maxattachmentsize",
            Self::AllowSimplePassword => "allowsimplepassword",
            Self::PasswordExpiration => "passwordexpiration",
            Self::PasswordHistory => "passwordhistory",
        }
    }

    /// Extended policies are only advertised when `extended` is set.
    pub fn is_extended(&self) -> bool {
        matches!(
            self,
            Self::AttachmentsEnabled
                | Self::MaxAttachmentSize
                | Self::AllowSimplePassword
                | Self::PasswordExpiration
                | Self::PasswordHistory
        )
    }
}

impl fmt::Display for PolicyName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyName {
    type Err = BackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .find(|name| name.as_str() == s)
            .copied()
            .ok_or_else(|| BackendError::InvalidArgument(format!("Unknown policy: {}", s)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyValue {
    Bool(bool),
    Number(u64),
}

impl fmt::Display for PolicyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", u8::from(*b)),
            Self::Number(n) => write!(f, "{}", n),
        }
    }
}

/// Effective security policy for a device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicySet {
    pub pin: bool,
    pub extended: bool,
    /// Minutes of inactivity before the device locks.
    pub inactivity: u32,
    /// Failed unlock attempts before a wipe.
    pub wipe_threshold: u32,
    pub codeword_frequency: u32,
    pub minimum_length: u32,
    pub complexity: u32,
    pub attachments_enabled: bool,
    /// Bytes, zero for no limit.
    pub max_attachment_size: u64,
    pub allow_simple_password: bool,
    /// Days, zero for never.
    pub password_expiration: u32,
    pub password_history: u32,
}

impl Default for PolicySet {
    fn default() -> Self {
        Self {
            pin: true,
            extended: false,
            inactivity: 5,
            wipe_threshold: 10,
            codeword_frequency: 0,
            minimum_length: 5,
            complexity: 2,
            attachments_enabled: true,
            max_attachment_size: 0,
            allow_simple_password: true,
            password_expiration: 0,
            password_history: 0,
        }
    }
}

/// A partial policy set; every `Some` field wins over the base value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyOverrides {
    pub pin: Option<bool>,
    pub extended: Option<bool>,
    pub inactivity: Option<u32>,
    pub wipe_threshold: Option<u32>,
    pub codeword_frequency: Option<u32>,
    pub minimum_length: Option<u32>,
    pub complexity: Option<u32>,
    pub attachments_enabled: Option<bool>,
    pub max_attachment_size: Option<u64>,
    pub allow_simple_password: Option<bool>,
    pub password_expiration: Option<u32>,
    pub password_history: Option<u32>,
}

impl PolicyOverrides {
    /// Build overrides from name/value pairs, rejecting mistyped values.
    pub fn from_pairs<I>(pairs: I) -> Result<Self, BackendError>
    where
        I: IntoIterator<Item = (PolicyName, PolicyValue)>,
    {
        let mut overrides = Self::default();
        for (name, value) in pairs {
            overrides.set(name, value)?;
        }
        Ok(overrides)
    }

    pub fn set(&mut self, name: PolicyName, value: PolicyValue) -> Result<(), BackendError> {
        fn number<T: TryFrom<u64>>(
            name: PolicyName,
            value: PolicyValue,
        ) -> Result<T, BackendError> {
            match value {
                PolicyValue::Number(n) => T::try_from(n).map_err(|_| {
                    BackendError::InvalidArgument(format!("Value {} out of range for {}", n, name))
                }),
                PolicyValue::Bool(_) => Err(BackendError::InvalidArgument(format!(
                    "Policy {} expects a number",
                    name
                ))),
            }
        }
        fn flag(name: PolicyName, value: PolicyValue) -> Result<bool, BackendError> {
            match value {
                PolicyValue::Bool(b) => Ok(b),
                PolicyValue::Number(_) => Err(BackendError::InvalidArgument(format!(
                    "Policy {} expects a boolean",
                    name
                ))),
            }
        }

        match name {
            PolicyName::Pin => self.pin = Some(flag(name, value)?),
            PolicyName::Extended => self.extended = Some(flag(name, value)?),
            PolicyName::Inactivity => self.inactivity = Some(number(name, value)?),
            PolicyName::WipeThreshold => self.wipe_threshold = Some(number(name, value)?),
            PolicyName::CodewordFrequency => self.codeword_frequency = Some(number(name, value)?),
            PolicyName::MinimumLength => self.minimum_length = Some(number(name, value)?),
            PolicyName::Complexity => self.complexity = Some(number(name, value)?),
            PolicyName::AttachmentsEnabled => self.attachments_enabled = Some(flag(name, value)?),
            PolicyName::MaxAttachmentSize => self.max_attachment_size = Some(number(name, value)?),
            PolicyName::AllowSimplePassword => {
                self.allow_simple_password = Some(flag(name, value)?)
            }
            PolicyName::PasswordExpiration => self.password_expiration = Some(number(name, value)?),
            PolicyName::PasswordHistory => self.password_history = Some(number(name, value)?),
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl PolicySet {
    /// Overwrite every key present in `overrides`, keeping the rest.
    pub fn merged(self, overrides: &PolicyOverrides) -> Self {
        Self {
            pin: overrides.pin.unwrap_or(self.pin),
            extended: overrides.extended.unwrap_or(self.extended),
            inactivity: overrides.inactivity.unwrap_or(self.inactivity),
            wipe_threshold: overrides.wipe_threshold.unwrap_or(self.wipe_threshold),
            codeword_frequency: overrides.codeword_frequency.unwrap_or(self.codeword_frequency),
            minimum_length: overrides.minimum_length.unwrap_or(self.minimum_length),
            complexity: overrides.complexity.unwrap_or(self.complexity),
            attachments_enabled: overrides.attachments_enabled.unwrap_or(self.attachments_enabled),
            max_attachment_size: overrides.max_attachment_size.unwrap_or(self.max_attachment_size),
            allow_simple_password: overrides
                .allow_simple_password
                .unwrap_or(self.allow_simple_password),
            password_expiration: overrides.password_expiration.unwrap_or(self.password_expiration),
            password_history: overrides.password_history.unwrap_or(self.password_history),
        }
    }

    pub fn get(&self, name: PolicyName) -> PolicyValue {
        match name {
            PolicyName::Pin => PolicyValue::Bool(self.pin),
            PolicyName::Extended => PolicyValue::Bool(self.extended),
            PolicyName::Inactivity => PolicyValue::Number(self.inactivity.into()),
            PolicyName::WipeThreshold => PolicyValue::Number(self.wipe_threshold.into()),
            PolicyName::CodewordFrequency => PolicyValue::Number(self.codeword_frequency.into()),
            PolicyName::MinimumLength => PolicyValue::Number(self.minimum_length.into()),
            PolicyName::Complexity => PolicyValue::Number(self.complexity.into()),
            PolicyName::AttachmentsEnabled => PolicyValue::Bool(self.attachments_enabled),
            PolicyName::MaxAttachmentSize => PolicyValue::Number(self.max_attachment_size),
            PolicyName::AllowSimplePassword => PolicyValue::Bool(self.allow_simple_password),
            PolicyName::PasswordExpiration => PolicyValue::Number(self.password_expiration.into()),
            PolicyName::PasswordHistory => PolicyValue::Number(self.password_history.into()),
        }
    }

    /// Policies to advertise, in a stable order, for the policy renderer.
    pub fn entries(&self) -> Vec<(PolicyName, PolicyValue)> {
        PolicyName::ALL
            .iter()
            .filter(|name| self.extended || !name.is_extended())
            .map(|name| (*name, self.get(*name)))
            .collect()
    }

    /// Deterministic, non-zero key identifying this exact policy set.
    ///
    /// A device holding a different key must be re-provisioned.
    pub fn policy_key(&self) -> u32 {
        let mut hasher = Sha256::new();
        for (name, value) in self.entries() {
            hasher.update(format!("{}={};", name, value).as_bytes());
        }
        let digest = hasher.finalize();
        let key = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        key.max(1)
    }
}
