//! Validated identifiers: entity names and owner principals.
//!
//! [`EntityName`] and [`OwnerId`] are newtypes around `String` so that an
//! owner can never be passed where an entity name is expected.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Maximum length of a platform object name.
pub const MAX_NAME_LEN: usize = 253;

static DNS_1123_LABEL: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[a-z0-9]([-a-z0-9]*[a-z0-9])?$").ok());

/// Unique name of a notebook or volume.
///
/// Names double as platform object names, so they follow the DNS-1123
/// label rules: lower-case alphanumerics and `-`, starting and ending with
/// an alphanumeric, at most [`MAX_NAME_LEN`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityName(String);

impl EntityName {
    /// Validates and wraps a name.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the name is empty, too
    /// long, or not a DNS-1123 label.
    pub fn parse(raw: impl Into<String>) -> Result<Self, GatewayError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(GatewayError::InvalidRequest(
                "entity name cannot be empty".to_string(),
            ));
        }
        if raw.len() > MAX_NAME_LEN {
            return Err(GatewayError::InvalidRequest(format!(
                "entity name longer than {MAX_NAME_LEN} characters"
            )));
        }
        let valid = DNS_1123_LABEL
            .as_ref()
            .is_some_and(|re| re.is_match(&raw));
        if !valid {
            return Err(GatewayError::InvalidRequest(format!(
                "invalid entity name: {raw}"
            )));
        }
        Ok(Self(raw))
    }

    /// Returns the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EntityName {
    type Error = GatewayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<EntityName> for String {
    fn from(name: EntityName) -> Self {
        name.0
    }
}

/// Identifier of the principal that owns an entity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OwnerId(String);

impl OwnerId {
    /// Wraps a principal identifier.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Unauthenticated`] for a blank identifier.
    pub fn parse(raw: impl Into<String>) -> Result<Self, GatewayError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(GatewayError::Unauthenticated(
                "principal identifier is empty".to_string(),
            ));
        }
        Ok(Self(raw))
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
