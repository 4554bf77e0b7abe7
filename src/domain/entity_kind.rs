//! The two resource domains managed by the gateway.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// Kind of entity a service owns.
///
/// Each running service owns exactly one kind and treats the other as its
/// peer. Every naming decision that crosses a process boundary (routing key
/// prefix, event body field, cache key prefix, table name) hangs off this
/// enum so that both services agree on the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Interactive compute session.
    Notebook,
    /// Persistent volume claim backing a notebook workspace.
    Volume,
}

impl EntityKind {
    /// Returns the other domain.
    #[must_use]
    pub const fn peer(self) -> Self {
        match self {
            Self::Notebook => Self::Volume,
            Self::Volume => Self::Notebook,
        }
    }

    /// Routing key prefix used on the broker.
    #[must_use]
    pub const fn routing_prefix(self) -> &'static str {
        match self {
            Self::Notebook => "NOTEBOOK",
            Self::Volume => "PVC",
        }
    }

    /// JSON field that carries the entity name in event bodies.
    #[must_use]
    pub const fn event_field(self) -> &'static str {
        match self {
            Self::Notebook => "notebook_name",
            Self::Volume => "pvc_name",
        }
    }

    /// Authoritative table holding this kind's records.
    #[must_use]
    pub const fn table(self) -> &'static str {
        match self {
            Self::Notebook => "notebooks",
            Self::Volume => "volumes",
        }
    }

    /// Prefix of the per-owner cache key.
    #[must_use]
    pub const fn cache_prefix(self) -> &'static str {
        match self {
            Self::Notebook => "notebook",
            Self::Volume => "pvc",
        }
    }

    /// REST collection path, relative to `/api/v1`.
    #[must_use]
    pub const fn collection_path(self) -> &'static str {
        match self {
            Self::Notebook => "/notebooks",
            Self::Volume => "/volumes",
        }
    }

    /// Lower-case display name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Notebook => "notebook",
            Self::Volume => "volume",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "notebook" | "notebooks" => Ok(Self::Notebook),
            "volume" | "volumes" | "pvc" => Ok(Self::Volume),
            other => Err(GatewayError::InvalidRequest(format!(
                "unknown entity kind: {other}"
            ))),
        }
    }
}
