//! Broker routing keys of the form `<KIND>.<ACTION>`.

use std::fmt;
use std::str::FromStr;

use super::EntityKind;
use crate::error::GatewayError;

/// Mutation an event describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    /// The entity was provisioned.
    Create,
    /// The entity was torn down.
    Delete,
}

impl Action {
    /// Upper-case wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Delete => "DELETE",
        }
    }
}

/// Address of a category of events on the topic exchange.
///
/// Rendered as `<prefix>.<action>`, e.g. `PVC.DELETE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoutingKey {
    /// Entity kind the event is about.
    pub kind: EntityKind,
    /// Mutation that happened.
    pub action: Action,
}

impl RoutingKey {
    /// Creates a routing key.
    #[must_use]
    pub const fn new(kind: EntityKind, action: Action) -> Self {
        Self { kind, action }
    }

    /// Key for creations of `kind`.
    #[must_use]
    pub const fn created(kind: EntityKind) -> Self {
        Self::new(kind, Action::Create)
    }

    /// Key for deletions of `kind`.
    #[must_use]
    pub const fn deleted(kind: EntityKind) -> Self {
        Self::new(kind, Action::Delete)
    }
}

impl fmt::Display for RoutingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind.routing_prefix(), self.action.as_str())
    }
}

impl FromStr for RoutingKey {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || GatewayError::InvalidRequest(format!("invalid routing key: {s}"));
        let (prefix, action) = s.split_once('.').ok_or_else(invalid)?;
        let kind = match prefix {
            "NOTEBOOK" => EntityKind::Notebook,
            "PVC" => EntityKind::Volume,
            _ => return Err(invalid()),
        };
        let action = match action {
            "CREATE" => Action::Create,
            "DELETE" => Action::Delete,
            _ => return Err(invalid()),
        };
        Ok(Self::new(kind, action))
    }
}
