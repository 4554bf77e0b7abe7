//! Cross-domain events published after every committed mutation.
//!
//! The body carries only the identifying field, e.g.
//! `{"notebook_name": "nb1"}` or `{"pvc_name": "vol1"}`. No sequence number
//! or event id travels with it, so consumers must tolerate duplicates and
//! arbitrary interleaving with other routing keys.

use serde_json::{Map, Value};

use super::{EntityName, RoutingKey};
use crate::error::GatewayError;

/// Immutable event addressed by a [`RoutingKey`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityEvent {
    /// Routing key the event is published under.
    pub key: RoutingKey,
    /// Name of the entity the event is about.
    pub name: EntityName,
}

impl EntityEvent {
    /// Creates an event.
    #[must_use]
    pub const fn new(key: RoutingKey, name: EntityName) -> Self {
        Self { key, name }
    }

    /// Serializes the JSON body.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::Internal`] if serialization fails.
    pub fn encode(&self) -> Result<Vec<u8>, GatewayError> {
        let mut body = Map::new();
        body.insert(
            self.key.kind.event_field().to_string(),
            Value::String(self.name.to_string()),
        );
        serde_json::to_vec(&Value::Object(body))
            .map_err(|e| GatewayError::Internal(format!("encoding event: {e}")))
    }

    /// Decodes a body received under `key`.
    ///
    /// Extra fields are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::InvalidRequest`] if the body is not a JSON
    /// object, lacks the field for `key.kind`, or carries an invalid name.
    pub fn decode(key: RoutingKey, body: &[u8]) -> Result<Self, GatewayError> {
        let value: Value = serde_json::from_slice(body)
            .map_err(|e| GatewayError::InvalidRequest(format!("malformed {key} body: {e}")))?;
        let field = key.kind.event_field();
        let raw = value
            .get(field)
            .and_then(Value::as_str)
            .ok_or_else(|| GatewayError::InvalidRequest(format!("{key} body lacks {field}")))?;
        Ok(Self::new(key, EntityName::parse(raw)?))
    }
}
