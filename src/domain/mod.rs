//! Domain layer: entity identity, records, and cross-domain events.
//!
//! This module contains the value types shared by both services: the
//! entity kind, validated names, authoritative records, attachment
//! bookkeeping, routing keys, and the events exchanged over the broker.

pub mod entity_event;
pub mod entity_kind;
pub mod entity_name;
pub mod entity_record;
pub mod routing_key;

pub use entity_event::EntityEvent;
pub use entity_kind::EntityKind;
pub use entity_name::{EntityName, OwnerId};
pub use entity_record::{Attachment, DeleteOutcome, EntityRecord};
pub use routing_key::{Action, RoutingKey};
