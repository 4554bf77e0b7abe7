//! Data Transfer Objects for REST request/response serialization.
//!
//! Names travel as plain strings and are validated in the handlers, so a
//! bad name yields the gateway's 400 error body instead of a body
//! rejection.

pub mod entity_dto;

pub use entity_dto::*;
