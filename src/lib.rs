//! # workbench-gateway
//!
//! Lifecycle services for interactive notebooks and their storage volumes.
//!
//! One binary serves one domain (`SERVICE_DOMAIN=notebook` or `volume`).
//! Each domain keeps its ownership records in an authoritative store, fronts
//! them with a per-owner cache, and tells the peer domain about deletions
//! over a topic exchange so the peer can release attachment bookkeeping.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP + bearer JWT)
//!     │
//!     ├── REST Handlers (api/)
//!     │
//!     ├── EntityService (service/)
//!     │     ├── PlatformClient (platform/)
//!     │     ├── CacheAside ──┬── AuthoritativeRepository (persistence/)
//!     │     │                └── CacheRepository (cache/)
//!     │     ├── AttachmentLedger (persistence/)
//!     │     └── MessageBus::publish (messaging/)
//!     │
//!     └── consume loop ── Handlers ── PeerDeletionHandler (service/reconcile)
//! ```

pub mod api;
pub mod app_state;
pub mod cache;
pub mod config;
pub mod domain;
pub mod error;
pub mod messaging;
pub mod persistence;
pub mod platform;
pub mod service;
