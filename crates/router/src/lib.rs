//! Local-first routing for REST-style calls and pub/sub operations.
//!
//! A router wraps a supplied transport and exposes the same call
//! contract: eligible operations are attempted against the local hub
//! first and transparently fall back to the cloud when the hub is
//! unreachable. When the hub's security policy requires it, payloads
//! travel inside signed+encrypted envelopes.

pub mod config;
pub mod http;
pub mod pubsub;

mod error;

pub use config::HubSettings;
pub use error::RouterError;
pub use http::TransportRouter;
pub use pubsub::PubSubRouter;
