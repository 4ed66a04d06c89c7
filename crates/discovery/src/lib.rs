//! Cloud lookup of hub devices belonging to a project.
//!
//! Hubs are registered in the cloud as devices inside a tagged
//! distribution collection. Discovery fetches that collection, lists
//! its member devices and keeps the ones currently reporting a
//! connected state. The result feeds a router's hub target.

pub mod client;
pub mod types;

// Re-export primary types.
pub use client::HubDiscovery;
pub use types::HUB_COLLECTION_TAG;

/// Errors for discovery operations.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    /// The project has no hub distribution collection. The account was
    /// never provisioned for local routing.
    #[error("no hub distribution collection found")]
    NotConfigured,

    /// The distribution collection exists but contains no hub devices.
    #[error("distribution collection contains no hubs")]
    NoHubs,

    /// The cloud request itself failed.
    #[error("cloud request failed: {0}")]
    Cloud(String),

    /// A hub device record is missing required fields or carries values
    /// that cannot be mapped to a hub target.
    #[error("malformed hub record: {0}")]
    Malformed(String),
}
