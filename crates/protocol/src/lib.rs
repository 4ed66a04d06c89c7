//! Shared types and contracts for hub-aware request routing.
//!
//! Defines the endpoint eligibility rules, the hub target model, and the
//! transport capability traits consumed by the routers.

pub mod constants;
pub mod endpoints;
pub mod transport;
pub mod types;

// Re-export primary types for convenience.
pub use endpoints::is_local_eligible;
pub use transport::{
    MessageCallback, PubSubOptions, PubSubTransport, RequestExecutor, TransportError,
};
pub use types::{
    HubTarget, KeyMaterial, Method, Protocol, RequestSpec, Response, SecurityPolicy,
};
