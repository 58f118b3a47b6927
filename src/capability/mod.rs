//! Backend capabilities: the remote inference and knowledge services.
//!
//! A capability is one synchronous request/response call against a named
//! model or endpoint. Capabilities never retry; fallback policy lives in the
//! [`FallbackRouter`](crate::router::FallbackRouter).

pub mod http;
pub mod set;
pub mod traits;

pub use http::HttpCapability;
pub use set::{CapabilityRole, CapabilitySet, CapabilitySetBuilder};
pub use traits::BackendCapability;
