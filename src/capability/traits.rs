//! Backend capability contract.
//!
//! Capabilities are intentionally narrow: given a capability identifier
//! (model ID, endpoint name, knowledge base ID) and a JSON payload, return a
//! JSON payload or a typed error. They never retry and never fall back.
//!
//! # Example
//!
//! ```ignore
//! async fn invoke(&self, capability_id: &str, payload: &Value) -> Result<Value> {
//!     let response = self.client.post(self.url_for(capability_id)).json(payload).send().await?;
//!     // ... map status codes to BifrostError, parse the body
//! }
//! ```

use async_trait::async_trait;
use serde_json::Value;

use crate::Result;

/// One remote AI/ML capability.
///
/// Implementations must leave no partial remote state behind on failure and
/// must report failures as a [`BifrostError`](crate::BifrostError) so the
/// router can tell capability failures from local ones.
#[async_trait]
pub trait BackendCapability: Send + Sync {
    /// Capability name for logging, metrics and the degraded-response marker.
    fn name(&self) -> &str;

    /// Invoke `capability_id` with `payload` and return the decoded reply.
    async fn invoke(&self, capability_id: &str, payload: &Value) -> Result<Value>;
}
