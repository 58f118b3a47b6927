//! Request dispatcher: inbound HTTP-style events to routed responses.
//!
//! The dispatcher is the outermost boundary. Bad input is replaced by default
//! input, capability failures are absorbed by the router, and anything else,
//! panics included, becomes a generic 500 envelope with no internal detail.

use std::collections::{BTreeMap, HashMap};
use std::panic::AssertUnwindSafe;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, instrument};

use crate::Result;
use crate::router::FallbackRouter;
use crate::types::{
    Operation, OperationInput, ROUTED_PATHS, RoutedResponse, TrainingRequest, utf8_dropping_invalid,
};

/// Header carrying the degraded marker of a routed response.
pub const DEGRADED_HEADER: &str = "x-bifrost-degraded";
/// Header naming the capability that produced a routed response.
pub const BACKEND_HEADER: &str = "x-bifrost-backend";

/// Inbound HTTP-style event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InboundRequest {
    #[serde(default)]
    pub http_method: String,
    #[serde(default, alias = "rawPath")]
    pub path: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub is_base64_encoded: bool,
    #[serde(default)]
    pub query_string_parameters: Option<HashMap<String, String>>,
}

impl InboundRequest {
    pub fn new(http_method: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            http_method: http_method.into(),
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query_string_parameters
            .get_or_insert_with(HashMap::new)
            .insert(key.into(), value.into());
        self
    }

    /// Decoded JSON body, or `None` when there is nothing usable.
    ///
    /// Honors `isBase64Encoded`, and also accepts an unflagged base64 body
    /// when it does not parse as JSON directly.
    pub fn json_body(&self) -> Option<Value> {
        let body = self.body.as_deref().filter(|b| !b.trim().is_empty())?;
        if self.is_base64_encoded {
            return decode_base64_json(body);
        }
        serde_json::from_str(body)
            .ok()
            .or_else(|| decode_base64_json(body))
    }

    fn query(&self, key: &str) -> Option<&str> {
        self.query_string_parameters
            .as_ref()
            .and_then(|q| q.get(key))
            .map(String::as_str)
    }
}

fn decode_base64_json(body: &str) -> Option<Value> {
    let bytes = STANDARD.decode(body.trim()).ok()?;
    serde_json::from_str(&utf8_dropping_invalid(&bytes)).ok()
}

/// Outbound response envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResponseEnvelope {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    /// JSON document, serialized.
    pub body: String,
}

impl ResponseEnvelope {
    /// Parse the body back into JSON.
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Permissive cross-origin headers attached to every response.
pub fn default_headers() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("Content-Type".to_string(), "application/json".to_string()),
        ("Access-Control-Allow-Origin".to_string(), "*".to_string()),
        (
            "Access-Control-Allow-Headers".to_string(),
            "Content-Type,X-Amz-Date,Authorization,X-Api-Key".to_string(),
        ),
        (
            "Access-Control-Allow-Methods".to_string(),
            "GET,POST,PUT,DELETE,OPTIONS".to_string(),
        ),
    ])
}

/// Static body returned for unrecognized routes.
pub fn discovery_body() -> Value {
    json!({
        "message": "Bifrost inference gateway",
        "availableEndpoints": ROUTED_PATHS,
        "purpose": "Sentiment analysis, customer insights and knowledge queries with capability fallback",
    })
}

/// Maps inbound requests to router invocations.
#[derive(Clone)]
pub struct Dispatcher {
    router: FallbackRouter,
}

impl Dispatcher {
    pub fn new(router: FallbackRouter) -> Self {
        Self { router }
    }

    pub fn router(&self) -> &FallbackRouter {
        &self.router
    }

    /// Handle a request on the three-route API.
    #[instrument(skip(self, request), fields(method = %request.http_method, path = %request.path))]
    pub async fn dispatch(&self, request: InboundRequest) -> ResponseEnvelope {
        guarded(self.dispatch_inner(request)).await
    }

    /// Handle a one-shot generation request.
    ///
    /// Prompt resolution: `prompt` query parameter, then the body's `prompt`,
    /// then the default prompt. Method and path are not inspected.
    #[instrument(skip(self, request))]
    pub async fn dispatch_generation(&self, request: InboundRequest) -> ResponseEnvelope {
        guarded(self.generation_inner(request)).await
    }

    /// Submit a training job. Fire-and-forget: the job is not tracked.
    pub async fn submit_training(&self, request: TrainingRequest) -> RoutedResponse {
        self.router
            .route(&OperationInput::ModelTraining { request })
            .await
    }

    /// Route an already-resolved input.
    pub async fn route(&self, input: &OperationInput) -> RoutedResponse {
        self.router.route(input).await
    }

    async fn dispatch_inner(&self, request: InboundRequest) -> Result<ResponseEnvelope> {
        let Some(operation) = Operation::from_route(&request.http_method, &request.path) else {
            return Ok(ResponseEnvelope {
                status_code: 200,
                headers: default_headers(),
                body: serde_json::to_string(&discovery_body())?,
            });
        };
        let body = request.json_body().unwrap_or(Value::Null);
        let input = OperationInput::from_body(operation, &body);
        let routed = self.router.route(&input).await;
        routed_envelope(&routed)
    }

    async fn generation_inner(&self, request: InboundRequest) -> Result<ResponseEnvelope> {
        let body = match request.query("prompt").filter(|p| !p.is_empty()) {
            Some(prompt) => json!({ "prompt": prompt }),
            None => request.json_body().unwrap_or(Value::Null),
        };
        let input = OperationInput::from_body(Operation::FreeformGeneration, &body);
        let routed = self.router.route(&input).await;
        routed_envelope(&routed)
    }
}

/// Envelope for a routed response: the normalized body plus provenance headers.
pub fn routed_envelope(routed: &RoutedResponse) -> Result<ResponseEnvelope> {
    let mut headers = default_headers();
    headers.insert(DEGRADED_HEADER.to_string(), routed.degraded.to_string());
    headers.insert(BACKEND_HEADER.to_string(), routed.backend.clone());
    Ok(ResponseEnvelope {
        status_code: 200,
        headers,
        body: serde_json::to_string(&routed.response)?,
    })
}

/// The generic 500 envelope.
pub fn internal_error_envelope() -> ResponseEnvelope {
    ResponseEnvelope {
        status_code: 500,
        headers: default_headers(),
        body: json!({
            "error": "Internal server error",
            "message": "Please contact your support team",
        })
        .to_string(),
    }
}

/// Run a dispatch future, converting errors and panics into the 500 envelope.
async fn guarded<F>(future: F) -> ResponseEnvelope
where
    F: std::future::Future<Output = Result<ResponseEnvelope>>,
{
    match AssertUnwindSafe(future).catch_unwind().await {
        Ok(Ok(envelope)) => envelope,
        Ok(Err(e)) => {
            error!(error = %e, "dispatch failed");
            internal_error_envelope()
        }
        Err(_) => {
            error!("dispatch panicked");
            internal_error_envelope()
        }
    }
}
