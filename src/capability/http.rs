//! HTTP client for JSON-over-HTTP inference runtimes.
//!
//! The same client serves model runtimes, hosted endpoints, knowledge bases
//! and the training control plane; only the URL layout differs, and that is
//! captured by a path template containing `{id}`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Map, Value};
use tracing::debug;

use super::traits::BackendCapability;
use crate::{BifrostError, Result};

/// Path layout for foundation-model runtimes.
pub const MODEL_RUNTIME_PATH: &str = "/model/{id}/invoke";
/// Path layout for hosted inference endpoints.
pub const ENDPOINT_RUNTIME_PATH: &str = "/endpoints/{id}/invocations";
/// Path layout for knowledge-base retrieve-and-generate.
pub const KNOWLEDGE_RUNTIME_PATH: &str = "/knowledgebases/{id}/retrieveAndGenerate";
/// Path layout for training job submission.
pub const TRAINING_JOBS_PATH: &str = "/training-jobs/{id}";

/// Reply field holding forwarded response headers.
pub const META_KEY: &str = "_meta";
/// Model version reported by hosted endpoints.
pub const MODEL_VERSION_HEADER: &str = "x-amzn-sagemaker-model-version";
/// Server-side processing time reported by hosted endpoints.
pub const PROCESSING_TIME_HEADER: &str = "x-amzn-sagemaker-processing-time";

/// Capability backed by an HTTP JSON API.
#[derive(Clone)]
pub struct HttpCapability {
    name: String,
    http: Client,
    base_url: String,
    path_template: String,
    api_key: Option<String>,
    forwarded_headers: Vec<String>,
}

impl HttpCapability {
    /// Create a capability posting to `base_url` + `path_template`.
    ///
    /// No client-side timeout is applied unless one is set with
    /// [`with_timeout`](Self::with_timeout).
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        path_template: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            path_template: path_template.into(),
            api_key: None,
            forwarded_headers: Vec::new(),
        }
    }

    /// Foundation-model runtime (`/model/{id}/invoke`).
    pub fn model_runtime(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::new(name, base_url, MODEL_RUNTIME_PATH)
    }

    /// Hosted endpoint runtime (`/endpoints/{id}/invocations`).
    ///
    /// Forwards the model version and processing time headers.
    pub fn endpoint_runtime(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::new(name, base_url, ENDPOINT_RUNTIME_PATH)
            .forward_headers([MODEL_VERSION_HEADER, PROCESSING_TIME_HEADER])
    }

    /// Knowledge-base runtime.
    pub fn knowledge_runtime(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::new(name, base_url, KNOWLEDGE_RUNTIME_PATH)
    }

    /// Training control plane.
    pub fn training_jobs(name: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self::new(name, base_url, TRAINING_JOBS_PATH)
    }

    /// Send `Authorization: Bearer <key>` with every call.
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Copy these response headers into the reply under [`META_KEY`].
    ///
    /// Only applies to object replies; names are matched case-insensitively
    /// and stored lowercase.
    pub fn forward_headers<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.forwarded_headers
            .extend(names.into_iter().map(|n| n.into().to_ascii_lowercase()));
        self
    }

    /// Apply a per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Result<Self> {
        self.http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BifrostError::Configuration(format!("failed to build HTTP client: {e}")))?;
        Ok(self)
    }

    /// Full URL for a capability identifier.
    pub fn url_for(&self, capability_id: &str) -> String {
        format!(
            "{}{}",
            self.base_url,
            self.path_template.replace("{id}", capability_id)
        )
    }

    /// Check response status and map to appropriate error.
    fn handle_response_errors(&self, response: &reqwest::Response, capability_id: &str) -> Result<()> {
        let status = response.status();

        if status.is_success() {
            return Ok(());
        }

        match status.as_u16() {
            401 | 403 => Err(BifrostError::AuthenticationFailed),
            404 => Err(BifrostError::CapabilityNotFound(capability_id.to_string())),
            429 => {
                let retry_after = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.parse::<u64>().ok())
                    .map(Duration::from_secs);
                Err(BifrostError::RateLimited { retry_after })
            }
            code => Err(BifrostError::Api {
                status: code,
                message: format!("{} error: {}", self.name, status),
            }),
        }
    }
}

#[async_trait]
impl BackendCapability for HttpCapability {
    fn name(&self) -> &str {
        &self.name
    }

    async fn invoke(&self, capability_id: &str, payload: &Value) -> Result<Value> {
        let url = self.url_for(capability_id);
        debug!(capability = %self.name, %url, "invoking capability");

        let mut request = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Accept", "application/json")
            .json(payload);
        if let Some(key) = &self.api_key {
            request = request.header("Authorization", format!("Bearer {key}"));
        }

        let response = request.send().await?;
        self.handle_response_errors(&response, capability_id)?;

        let meta: Map<String, Value> = self
            .forwarded_headers
            .iter()
            .filter_map(|name| {
                let value = response.headers().get(name.as_str())?.to_str().ok()?;
                Some((name.clone(), Value::String(value.to_string())))
            })
            .collect();

        let body = response.bytes().await?;
        if body.is_empty() {
            return Err(BifrostError::EmptyResponse);
        }
        let mut reply: Value =
            serde_json::from_slice(&body).map_err(|e| BifrostError::MalformedResponse {
                capability: self.name.clone(),
                reason: e.to_string(),
            })?;
        if !meta.is_empty() {
            if let Value::Object(fields) = &mut reply {
                fields.insert(META_KEY.to_string(), Value::Object(meta));
            }
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_substitutes_identifier() {
        let capability = HttpCapability::model_runtime("bedrock", "http://localhost:9000/");
        assert_eq!(
            capability.url_for("amazon.titan-text-lite-v1"),
            "http://localhost:9000/model/amazon.titan-text-lite-v1/invoke"
        );
    }

    #[test]
    fn endpoint_layout() {
        let capability = HttpCapability::endpoint_runtime("sagemaker", "http://rt");
        assert_eq!(
            capability.url_for("customer-sentiment-analyzer"),
            "http://rt/endpoints/customer-sentiment-analyzer/invocations"
        );
        assert_eq!(capability.name(), "sagemaker");
        assert_eq!(
            capability.forwarded_headers,
            vec![MODEL_VERSION_HEADER, PROCESSING_TIME_HEADER]
        );
    }

    #[test]
    fn forwarded_header_names_are_lowercased() {
        let capability =
            HttpCapability::model_runtime("bedrock", "http://rt").forward_headers(["X-Request-Id"]);
        assert_eq!(capability.forwarded_headers, vec!["x-request-id"]);
    }
}
