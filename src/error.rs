//! Bifrost error types

use std::time::Duration;

/// Bifrost error types
#[derive(Debug, thiserror::Error)]
pub enum BifrostError {
    // Capability/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after:?}")]
    RateLimited { retry_after: Option<Duration> },

    #[error("authentication failed")]
    AuthenticationFailed,

    #[error("capability not found: {0}")]
    CapabilityNotFound(String),

    /// The remote answered, but not in the shape the operation expects.
    #[error("malformed response from {capability}: {reason}")]
    MalformedResponse { capability: String, reason: String },

    #[error("empty response from capability")]
    EmptyResponse,

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("decode error: {0}")]
    Decode(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    // Storage errors
    #[error("storage error: {0}")]
    Storage(String),

    // Configuration errors
    #[error("no capability configured for {0}")]
    NoCapability(&'static str),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl BifrostError {
    /// Whether a retry of the same call has a reasonable chance of succeeding.
    ///
    /// Network failures, rate limits and 5xx answers are transient. Everything
    /// else (auth, missing endpoints, bad payloads) is permanent.
    pub fn is_transient(&self) -> bool {
        match self {
            BifrostError::Http(_) | BifrostError::RateLimited { .. } => true,
            BifrostError::Api { status, .. } => *status >= 500 || *status == 408,
            _ => false,
        }
    }

    /// Whether this error came from a backend capability call.
    ///
    /// These are the failures the fallback router recovers from; the rest
    /// indicate a local problem (storage, configuration, decoding).
    pub fn is_capability_error(&self) -> bool {
        matches!(
            self,
            BifrostError::Http(_)
                | BifrostError::Api { .. }
                | BifrostError::RateLimited { .. }
                | BifrostError::AuthenticationFailed
                | BifrostError::CapabilityNotFound(_)
                | BifrostError::MalformedResponse { .. }
                | BifrostError::EmptyResponse
                | BifrostError::Json(_)
                | BifrostError::NoCapability(_)
        )
    }

    /// Provider supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            BifrostError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }

    /// Short stable label for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            BifrostError::Http(_) => "http",
            BifrostError::Api { .. } => "api",
            BifrostError::RateLimited { .. } => "rate_limited",
            BifrostError::AuthenticationFailed => "auth",
            BifrostError::CapabilityNotFound(_) => "not_found",
            BifrostError::MalformedResponse { .. } => "malformed",
            BifrostError::EmptyResponse => "empty",
            BifrostError::Json(_) => "json",
            BifrostError::Decode(_) => "decode",
            BifrostError::InvalidInput(_) => "invalid_input",
            BifrostError::Storage(_) => "storage",
            BifrostError::NoCapability(_) => "no_capability",
            BifrostError::Configuration(_) => "configuration",
            BifrostError::Internal(_) => "internal",
        }
    }
}

impl From<reqwest::Error> for BifrostError {
    fn from(err: reqwest::Error) -> Self {
        BifrostError::Http(err.to_string())
    }
}

impl From<base64::DecodeError> for BifrostError {
    fn from(err: base64::DecodeError) -> Self {
        BifrostError::Decode(err.to_string())
    }
}

/// Result type alias for Bifrost operations
pub type Result<T> = std::result::Result<T, BifrostError>;
