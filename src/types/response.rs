//! Backend results and normalized response shapes.
//!
//! Every normalized shape implements `Default`, so a response is well-formed
//! even when no capability produced anything.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::Operation;

/// Raw payload returned by a capability, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendResult {
    pub payload: Value,
    pub backend_identifier: String,
    /// Produced by a fallback path rather than the primary capability.
    pub degraded: bool,
}

/// Sentiment classification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentimentResponse {
    pub sentiment: String,
    pub confidence: f64,
    pub model_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time_ms: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for SentimentResponse {
    fn default() -> Self {
        Self {
            sentiment: "neutral".to_string(),
            confidence: 0.0,
            model_version: "unknown".to_string(),
            processing_time_ms: None,
            error: None,
        }
    }
}

/// Generated customer insights.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InsightsResponse {
    pub text: String,
    pub model_identifier: String,
    pub token_count: u64,
    /// RFC 3339 generation time.
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback_message: Option<String>,
}

/// Knowledge-base answer with citations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeResponse {
    pub answer: String,
    /// Citation locations, in the order the backend returned them.
    pub source_uris: Vec<String>,
    pub confidence: String,
    pub query_processed_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Default for KnowledgeResponse {
    fn default() -> Self {
        Self {
            answer: String::new(),
            source_uris: Vec::new(),
            confidence: "medium".to_string(),
            query_processed_at: String::new(),
            error: None,
        }
    }
}

/// Acknowledgement of a training job submission.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingResponse {
    pub training_job_name: String,
    pub training_job_arn: String,
    pub status: String,
    pub estimated_completion: String,
    pub monitoring_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// One-shot generation output.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationResponse {
    pub model: String,
    pub prompt: String,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Operation-specific response body.
///
/// Serializes as the bare inner shape, which is what ends up in the HTTP body.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum NormalizedResponse {
    Sentiment(SentimentResponse),
    Insights(InsightsResponse),
    Knowledge(KnowledgeResponse),
    Training(TrainingResponse),
    Generation(GenerationResponse),
}

impl NormalizedResponse {
    /// The all-defaults response for an operation.
    pub fn default_for(operation: Operation) -> Self {
        match operation {
            Operation::SentimentAnalysis => Self::Sentiment(SentimentResponse::default()),
            Operation::InsightGeneration => Self::Insights(InsightsResponse::default()),
            Operation::KnowledgeQuery => Self::Knowledge(KnowledgeResponse::default()),
            Operation::ModelTraining => Self::Training(TrainingResponse::default()),
            Operation::FreeformGeneration => Self::Generation(GenerationResponse::default()),
        }
    }

    pub fn operation(&self) -> Operation {
        match self {
            Self::Sentiment(_) => Operation::SentimentAnalysis,
            Self::Insights(_) => Operation::InsightGeneration,
            Self::Knowledge(_) => Operation::KnowledgeQuery,
            Self::Training(_) => Operation::ModelTraining,
            Self::Generation(_) => Operation::FreeformGeneration,
        }
    }

    /// Diagnostic marker set when no capability produced a usable answer.
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Sentiment(r) => r.error.as_deref(),
            Self::Insights(r) => r.error.as_deref(),
            Self::Knowledge(r) => r.error.as_deref(),
            Self::Training(r) => r.error.as_deref(),
            Self::Generation(r) => r.error.as_deref(),
        }
    }

    /// Render as a JSON value.
    pub fn to_value(&self) -> Value {
        // Every variant is a plain struct of strings and numbers.
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

/// Final router output: a normalized response plus provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutedResponse {
    pub response: NormalizedResponse,
    /// Name of the capability that answered, or `"none"` after total failure.
    pub backend: String,
    pub degraded: bool,
}
