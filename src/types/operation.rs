//! Logical operations a caller can request.

use serde::{Deserialize, Serialize};

use super::GenerationConfig;

/// Paths served by the request dispatcher, in discovery order.
pub const ROUTED_PATHS: [&str; 3] = ["/analyze-sentiment", "/generate-insights", "/query-knowledge"];

/// The task a caller asked for.
///
/// Selects the request transformer and the router policy for one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SentimentAnalysis,
    InsightGeneration,
    KnowledgeQuery,
    ModelTraining,
    FreeformGeneration,
}

impl Operation {
    /// Every operation, in declaration order.
    pub const ALL: [Operation; 5] = [
        Operation::SentimentAnalysis,
        Operation::InsightGeneration,
        Operation::KnowledgeQuery,
        Operation::ModelTraining,
        Operation::FreeformGeneration,
    ];

    /// Stable name used in logs and metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::SentimentAnalysis => "analyze_sentiment",
            Operation::InsightGeneration => "generate_insights",
            Operation::KnowledgeQuery => "query_knowledge",
            Operation::ModelTraining => "train_model",
            Operation::FreeformGeneration => "generate",
        }
    }

    /// HTTP path for operations exposed through the dispatcher.
    pub fn path(&self) -> Option<&'static str> {
        match self {
            Operation::SentimentAnalysis => Some(ROUTED_PATHS[0]),
            Operation::InsightGeneration => Some(ROUTED_PATHS[1]),
            Operation::KnowledgeQuery => Some(ROUTED_PATHS[2]),
            Operation::ModelTraining | Operation::FreeformGeneration => None,
        }
    }

    /// Map an inbound `(method, path)` pair to an operation.
    ///
    /// Method comparison is exact, as gateways hand it over upper-cased.
    pub fn from_route(method: &str, path: &str) -> Option<Self> {
        if method != "POST" {
            return None;
        }
        Self::ALL
            .into_iter()
            .find(|op| op.path() == Some(path))
    }

    /// Whether the router has a secondary capability to fall back to.
    pub fn has_fallback(&self) -> bool {
        matches!(self, Operation::SentimentAnalysis)
    }

    /// Fixed generation parameters for the primary capability, if it generates text.
    pub fn generation_config(&self) -> Option<GenerationConfig> {
        match self {
            Operation::SentimentAnalysis | Operation::ModelTraining => None,
            Operation::InsightGeneration => Some(GenerationConfig::INSIGHTS),
            Operation::KnowledgeQuery => Some(GenerationConfig::KNOWLEDGE),
            Operation::FreeformGeneration => Some(GenerationConfig::FREEFORM),
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
