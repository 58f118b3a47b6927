//! Operation inputs with explicit per-field defaults.
//!
//! Inbound bodies are loosely shaped JSON. Rather than checking for field
//! presence throughout the transformers, each operation's input is resolved
//! once into a typed value where every absent or unusable field already
//! carries its documented default.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Operation;

/// Prompt used when a generation request carries no usable prompt.
pub const DEFAULT_PROMPT: &str = "Say hello in one short sentence.";

/// Input for one invocation of an [`Operation`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "snake_case")]
pub enum OperationInput {
    /// Text whose sentiment is classified.
    SentimentAnalysis { text: String },
    /// Customer profile to derive insights from.
    InsightGeneration { profile: CustomerProfile },
    /// Question against the knowledge base.
    KnowledgeQuery {
        query: String,
        context: KnowledgeContext,
    },
    /// Training job submission.
    ModelTraining { request: TrainingRequest },
    /// One-shot generation prompt.
    FreeformGeneration { prompt: String },
}

impl OperationInput {
    /// The operation this input belongs to.
    pub fn operation(&self) -> Operation {
        match self {
            OperationInput::SentimentAnalysis { .. } => Operation::SentimentAnalysis,
            OperationInput::InsightGeneration { .. } => Operation::InsightGeneration,
            OperationInput::KnowledgeQuery { .. } => Operation::KnowledgeQuery,
            OperationInput::ModelTraining { .. } => Operation::ModelTraining,
            OperationInput::FreeformGeneration { .. } => Operation::FreeformGeneration,
        }
    }

    /// Resolve an input from a decoded request body.
    ///
    /// Never fails: anything that is not a JSON object is treated as an empty
    /// body, and missing fields take their defaults.
    pub fn from_body(operation: Operation, body: &Value) -> Self {
        let empty = Map::new();
        let fields = body.as_object().unwrap_or(&empty);
        match operation {
            Operation::SentimentAnalysis => OperationInput::SentimentAnalysis {
                text: string_field(fields, &["text"]).unwrap_or_default(),
            },
            Operation::InsightGeneration => OperationInput::InsightGeneration {
                profile: object_field(fields, &["customer_data", "customerProfile"])
                    .map(CustomerProfile::from_fields)
                    .unwrap_or_default(),
            },
            Operation::KnowledgeQuery => OperationInput::KnowledgeQuery {
                query: string_field(fields, &["query"]).unwrap_or_default(),
                context: object_field(fields, &["context"])
                    .map(KnowledgeContext::from_fields)
                    .unwrap_or_default(),
            },
            Operation::ModelTraining => OperationInput::ModelTraining {
                request: TrainingRequest::from_fields(fields),
            },
            Operation::FreeformGeneration => OperationInput::FreeformGeneration {
                prompt: string_field(fields, &["prompt"])
                    .filter(|p| !p.is_empty())
                    .unwrap_or_else(|| DEFAULT_PROMPT.to_string()),
            },
        }
    }

    /// The input substituted when a request has no usable body.
    pub fn default_for(operation: Operation) -> Self {
        Self::from_body(operation, &Value::Null)
    }
}

/// Customer profile used for insight generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerProfile {
    pub company: String,
    pub industry: String,
    pub current_infrastructure: String,
    pub business_goals: String,
    pub tech_requirements: String,
}

impl Default for CustomerProfile {
    fn default() -> Self {
        Self {
            company: "Unknown".to_string(),
            industry: "Unknown".to_string(),
            current_infrastructure: "On-premises".to_string(),
            business_goals: "Cost optimization".to_string(),
            tech_requirements: "Scalability".to_string(),
        }
    }
}

impl CustomerProfile {
    /// Accepts both snake_case and camelCase field names.
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            company: string_field(fields, &["company"]).unwrap_or(defaults.company),
            industry: string_field(fields, &["industry"]).unwrap_or(defaults.industry),
            current_infrastructure: string_field(
                fields,
                &["current_infrastructure", "currentInfrastructure"],
            )
            .unwrap_or(defaults.current_infrastructure),
            business_goals: string_field(fields, &["business_goals", "businessGoals"])
                .unwrap_or(defaults.business_goals),
            tech_requirements: string_field(fields, &["tech_requirements", "techRequirements"])
                .unwrap_or(defaults.tech_requirements),
        }
    }
}

/// Customer context attached to a knowledge query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeContext {
    pub industry: String,
    pub size: String,
}

impl Default for KnowledgeContext {
    fn default() -> Self {
        Self {
            industry: "General".to_string(),
            size: "Medium".to_string(),
        }
    }
}

impl KnowledgeContext {
    fn from_fields(fields: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            industry: string_field(fields, &["industry"]).unwrap_or(defaults.industry),
            size: string_field(fields, &["size"]).unwrap_or(defaults.size),
        }
    }
}

/// Training job submission parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRequest {
    /// Object-store prefix holding the training data.
    pub training_data_uri: String,
    /// Base name for the job and its output location.
    pub model_name: String,
}

impl Default for TrainingRequest {
    fn default() -> Self {
        Self {
            training_data_uri: String::new(),
            model_name: "custom-model".to_string(),
        }
    }
}

impl TrainingRequest {
    pub fn new(training_data_uri: impl Into<String>, model_name: impl Into<String>) -> Self {
        Self {
            training_data_uri: training_data_uri.into(),
            model_name: model_name.into(),
        }
    }

    fn from_fields(fields: &Map<String, Value>) -> Self {
        let defaults = Self::default();
        Self {
            training_data_uri: string_field(fields, &["training_data_uri", "trainingDataUri"])
                .unwrap_or(defaults.training_data_uri),
            model_name: string_field(fields, &["model_name", "modelName"])
                .filter(|name| !name.is_empty())
                .unwrap_or(defaults.model_name),
        }
    }
}

/// First string value found under any of `keys`.
///
/// Numbers and booleans are rendered as text; objects, arrays and null
/// count as absent.
fn string_field(fields: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(|value| match value {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Bool(b) => Some(b.to_string()),
            _ => None,
        })
}

fn object_field<'a>(fields: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Map<String, Value>> {
    keys.iter()
        .filter_map(|key| fields.get(*key))
        .find_map(Value::as_object)
}
