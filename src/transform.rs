//! Request transformer: operation input to capability payload.
//!
//! Every function here is pure. Given identical input, configuration and
//! submission time, the serialized payload is byte-identical; object keys are
//! emitted in sorted order. Anything time-dependent (training job names) takes
//! the timestamp as an argument instead of reading the clock.

use chrono::{DateTime, Utc};
use serde_json::{Value, json};

use crate::config::{ModelsConfig, TrainingConfig};
use crate::types::{
    CustomerProfile, GenerationConfig, KnowledgeContext, OperationInput, TrainingRequest,
};

/// Version tag required by messages-style model runtimes.
pub const MESSAGES_API_VERSION: &str = "bedrock-2023-05-31";

/// A payload addressed to one capability identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct CapabilityPayload {
    /// Model ID, endpoint name, knowledge base ID or job name.
    pub capability_id: String,
    pub body: Value,
}

impl CapabilityPayload {
    /// Serialized body, as sent on the wire.
    pub fn to_bytes(&self) -> Vec<u8> {
        // Values built from `json!` always serialize.
        serde_json::to_vec(&self.body).unwrap_or_default()
    }
}

/// Builds capability payloads from the configured identifiers.
#[derive(Debug, Clone)]
pub struct RequestTransformer {
    models: ModelsConfig,
    training: TrainingConfig,
    region: String,
}

impl RequestTransformer {
    pub fn new(models: ModelsConfig, training: TrainingConfig, region: impl Into<String>) -> Self {
        Self {
            models,
            training,
            region: region.into(),
        }
    }

    pub fn models(&self) -> &ModelsConfig {
        &self.models
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Payload for the operation's preferred capability.
    pub fn primary(&self, input: &OperationInput, submitted_at: DateTime<Utc>) -> CapabilityPayload {
        match input {
            OperationInput::SentimentAnalysis { text } => CapabilityPayload {
                capability_id: self.models.sentiment_endpoint.clone(),
                body: sentiment_body(text),
            },
            OperationInput::InsightGeneration { profile } => CapabilityPayload {
                capability_id: self.models.insights_model.clone(),
                body: insights_body(profile, &GenerationConfig::INSIGHTS),
            },
            OperationInput::KnowledgeQuery { query, context } => CapabilityPayload {
                capability_id: self.models.knowledge_base_id.clone(),
                body: knowledge_body(
                    query,
                    context,
                    &self.models.knowledge_base_id,
                    &self.models.knowledge_model_arn(&self.region),
                    &GenerationConfig::KNOWLEDGE,
                ),
            },
            OperationInput::ModelTraining { request } => {
                let job_name = training_job_name(&request.model_name, submitted_at);
                CapabilityPayload {
                    body: training_body(request, &job_name, &self.training, &self.region),
                    capability_id: job_name,
                }
            }
            OperationInput::FreeformGeneration { prompt } => CapabilityPayload {
                capability_id: self.models.generation_model.clone(),
                body: text_generation_body(prompt, &GenerationConfig::FREEFORM),
            },
        }
    }

    /// Payload for the secondary capability, for operations that have one.
    pub fn secondary(&self, input: &OperationInput) -> Option<CapabilityPayload> {
        match input {
            OperationInput::SentimentAnalysis { text } => Some(CapabilityPayload {
                capability_id: self.models.sentiment_fallback_model.clone(),
                body: text_generation_body(
                    &sentiment_prompt(text),
                    &GenerationConfig::SENTIMENT_FALLBACK,
                ),
            }),
            _ => None,
        }
    }
}

/// Hosted classifier request.
pub fn sentiment_body(text: &str) -> Value {
    json!({ "instances": [{ "text": text }] })
}

/// Prompt asking a text model to classify sentiment as JSON.
pub fn sentiment_prompt(text: &str) -> String {
    format!(
        "Analyze the sentiment of this text and return only a JSON response:\n\n\
         Text: \"{text}\"\n\n\
         Return format:\n\
         {{\"sentiment\": \"positive|negative|neutral\", \"confidence\": 0.95}}"
    )
}

/// Single-prompt text model request.
pub fn text_generation_body(prompt: &str, config: &GenerationConfig) -> Value {
    json!({
        "inputText": prompt,
        "textGenerationConfig": {
            "maxTokenCount": config.max_tokens,
            "temperature": config.temperature,
            "topP": config.top_p,
        }
    })
}

/// Prompt for customer insight generation.
pub fn insights_prompt(profile: &CustomerProfile) -> String {
    format!(
        "Analyze this customer data and provide actionable insights for a cloud migration:\n\n\
         Customer Information:\n\
         - Company: {}\n\
         - Industry: {}\n\
         - Current Infrastructure: {}\n\
         - Business Goals: {}\n\
         - Technical Requirements: {}\n\n\
         Please provide:\n\
         1. Recommended architecture approach\n\
         2. Migration strategy and timeline\n\
         3. Cost optimization opportunities\n\
         4. Security and compliance considerations\n\
         5. Success metrics and KPIs\n\n\
         Format the response as structured recommendations for a delivery engagement.",
        profile.company,
        profile.industry,
        profile.current_infrastructure,
        profile.business_goals,
        profile.tech_requirements,
    )
}

/// Messages-style request for insight generation.
pub fn insights_body(profile: &CustomerProfile, config: &GenerationConfig) -> Value {
    json!({
        "anthropic_version": MESSAGES_API_VERSION,
        "max_tokens": config.max_tokens,
        "temperature": config.temperature,
        "top_p": config.top_p,
        "messages": [
            { "role": "user", "content": insights_prompt(profile) }
        ]
    })
}

/// Query text enriched with the customer context.
pub fn knowledge_query_text(query: &str, context: &KnowledgeContext) -> String {
    format!(
        "Customer Context: {} industry, {} company size\n\n\
         Query: {query}\n\n\
         Focus on cloud best practices and proven delivery approaches.",
        context.industry, context.size,
    )
}

/// Retrieve-and-generate request against a knowledge base.
pub fn knowledge_body(
    query: &str,
    context: &KnowledgeContext,
    knowledge_base_id: &str,
    model_arn: &str,
    config: &GenerationConfig,
) -> Value {
    json!({
        "input": { "text": knowledge_query_text(query, context) },
        "retrieveAndGenerateConfiguration": {
            "type": "KNOWLEDGE_BASE",
            "knowledgeBaseConfiguration": {
                "knowledgeBaseId": knowledge_base_id,
                "modelArn": model_arn,
                "generationConfiguration": {
                    "inferenceConfig": {
                        "textInferenceConfig": {
                            "temperature": config.temperature,
                            "topP": config.top_p,
                            "maxTokens": config.max_tokens,
                        }
                    }
                }
            }
        }
    })
}

/// `<model>-<YYYYmmdd-HHMMSS>` in UTC.
pub fn training_job_name(model_name: &str, submitted_at: DateTime<Utc>) -> String {
    format!("{model_name}-{}", submitted_at.format("%Y%m%d-%H%M%S"))
}

/// Training job submission request.
pub fn training_body(
    request: &TrainingRequest,
    job_name: &str,
    training: &TrainingConfig,
    region: &str,
) -> Value {
    let tags: Vec<Value> = training
        .tags
        .iter()
        .map(|(key, value)| json!({ "Key": key, "Value": value }))
        .collect();
    json!({
        "TrainingJobName": job_name,
        "AlgorithmSpecification": {
            "TrainingInputMode": "File",
            "TrainingImage": training.image(region),
        },
        "RoleArn": training.role_arn,
        "InputDataConfig": [{
            "ChannelName": "training",
            "DataSource": {
                "S3DataSource": {
                    "S3DataType": "S3Prefix",
                    "S3Uri": request.training_data_uri,
                    "S3DataDistributionType": "FullyReplicated",
                }
            },
            "ContentType": "text/csv",
            "CompressionType": "None",
        }],
        "OutputDataConfig": {
            "S3OutputPath": format!(
                "{}/{}/",
                training.output_prefix.trim_end_matches('/'),
                request.model_name
            ),
        },
        "ResourceConfig": {
            "InstanceType": training.instance_type,
            "InstanceCount": training.instance_count,
            "VolumeSizeInGB": training.volume_size_gb,
        },
        "StoppingCondition": { "MaxRuntimeInSeconds": training.max_runtime_secs },
        "Tags": tags,
    })
}
