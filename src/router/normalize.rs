//! Capability replies to normalized responses.
//!
//! Parsing is lenient about missing leaf fields, which take defaults, and
//! strict about structure: a reply that is not an object, or that lacks the
//! one field an operation cannot do without, is a malformed response and
//! sends the router down its failure path.

use serde_json::{Map, Value};

use crate::capability::http::{META_KEY, MODEL_VERSION_HEADER, PROCESSING_TIME_HEADER};
use crate::types::{
    GenerationResponse, InsightsResponse, KnowledgeResponse, SentimentResponse, TrainingResponse,
};
use crate::{BifrostError, Result};

/// Model version reported for answers from the secondary sentiment path.
pub const SENTIMENT_FALLBACK_VERSION: &str = "bedrock-fallback";

/// Confidence assumed when the secondary sentiment path gives none.
pub const SENTIMENT_FALLBACK_CONFIDENCE: f64 = 0.8;

/// Processing time reported when the classifier gives none.
pub const UNKNOWN_PROCESSING_TIME: &str = "unknown";

pub const TRAINING_ESTIMATED_COMPLETION: &str = "30-60 minutes";

fn object<'a>(capability: &str, value: &'a Value) -> Result<&'a Map<String, Value>> {
    value.as_object().ok_or_else(|| malformed(capability, "reply is not a JSON object"))
}

fn malformed(capability: &str, reason: &str) -> BifrostError {
    BifrostError::MalformedResponse {
        capability: capability.to_string(),
        reason: reason.to_string(),
    }
}

fn text_at<'a>(value: &'a Value, pointer: &str) -> Option<&'a str> {
    value.pointer(pointer).and_then(Value::as_str)
}

/// Hosted classifier reply: `{"predictions": [{"sentiment", "confidence"}]}`.
///
/// Model version and processing time come from the endpoint's response
/// headers when the capability forwarded them, else from the body.
pub fn sentiment_primary(capability: &str, reply: &Value) -> Result<SentimentResponse> {
    let fields = object(capability, reply)?;
    let prediction = match fields.get("predictions") {
        None => None,
        Some(Value::Array(items)) => Some(
            items
                .first()
                .filter(|p| p.is_object())
                .ok_or_else(|| malformed(capability, "predictions is empty"))?,
        ),
        Some(_) => return Err(malformed(capability, "predictions is not an array")),
    };

    let defaults = SentimentResponse::default();
    let sentiment = prediction
        .and_then(|p| p.get("sentiment"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or(defaults.sentiment);
    let confidence = prediction
        .and_then(|p| p.get("confidence"))
        .and_then(Value::as_f64)
        .unwrap_or(defaults.confidence);
    let header = |name: &str| {
        fields
            .get(META_KEY)
            .and_then(|meta| meta.get(name))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let model_version = header(MODEL_VERSION_HEADER)
        .or_else(|| {
            ["modelVersion", "model_version"]
                .iter()
                .find_map(|key| fields.get(*key).and_then(Value::as_str))
                .map(str::to_string)
        })
        .unwrap_or(defaults.model_version);
    let processing_time_ms = header(PROCESSING_TIME_HEADER)
        .or_else(|| {
            fields.get("processingTimeMs").and_then(|v| match v {
                Value::String(s) => Some(s.clone()),
                Value::Number(n) => Some(n.to_string()),
                _ => None,
            })
        })
        .unwrap_or_else(|| UNKNOWN_PROCESSING_TIME.to_string());

    Ok(SentimentResponse {
        sentiment,
        confidence,
        model_version,
        processing_time_ms: Some(processing_time_ms),
        error: None,
    })
}

/// Text model reply on the secondary sentiment path.
///
/// Takes `sentiment`/`confidence` from the top level when present, otherwise
/// from JSON embedded in `results[0].outputText`, otherwise neutral.
pub fn sentiment_secondary(capability: &str, reply: &Value) -> Result<SentimentResponse> {
    let fields = object(capability, reply)?;
    let embedded = text_at(reply, "/results/0/outputText")
        .and_then(extract_json_object)
        .unwrap_or_default();

    let pick = |key: &str| fields.get(key).or_else(|| embedded.get(key)).cloned();

    Ok(SentimentResponse {
        sentiment: pick("sentiment")
            .as_ref()
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| "neutral".to_string()),
        confidence: pick("confidence")
            .as_ref()
            .and_then(Value::as_f64)
            .unwrap_or(SENTIMENT_FALLBACK_CONFIDENCE),
        model_version: SENTIMENT_FALLBACK_VERSION.to_string(),
        processing_time_ms: None,
        error: None,
    })
}

/// First complete JSON object in model output; trailing text is ignored.
fn extract_json_object(text: &str) -> Option<Map<String, Value>> {
    let start = text.find('{')?;
    match serde_json::Deserializer::from_str(&text[start..])
        .into_iter::<Value>()
        .next()?
    {
        Ok(Value::Object(map)) => Some(map),
        _ => None,
    }
}

/// Messages-style reply: `content[0].text`, `usage.output_tokens`.
pub fn insights(
    capability: &str,
    reply: &Value,
    model_identifier: &str,
    timestamp: String,
) -> Result<InsightsResponse> {
    object(capability, reply)?;
    let text = text_at(reply, "/content/0/text")
        .ok_or_else(|| malformed(capability, "missing content[0].text"))?;
    Ok(InsightsResponse {
        text: text.to_string(),
        model_identifier: model_identifier.to_string(),
        token_count: reply
            .pointer("/usage/output_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0),
        timestamp,
        error: None,
        fallback_message: None,
    })
}

/// Retrieve-and-generate reply: `output.text` plus citation URIs.
///
/// Citations may carry the location directly or a list of
/// `retrievedReferences`; both are flattened in order.
pub fn knowledge(capability: &str, reply: &Value, processed_at: String) -> Result<KnowledgeResponse> {
    object(capability, reply)?;
    let answer = text_at(reply, "/output/text")
        .ok_or_else(|| malformed(capability, "missing output.text"))?;

    let mut source_uris = Vec::new();
    for citation in reply
        .get("citations")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
    {
        if let Some(uri) = text_at(citation, "/location/s3Location/uri") {
            source_uris.push(uri.to_string());
        }
        for reference in citation
            .get("retrievedReferences")
            .and_then(Value::as_array)
            .into_iter()
            .flatten()
        {
            if let Some(uri) = text_at(reference, "/location/s3Location/uri") {
                source_uris.push(uri.to_string());
            }
        }
    }

    let defaults = KnowledgeResponse::default();
    Ok(KnowledgeResponse {
        answer: answer.to_string(),
        source_uris,
        confidence: text_at(reply, "/guardrailAction/confidence")
            .map(str::to_string)
            .unwrap_or(defaults.confidence),
        query_processed_at: processed_at,
        error: None,
    })
}

/// Training submission reply: `TrainingJobArn`.
pub fn training(
    capability: &str,
    reply: &Value,
    job_name: &str,
    region: &str,
) -> Result<TrainingResponse> {
    object(capability, reply)?;
    let arn = text_at(reply, "/TrainingJobArn")
        .ok_or_else(|| malformed(capability, "missing TrainingJobArn"))?;
    Ok(TrainingResponse {
        training_job_name: job_name.to_string(),
        training_job_arn: arn.to_string(),
        status: "InProgress".to_string(),
        estimated_completion: TRAINING_ESTIMATED_COMPLETION.to_string(),
        monitoring_url: monitoring_url(job_name, region),
        error: None,
        details: None,
    })
}

pub fn monitoring_url(job_name: &str, region: &str) -> String {
    format!("https://console.aws.amazon.com/sagemaker/home?region={region}#/jobs/{job_name}")
}

/// Text model reply: `results[0].outputText`, empty when absent.
pub fn generation(
    capability: &str,
    reply: &Value,
    model: &str,
    prompt: &str,
) -> Result<GenerationResponse> {
    object(capability, reply)?;
    Ok(GenerationResponse {
        model: model.to_string(),
        prompt: prompt.to_string(),
        output: text_at(reply, "/results/0/outputText")
            .unwrap_or_default()
            .to_string(),
        error: None,
    })
}
