//! Fallback router.
//!
//! Each invocation walks a small state machine:
//!
//! ```text
//!             ┌─────────┐  Ok                       ┌──────────────────────┐
//!  input ───► │ Primary │ ────────────────────────► │ Done (degraded=false)│
//!             └────┬────┘                           └──────────────────────┘
//!                  │ capability error, secondary configured
//!                  ▼
//!             ┌──────────┐  Ok                      ┌──────────────────────┐
//!             │ Fallback │ ───────────────────────► │ Done (degraded=true) │
//!             └────┬─────┘                          └──────────────────────┘
//!                  │ error
//!                  ▼
//!        Done: synthesized default response with an `error` marker (degraded=true)
//! ```
//!
//! The router never returns an error. Capabilities are called strictly one
//! after the other; there is no racing and no timeout-triggered fallback.

pub mod normalize;

use std::time::Instant;

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::Value;
use tracing::{error, info, instrument, warn};

use crate::capability::{CapabilityRole, CapabilitySet};
use crate::telemetry;
use crate::transform::{CapabilityPayload, RequestTransformer};
use crate::types::{
    GenerationResponse, InsightsResponse, KnowledgeResponse, NormalizedResponse, Operation,
    OperationInput, RoutedResponse, SentimentResponse, TrainingResponse,
};
use crate::{BifrostError, Result};

/// Backend identifier reported when no capability produced the answer.
pub const NO_BACKEND: &str = "none";

/// Shown to callers when insight generation is unavailable.
pub const INSIGHTS_FALLBACK_MESSAGE: &str =
    "Please contact your delivery team for detailed analysis";

/// Answer returned when the knowledge base cannot be reached.
pub const KNOWLEDGE_UNAVAILABLE_ANSWER: &str =
    "Knowledge base temporarily unavailable. Please consult the documentation.";

/// Per-invocation router state.
#[derive(Debug)]
enum RouteState {
    Primary,
    Fallback { cause: BifrostError },
    Done(RoutedResponse),
}

/// Routes operations to capabilities, falling back on failure.
#[derive(Clone)]
pub struct FallbackRouter {
    capabilities: CapabilitySet,
    transformer: RequestTransformer,
}

impl FallbackRouter {
    pub fn new(capabilities: CapabilitySet, transformer: RequestTransformer) -> Self {
        Self {
            capabilities,
            transformer,
        }
    }

    pub fn capabilities(&self) -> &CapabilitySet {
        &self.capabilities
    }

    pub fn transformer(&self) -> &RequestTransformer {
        &self.transformer
    }

    /// Route one invocation to completion.
    #[instrument(skip(self, input), fields(operation = %input.operation()))]
    pub async fn route(&self, input: &OperationInput) -> RoutedResponse {
        let operation = input.operation();
        let start = Instant::now();
        let now = Utc::now();

        let mut state = RouteState::Primary;
        let routed = loop {
            state = match state {
                RouteState::Primary => match self.attempt_primary(input, now).await {
                    Ok(done) => RouteState::Done(done),
                    Err(e) => self.after_primary_failure(operation, input, e, now),
                },
                RouteState::Fallback { cause } => match self.attempt_secondary(input).await {
                    Ok(done) => RouteState::Done(done),
                    Err(e) => {
                        error!(
                            %operation,
                            primary_error = %cause,
                            secondary_error = %e,
                            "secondary capability failed"
                        );
                        RouteState::Done(self.synthesize(input, &e, now))
                    }
                },
                RouteState::Done(routed) => break routed,
            };
        };

        Self::record(operation, &routed, start);
        routed
    }

    fn after_primary_failure(
        &self,
        operation: Operation,
        input: &OperationInput,
        e: BifrostError,
        now: DateTime<Utc>,
    ) -> RouteState {
        let secondary = CapabilityRole::secondary_for(operation);
        if e.is_capability_error() && secondary.is_some() {
            warn!(%operation, error = %e, kind = e.kind(), transient = e.is_transient(), "primary capability failed, falling back");
            metrics::counter!(telemetry::FALLBACKS_TOTAL,
                "operation" => operation.as_str(),
                "reason" => e.kind(),
            )
            .increment(1);
            RouteState::Fallback { cause: e }
        } else {
            error!(%operation, error = %e, kind = e.kind(), "capability failed");
            RouteState::Done(self.synthesize(input, &e, now))
        }
    }

    async fn attempt_primary(
        &self,
        input: &OperationInput,
        now: DateTime<Utc>,
    ) -> Result<RoutedResponse> {
        let operation = input.operation();
        let role = CapabilityRole::primary_for(operation);
        let payload = self.transformer.primary(input, now);
        let (backend, reply) = self.invoke(role, &payload).await?;

        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let models = self.transformer.models();
        let response = match input {
            OperationInput::SentimentAnalysis { .. } => {
                NormalizedResponse::Sentiment(normalize::sentiment_primary(&backend, &reply)?)
            }
            OperationInput::InsightGeneration { .. } => NormalizedResponse::Insights(
                normalize::insights(&backend, &reply, &models.insights_model, timestamp)?,
            ),
            OperationInput::KnowledgeQuery { .. } => {
                NormalizedResponse::Knowledge(normalize::knowledge(&backend, &reply, timestamp)?)
            }
            OperationInput::ModelTraining { .. } => {
                let response = normalize::training(
                    &backend,
                    &reply,
                    &payload.capability_id,
                    self.transformer.region(),
                )?;
                info!(job = %response.training_job_name, "training job started");
                NormalizedResponse::Training(response)
            }
            OperationInput::FreeformGeneration { prompt } => {
                NormalizedResponse::Generation(normalize::generation(
                    &backend,
                    &reply,
                    &payload.capability_id,
                    prompt,
                )?)
            }
        };

        Ok(RoutedResponse {
            response,
            backend,
            degraded: false,
        })
    }

    async fn attempt_secondary(&self, input: &OperationInput) -> Result<RoutedResponse> {
        let operation = input.operation();
        let role = CapabilityRole::secondary_for(operation)
            .ok_or(BifrostError::NoCapability("secondary"))?;
        let payload = self
            .transformer
            .secondary(input)
            .ok_or(BifrostError::NoCapability("secondary"))?;
        let (backend, reply) = self.invoke(role, &payload).await?;

        let response = match input {
            OperationInput::SentimentAnalysis { .. } => {
                NormalizedResponse::Sentiment(normalize::sentiment_secondary(&backend, &reply)?)
            }
            _ => return Err(BifrostError::NoCapability("secondary")),
        };

        info!(%operation, %backend, "served by secondary capability");
        Ok(RoutedResponse {
            response,
            backend,
            degraded: true,
        })
    }

    async fn invoke(
        &self,
        role: CapabilityRole,
        payload: &CapabilityPayload,
    ) -> Result<(String, Value)> {
        let capability = self
            .capabilities
            .get(role)
            .ok_or(BifrostError::NoCapability(role.as_str()))?;
        let reply = capability
            .invoke(&payload.capability_id, &payload.body)
            .await?;
        Ok((capability.name().to_string(), reply))
    }

    /// Well-formed response for an invocation no capability could serve.
    ///
    /// Marked degraded: it did not come from the primary capability.
    fn synthesize(
        &self,
        input: &OperationInput,
        cause: &BifrostError,
        now: DateTime<Utc>,
    ) -> RoutedResponse {
        let timestamp = now.to_rfc3339_opts(SecondsFormat::Millis, true);
        let response = match input {
            OperationInput::SentimentAnalysis { .. } => {
                NormalizedResponse::Sentiment(SentimentResponse {
                    sentiment: "neutral".to_string(),
                    confidence: 0.5,
                    model_version: "fallback".to_string(),
                    processing_time_ms: None,
                    error: Some("Analysis unavailable".to_string()),
                })
            }
            OperationInput::InsightGeneration { .. } => {
                NormalizedResponse::Insights(InsightsResponse {
                    text: String::new(),
                    model_identifier: self.transformer.models().insights_model.clone(),
                    token_count: 0,
                    timestamp,
                    error: Some("Unable to generate insights".to_string()),
                    fallback_message: Some(INSIGHTS_FALLBACK_MESSAGE.to_string()),
                })
            }
            OperationInput::KnowledgeQuery { .. } => {
                NormalizedResponse::Knowledge(KnowledgeResponse {
                    answer: KNOWLEDGE_UNAVAILABLE_ANSWER.to_string(),
                    source_uris: Vec::new(),
                    confidence: "low".to_string(),
                    query_processed_at: timestamp,
                    error: Some(cause.to_string()),
                })
            }
            OperationInput::ModelTraining { request } => {
                NormalizedResponse::Training(TrainingResponse {
                    training_job_name: crate::transform::training_job_name(
                        &request.model_name,
                        now,
                    ),
                    status: "Failed".to_string(),
                    error: Some("Failed to start training job".to_string()),
                    details: Some(cause.to_string()),
                    ..Default::default()
                })
            }
            OperationInput::FreeformGeneration { prompt } => {
                NormalizedResponse::Generation(GenerationResponse {
                    model: self.transformer.models().generation_model.clone(),
                    prompt: prompt.clone(),
                    output: String::new(),
                    error: Some("Generation unavailable".to_string()),
                })
            }
        };
        RoutedResponse {
            response,
            backend: NO_BACKEND.to_string(),
            degraded: true,
        }
    }

    fn record(operation: Operation, routed: &RoutedResponse, start: Instant) {
        let outcome = if routed.response.error().is_some() {
            "failed"
        } else if routed.degraded {
            "degraded"
        } else {
            "primary"
        };
        metrics::counter!(telemetry::REQUESTS_TOTAL,
            "operation" => operation.as_str(),
            "backend" => routed.backend.clone(),
            "outcome" => outcome,
        )
        .increment(1);
        metrics::histogram!(telemetry::REQUEST_DURATION_SECONDS,
            "operation" => operation.as_str(),
        )
        .record(start.elapsed().as_secs_f64());
    }
}
