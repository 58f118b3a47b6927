//! Public types for the Bifrost API.

mod generation;
mod input;
mod operation;
mod response;
mod stream;

pub use generation::GenerationConfig;
pub use input::{
    CustomerProfile, DEFAULT_PROMPT, KnowledgeContext, OperationInput, TrainingRequest,
};
pub use operation::{Operation, ROUTED_PATHS};
pub use response::{
    BackendResult, GenerationResponse, InsightsResponse, KnowledgeResponse, NormalizedResponse,
    RoutedResponse, SentimentResponse, TrainingResponse,
};
pub use stream::{
    BatchOutcome, BatchResponse, OutputRef, StreamEvent, StreamEventRecord, StreamPayload,
    StreamRecord, utf8_dropping_invalid,
};
