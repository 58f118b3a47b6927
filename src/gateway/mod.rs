//! Gateway assembly: configuration in, dispatcher and ingestor out.

mod builder;

pub use builder::{Bifrost, BifrostBuilder, backend_names};

use tracing::instrument;

use crate::dispatch::{Dispatcher, InboundRequest, ResponseEnvelope};
use crate::ingest::Ingestor;
use crate::types::{BatchResponse, OperationInput, RoutedResponse, StreamEvent, TrainingRequest};

/// A fully wired gateway.
///
/// Cheap to clone; clones share capabilities and the object store.
#[derive(Clone)]
pub struct Gateway {
    dispatcher: Dispatcher,
    ingestor: Ingestor,
}

impl Gateway {
    pub(crate) fn new(dispatcher: Dispatcher, ingestor: Ingestor) -> Self {
        Self {
            dispatcher,
            ingestor,
        }
    }

    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    pub fn ingestor(&self) -> &Ingestor {
        &self.ingestor
    }

    /// Handle a request on the sentiment/insights/knowledge API.
    pub async fn handle_request(&self, request: InboundRequest) -> ResponseEnvelope {
        self.dispatcher.dispatch(request).await
    }

    /// Handle a one-shot generation request.
    pub async fn handle_generation(&self, request: InboundRequest) -> ResponseEnvelope {
        self.dispatcher.dispatch_generation(request).await
    }

    /// Process a stream batch. Always acknowledged.
    #[instrument(skip(self, event))]
    pub async fn handle_stream_event(&self, event: StreamEvent) -> BatchResponse {
        self.ingestor.handle_event(event).await
    }

    /// Submit a training job.
    pub async fn submit_training(&self, request: TrainingRequest) -> RoutedResponse {
        self.dispatcher.submit_training(request).await
    }

    /// Route an already-resolved input.
    pub async fn route(&self, input: &OperationInput) -> RoutedResponse {
        self.dispatcher.route(input).await
    }
}
