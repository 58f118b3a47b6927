//! Bifrost - inference dispatch core
//!
//! Routes business operations (sentiment analysis, customer insights,
//! knowledge queries, model training and free-form generation) to remote
//! inference capabilities. Requests are normalized into capability payloads,
//! answered by a preferred capability, retried against a secondary one where
//! the operation has it, and always returned as a well-formed response.
//! A separate ingestion path persists batches of stream records one by one.
//!
//! # Example
//!
//! ```rust,no_run
//! use bifrost::{Bifrost, Config, InboundRequest, Secrets};
//!
//! #[tokio::main]
//! async fn main() -> bifrost::Result<()> {
//!     let gateway = Bifrost::builder()
//!         .config(Config::load(None)?)
//!         .secrets(Secrets::load()?)
//!         .build()?;
//!
//!     let response = gateway
//!         .handle_request(
//!             InboundRequest::new("POST", "/analyze-sentiment")
//!                 .with_body(r#"{"text": "The rollout went smoothly"}"#),
//!         )
//!         .await;
//!
//!     println!("{}", response.body);
//!     Ok(())
//! }
//! ```

pub mod capability;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod ingest;
pub mod router;
#[cfg(feature = "server")]
pub mod server;
pub mod telemetry;
pub mod transform;
pub mod types;
pub mod version;

// Re-export main types at crate root
pub use capability::{BackendCapability, CapabilityRole, CapabilitySet, HttpCapability};
pub use config::{Config, Secrets};
pub use dispatch::{Dispatcher, InboundRequest, ResponseEnvelope};
pub use error::{BifrostError, Result};
pub use gateway::{Bifrost, BifrostBuilder, Gateway};
pub use ingest::{
    FsObjectStore, Ingestor, MemoryObjectStore, ObjectStore, S3Config, S3ObjectStore,
};
pub use router::FallbackRouter;
pub use transform::{CapabilityPayload, RequestTransformer};

// Re-export all types
pub use types::{
    BatchOutcome, BatchResponse, CustomerProfile, GenerationConfig, GenerationResponse,
    InsightsResponse, KnowledgeContext, KnowledgeResponse, NormalizedResponse, Operation,
    OperationInput, RoutedResponse, SentimentResponse, StreamEvent, StreamRecord,
    TrainingRequest, TrainingResponse,
};
