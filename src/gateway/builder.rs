//! Builder for configuring gateway instances

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use super::Gateway;
use crate::capability::{BackendCapability, CapabilityRole, CapabilitySet, HttpCapability};
use crate::config::{Config, Secrets, StorageDestination};
use crate::dispatch::Dispatcher;
use crate::ingest::{
    FsObjectStore, Ingestor, MillisClock, ObjectStore, S3Config, S3ObjectStore,
};
use crate::router::FallbackRouter;
use crate::transform::RequestTransformer;
use crate::Result;

/// Main entry point for creating gateway instances.
pub struct Bifrost;

impl Bifrost {
    /// Create a new builder for configuring the gateway.
    pub fn builder() -> BifrostBuilder {
        BifrostBuilder::new()
    }
}

/// Capability names reported in the backend header, by role.
pub fn backend_names(role: CapabilityRole) -> (&'static str, &'static str) {
    match role {
        CapabilityRole::SentimentPrimary => ("sagemaker", "endpoint_runtime"),
        CapabilityRole::SentimentFallback | CapabilityRole::Insights | CapabilityRole::Generation => {
            ("bedrock", "model_runtime")
        }
        CapabilityRole::Knowledge => ("knowledge-base", "knowledge_runtime"),
        CapabilityRole::Training => ("training", "training"),
    }
}

/// Builder for configuring gateway instances.
pub struct BifrostBuilder {
    config: Config,
    secrets: Secrets,
    http_backends: bool,
    overrides: HashMap<CapabilityRole, Arc<dyn BackendCapability>>,
    object_store: Option<Arc<dyn ObjectStore>>,
    clock: Option<MillisClock>,
}

impl Default for BifrostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl BifrostBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
            secrets: Secrets::default(),
            http_backends: true,
            overrides: HashMap::new(),
            object_store: None,
            clock: None,
        }
    }

    /// Use `config` for models, backends and storage.
    pub fn config(mut self, config: Config) -> Self {
        self.config = config;
        self
    }

    /// API keys for the HTTP backends.
    pub fn secrets(mut self, secrets: Secrets) -> Self {
        self.secrets = secrets;
        self
    }

    /// Whether to build HTTP capabilities for roles without an explicit one
    /// (default: true).
    pub fn http_backends(mut self, enabled: bool) -> Self {
        self.http_backends = enabled;
        self
    }

    /// Fill `role` with a specific capability.
    pub fn capability(mut self, role: CapabilityRole, capability: Arc<dyn BackendCapability>) -> Self {
        self.overrides.insert(role, capability);
        self
    }

    /// Destination for processed stream records. Overrides the configured one.
    pub fn object_store(mut self, store: Arc<dyn ObjectStore>) -> Self {
        self.object_store = Some(store);
        self
    }

    /// Clock used for stream record keys.
    pub fn clock(mut self, clock: MillisClock) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Build the gateway.
    pub fn build(self) -> Result<Gateway> {
        let timeout = self
            .config
            .backends
            .request_timeout_secs
            .map(Duration::from_secs);

        let mut capabilities = CapabilitySet::builder();
        for role in CapabilityRole::ALL {
            if let Some(capability) = self.overrides.get(&role) {
                capabilities = capabilities.with(role, capability.clone());
            } else if self.http_backends {
                let capability = http_capability(&self.config, &self.secrets, role, timeout)?;
                capabilities = capabilities.with(role, Arc::new(capability));
            }
        }
        let capabilities = capabilities.build();

        for (role, name) in capabilities.names() {
            info!(role = role.as_str(), capability = %name, "capability registered");
        }

        let transformer = RequestTransformer::new(
            self.config.models.clone(),
            self.config.training.clone(),
            self.config.region.clone(),
        );
        let dispatcher = Dispatcher::new(FallbackRouter::new(capabilities, transformer));

        let store = self
            .object_store
            .or_else(|| object_store(&self.config));
        match &store {
            Some(store) => info!(store = store.name(), "stream destination configured"),
            None => info!("no stream destination configured, records will not be persisted"),
        }
        let mut ingestor = Ingestor::new(store);
        if let Some(clock) = self.clock {
            ingestor = ingestor.with_clock(clock);
        }

        Ok(Gateway::new(dispatcher, ingestor))
    }
}

fn object_store(config: &Config) -> Option<Arc<dyn ObjectStore>> {
    let store: Arc<dyn ObjectStore> = match config.storage.destination()? {
        StorageDestination::S3 {
            bucket,
            endpoint_url,
        } => {
            let mut s3 = S3Config::new(config.region.clone(), bucket);
            if let Some(url) = endpoint_url {
                s3 = s3.with_endpoint(url);
            }
            Arc::new(S3ObjectStore::new(s3))
        }
        StorageDestination::Directory(root) => Arc::new(FsObjectStore::new(root)),
    };
    Some(store)
}

fn http_capability(
    config: &Config,
    secrets: &Secrets,
    role: CapabilityRole,
    timeout: Option<Duration>,
) -> Result<HttpCapability> {
    let (name, backend) = backend_names(role);
    let backends = &config.backends;
    let mut capability = match role {
        CapabilityRole::SentimentPrimary => {
            HttpCapability::endpoint_runtime(name, config.resolve_url(&backends.endpoint_runtime_url))
        }
        CapabilityRole::SentimentFallback | CapabilityRole::Insights | CapabilityRole::Generation => {
            HttpCapability::model_runtime(name, config.resolve_url(&backends.model_runtime_url))
        }
        CapabilityRole::Knowledge => HttpCapability::knowledge_runtime(
            name,
            config.resolve_url(&backends.knowledge_runtime_url),
        ),
        CapabilityRole::Training => {
            HttpCapability::training_jobs(name, config.resolve_url(&backends.training_url))
        }
    };
    if let Some(key) = secrets.api_key(backend) {
        capability = capability.with_api_key(key);
    }
    if let Some(timeout) = timeout {
        capability = capability.with_timeout(timeout)?;
    }
    Ok(capability)
}
