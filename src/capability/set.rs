//! The set of capabilities the router may call.
//!
//! Built once at startup and passed explicitly into the router; there are no
//! process-wide client singletons. Tests substitute doubles per role.

use std::sync::Arc;

use super::traits::BackendCapability;
use crate::types::Operation;

/// The slot a capability fills.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CapabilityRole {
    /// Dedicated sentiment classifier.
    SentimentPrimary,
    /// Text model used when the classifier fails.
    SentimentFallback,
    Insights,
    Knowledge,
    Training,
    Generation,
}

impl CapabilityRole {
    pub const ALL: [CapabilityRole; 6] = [
        CapabilityRole::SentimentPrimary,
        CapabilityRole::SentimentFallback,
        CapabilityRole::Insights,
        CapabilityRole::Knowledge,
        CapabilityRole::Training,
        CapabilityRole::Generation,
    ];

    /// Role of the preferred capability for an operation.
    pub fn primary_for(operation: Operation) -> Self {
        match operation {
            Operation::SentimentAnalysis => CapabilityRole::SentimentPrimary,
            Operation::InsightGeneration => CapabilityRole::Insights,
            Operation::KnowledgeQuery => CapabilityRole::Knowledge,
            Operation::ModelTraining => CapabilityRole::Training,
            Operation::FreeformGeneration => CapabilityRole::Generation,
        }
    }

    /// Role of the secondary capability, for operations that have one.
    pub fn secondary_for(operation: Operation) -> Option<Self> {
        operation
            .has_fallback()
            .then_some(CapabilityRole::SentimentFallback)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CapabilityRole::SentimentPrimary => "sentiment_primary",
            CapabilityRole::SentimentFallback => "sentiment_fallback",
            CapabilityRole::Insights => "insights",
            CapabilityRole::Knowledge => "knowledge",
            CapabilityRole::Training => "training",
            CapabilityRole::Generation => "generation",
        }
    }
}

/// Capabilities by role. Empty slots make the router answer with defaults.
#[derive(Clone, Default)]
pub struct CapabilitySet {
    sentiment_primary: Option<Arc<dyn BackendCapability>>,
    sentiment_fallback: Option<Arc<dyn BackendCapability>>,
    insights: Option<Arc<dyn BackendCapability>>,
    knowledge: Option<Arc<dyn BackendCapability>>,
    training: Option<Arc<dyn BackendCapability>>,
    generation: Option<Arc<dyn BackendCapability>>,
}

impl CapabilitySet {
    pub fn builder() -> CapabilitySetBuilder {
        CapabilitySetBuilder::default()
    }

    /// Capability filling `role`, if any.
    pub fn get(&self, role: CapabilityRole) -> Option<&Arc<dyn BackendCapability>> {
        match role {
            CapabilityRole::SentimentPrimary => self.sentiment_primary.as_ref(),
            CapabilityRole::SentimentFallback => self.sentiment_fallback.as_ref(),
            CapabilityRole::Insights => self.insights.as_ref(),
            CapabilityRole::Knowledge => self.knowledge.as_ref(),
            CapabilityRole::Training => self.training.as_ref(),
            CapabilityRole::Generation => self.generation.as_ref(),
        }
    }

    pub fn has(&self, role: CapabilityRole) -> bool {
        self.get(role).is_some()
    }

    /// `(role, capability name)` for every filled slot.
    pub fn names(&self) -> Vec<(CapabilityRole, String)> {
        CapabilityRole::ALL
            .into_iter()
            .filter_map(|role| self.get(role).map(|c| (role, c.name().to_string())))
            .collect()
    }

    fn slot_mut(&mut self, role: CapabilityRole) -> &mut Option<Arc<dyn BackendCapability>> {
        match role {
            CapabilityRole::SentimentPrimary => &mut self.sentiment_primary,
            CapabilityRole::SentimentFallback => &mut self.sentiment_fallback,
            CapabilityRole::Insights => &mut self.insights,
            CapabilityRole::Knowledge => &mut self.knowledge,
            CapabilityRole::Training => &mut self.training,
            CapabilityRole::Generation => &mut self.generation,
        }
    }
}

/// Builder for [`CapabilitySet`].
#[derive(Default)]
pub struct CapabilitySetBuilder {
    set: CapabilitySet,
}

impl CapabilitySetBuilder {
    /// Fill `role`, replacing any previous capability.
    pub fn with(mut self, role: CapabilityRole, capability: Arc<dyn BackendCapability>) -> Self {
        *self.set.slot_mut(role) = Some(capability);
        self
    }

    pub fn build(self) -> CapabilitySet {
        self.set
    }
}
