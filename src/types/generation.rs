//! Fixed generation parameters.

use serde::{Deserialize, Serialize};

use crate::{BifrostError, Result};

/// Sampling parameters applied to a text-generating capability.
///
/// Fixed per operation; callers cannot override them. Insights sampling and
/// every knowledge value are local defaults, as is top-p on the sentiment
/// path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    /// Sampling temperature in `[0, 1]`.
    pub temperature: f64,
    /// Nucleus sampling threshold in `[0, 1]`.
    pub top_p: f64,
    /// Upper bound on generated tokens, always positive.
    pub max_tokens: u32,
}

impl GenerationConfig {
    /// Customer insight generation. Sampling values are local defaults.
    pub const INSIGHTS: Self = Self {
        temperature: 0.7,
        top_p: 0.9,
        max_tokens: 2000,
    };

    /// Knowledge-base answer synthesis. Sampling values are local defaults.
    pub const KNOWLEDGE: Self = Self {
        temperature: 0.2,
        top_p: 0.9,
        max_tokens: 1024,
    };

    /// One-shot freeform generation.
    pub const FREEFORM: Self = Self {
        temperature: 0.5,
        top_p: 0.9,
        max_tokens: 128,
    };

    /// Sentiment classification through a text model (secondary path).
    /// `top_p` is a local default; the deployed prompt only pins temperature.
    pub const SENTIMENT_FALLBACK: Self = Self {
        temperature: 0.1,
        top_p: 1.0,
        max_tokens: 100,
    };

    /// Create a validated config.
    pub fn new(temperature: f64, top_p: f64, max_tokens: u32) -> Result<Self> {
        let config = Self {
            temperature,
            top_p,
            max_tokens,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the parameter ranges.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(BifrostError::InvalidInput(format!(
                "temperature {} outside [0, 1]",
                self.temperature
            )));
        }
        if !(0.0..=1.0).contains(&self.top_p) {
            return Err(BifrostError::InvalidInput(format!(
                "topP {} outside [0, 1]",
                self.top_p
            )));
        }
        if self.max_tokens == 0 {
            return Err(BifrostError::InvalidInput(
                "maxTokens must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
