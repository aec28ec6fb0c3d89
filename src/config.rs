//! Core configuration
//!
//! Settings the turn-handling boundary wires in at startup: the generation
//! backend and the reflection threshold. Environment variables provide the
//! usual deployment path; everything has a sensible default so the core
//! also runs fully injected (tests, embedded use).

use crate::generation::OpenRouterGenerator;
use crate::reflection::DEFAULT_REVISION_THRESHOLD;

/// Environment variable holding the OpenRouter API key
pub const API_KEY_ENV: &str = "OPENROUTER_API_KEY";
/// Environment variable overriding the generation model
pub const MODEL_ENV: &str = "EVE_MODEL";
/// Environment variable overriding the reflection revision threshold
pub const REVISION_THRESHOLD_ENV: &str = "EVE_REVISION_THRESHOLD";

/// Crate-level configuration
#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// OpenRouter API key; `None` means no live generation backend
    pub api_key: Option<String>,
    /// Generation model identifier; `None` keeps the client default
    pub model: Option<String>,
    /// Overall-score floor below which responses are revised
    pub revision_threshold: u8,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: None,
            revision_threshold: DEFAULT_REVISION_THRESHOLD,
        }
    }
}

impl CoreConfig {
    /// Load configuration from the environment
    pub fn from_env() -> Self {
        let api_key = std::env::var(API_KEY_ENV)
            .ok()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty());
        let model = std::env::var(MODEL_ENV)
            .ok()
            .filter(|m| !m.is_empty());
        let revision_threshold = std::env::var(REVISION_THRESHOLD_ENV)
            .ok()
            .and_then(|t| t.parse().ok())
            .unwrap_or(DEFAULT_REVISION_THRESHOLD);

        Self {
            api_key,
            model,
            revision_threshold,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_revision_threshold(mut self, threshold: u8) -> Self {
        self.revision_threshold = threshold;
        self
    }

    /// Build the OpenRouter generator this config describes; `None`
    /// without an API key
    pub fn generator(&self) -> Option<OpenRouterGenerator> {
        let key = self.api_key.as_ref()?;
        let mut generator = OpenRouterGenerator::new(key.clone());
        if let Some(model) = &self.model {
            generator = generator.with_model(model.clone());
        }
        Some(generator)
    }
}
