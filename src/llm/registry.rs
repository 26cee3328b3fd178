//! Gemini models reachable with the configured credentials

use super::{GeminiModel, GeminiService, LlmService, LoggingService};
use std::collections::BTreeMap;
use std::sync::Arc;

/// How to reach Gemini
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    pub gemini_api_key: Option<String>,
    /// Proxy that injects provider credentials itself
    pub gateway: Option<String>,
    pub default_model: Option<String>,
}

impl LlmConfig {
    /// Whether any model can be reached, and with which key
    fn credential(&self) -> Option<Option<String>> {
        if self.gateway.is_some() {
            return Some(None);
        }
        self.gemini_api_key.clone().filter(|key| !key.is_empty()).map(Some)
    }
}

/// Models keyed by id, each wrapped for call tracing
pub struct ModelRegistry {
    services: BTreeMap<&'static str, Arc<dyn LlmService>>,
    default_model: String,
}

impl ModelRegistry {
    #[cfg(test)]
    pub fn new_empty() -> Self {
        Self {
            services: BTreeMap::new(),
            default_model: "test-model".to_string(),
        }
    }

    pub fn new(config: &LlmConfig) -> Self {
        let mut services: BTreeMap<&'static str, Arc<dyn LlmService>> = BTreeMap::new();

        if let Some(key) = config.credential() {
            for model in GeminiModel::ALL {
                match GeminiService::new(key.clone(), model, config.gateway.as_deref()) {
                    Ok(service) => {
                        services.insert(model.model_id(), Arc::new(LoggingService::new(Arc::new(service))));
                    }
                    Err(e) => tracing::warn!(model = model.model_id(), error = %e, "Skipping model"),
                }
            }
        }

        // Configured choice if reachable, else the first of ALL that is
        let default_model = config
            .default_model
            .as_deref()
            .filter(|id| services.contains_key(*id))
            .or_else(|| {
                GeminiModel::ALL
                    .iter()
                    .map(|m| m.model_id())
                    .find(|id| services.contains_key(*id))
            })
            .unwrap_or(GeminiModel::ALL[0].model_id())
            .to_string();

        Self {
            services,
            default_model,
        }
    }

    pub fn get(&self, model_id: &str) -> Option<Arc<dyn LlmService>> {
        self.services.get(model_id).cloned()
    }

    pub fn default(&self) -> Option<Arc<dyn LlmService>> {
        self.get(&self.default_model)
    }

    pub fn default_model_id(&self) -> &str {
        &self.default_model
    }

    /// Sorted ids
    pub fn available_models(&self) -> Vec<&'static str> {
        self.services.keys().copied().collect()
    }

    pub fn has_models(&self) -> bool {
        !self.services.is_empty()
    }
}
