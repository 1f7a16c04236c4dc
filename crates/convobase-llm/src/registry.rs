use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::chat::{ChatProvider, TokenUsage};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Bedrock,
    Gemini,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Bedrock => "bedrock",
            ProviderKind::Gemini => "gemini",
        }
    }
}

/// USD per one million tokens.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    pub input: f64,
    pub output: f64,
}

impl ModelPricing {
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        (usage.input_tokens as f64 / 1_000_000.0) * self.input
            + (usage.output_tokens as f64 / 1_000_000.0) * self.output
    }
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelInfo {
    pub model_id: String,
    pub provider: ProviderKind,
    pub display_name: String,
    pub description: String,
    pub category: String,
    pub supports_images: bool,
    pub max_tokens: u32,
    pub pricing: ModelPricing,
}

/// The single source of truth for both dispatch (provider) and cost
/// (pricing). Prices must not change without a release note.
pub struct ModelRegistry {
    models: Vec<ModelInfo>,
    by_id: HashMap<String, usize>,
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelInfo>) -> Self {
        let by_id = models
            .iter()
            .enumerate()
            .map(|(i, model)| (model.model_id.clone(), i))
            .collect();
        Self { models, by_id }
    }

    pub fn builtin() -> Self {
        fn entry(
            model_id: &str,
            provider: ProviderKind,
            display_name: &str,
            description: &str,
            category: &str,
            supports_images: bool,
            max_tokens: u32,
            input: f64,
            output: f64,
        ) -> ModelInfo {
            ModelInfo {
                model_id: model_id.to_string(),
                provider,
                display_name: display_name.to_string(),
                description: description.to_string(),
                category: category.to_string(),
                supports_images,
                max_tokens,
                pricing: ModelPricing { input, output },
            }
        }

        Self::new(vec![
            entry(
                "us.anthropic.claude-sonnet-4-5-20250929-v1:0",
                ProviderKind::Bedrock,
                "Claude Sonnet 4.5",
                "Balanced quality and latency for everyday work.",
                "general",
                true,
                64_000,
                3.0,
                15.0,
            ),
            entry(
                "us.anthropic.claude-haiku-4-5-20251001-v1:0",
                ProviderKind::Bedrock,
                "Claude Haiku 4.5",
                "Fast, low-cost responses for high-volume traffic.",
                "fast",
                true,
                32_000,
                1.0,
                5.0,
            ),
            entry(
                "us.anthropic.claude-opus-4-1-20250805-v1:0",
                ProviderKind::Bedrock,
                "Claude Opus 4.1",
                "Deepest reasoning for the hardest tasks.",
                "frontier",
                true,
                32_000,
                15.0,
                75.0,
            ),
            entry(
                "gemini-3-flash-preview",
                ProviderKind::Gemini,
                "Gemini 3 Flash",
                "Low-latency multimodal responses.",
                "fast",
                true,
                8_192,
                0.5,
                3.0,
            ),
            entry(
                "gemini-3-pro-preview",
                ProviderKind::Gemini,
                "Gemini 3 Pro",
                "Higher-quality reasoning on the Gemini family.",
                "general",
                true,
                8_192,
                2.0,
                12.0,
            ),
        ])
    }

    pub fn get(&self, model_id: &str) -> Option<&ModelInfo> {
        self.by_id.get(model_id).map(|i| &self.models[*i])
    }

    pub fn all(&self) -> &[ModelInfo] {
        &self.models
    }
}

/// Installed provider adapters, keyed by the registry's provider tag.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<ProviderKind, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, kind: ProviderKind, provider: Arc<dyn ChatProvider>) {
        self.providers.insert(kind, provider);
    }

    pub fn get(&self, kind: ProviderKind) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(&kind).cloned()
    }
}
