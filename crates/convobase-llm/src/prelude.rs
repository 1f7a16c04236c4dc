pub use crate::chat::{Attachment, ChatMessage, ChatProvider, ChatRequest, ChatResponse, TokenUsage};
pub use crate::errors::LlmError;
pub use crate::provider::{ConverseConfig, ConverseProvider, GeminiConfig, GeminiProvider};
pub use crate::registry::{ModelInfo, ModelPricing, ModelRegistry, ProviderKind, ProviderRegistry};
