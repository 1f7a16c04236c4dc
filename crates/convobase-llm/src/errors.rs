use convobase_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct LlmError(pub Box<ErrorObj>);

impl LlmError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    /// Vendor-side failure. The provider's message is preserved on the
    /// public surface so callers can see what the vendor rejected.
    pub fn provider(msg: &str) -> Self {
        LlmError(Box::new(
            ErrorBuilder::new(codes::PROVIDER_UPSTREAM)
                .user_msg(msg)
                .build(),
        ))
    }

    pub fn schema(msg: &str) -> Self {
        LlmError(Box::new(
            ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .user_msg(msg)
                .build(),
        ))
    }

    pub fn unknown_model(model_id: &str) -> Self {
        LlmError(Box::new(
            ErrorBuilder::new(codes::MODEL_UNKNOWN)
                .user_msg(&format!("Unknown model: {model_id}"))
                .build(),
        ))
    }

    pub fn unknown(msg: &str) -> Self {
        LlmError(Box::new(
            ErrorBuilder::new(codes::UNKNOWN_INTERNAL)
                .user_msg("LLM invocation failed.")
                .dev_msg(msg)
                .build(),
        ))
    }
}
