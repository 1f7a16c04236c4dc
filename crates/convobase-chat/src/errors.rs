use convobase_errors::prelude::*;
use convobase_files::FileError;
use convobase_llm::LlmError;
use convobase_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ChatError(pub Box<ErrorObj>);

impl ChatError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn validation(msg: &str) -> Self {
        ChatError(Box::new(
            ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .user_msg(msg)
                .build(),
        ))
    }

    pub fn unknown_model(model_id: &str) -> Self {
        ChatError(Box::new(
            ErrorBuilder::new(codes::MODEL_UNKNOWN)
                .user_msg(&format!("Unknown model: {model_id}"))
                .build(),
        ))
    }

    pub fn provider(msg: &str) -> Self {
        ChatError(Box::new(
            ErrorBuilder::new(codes::PROVIDER_UPSTREAM)
                .user_msg(msg)
                .build(),
        ))
    }

    pub fn not_found(what: &str) -> Self {
        ChatError(Box::new(
            ErrorBuilder::new(codes::RESOURCE_NOT_FOUND)
                .user_msg("Conversation not found.")
                .dev_msg(what)
                .build(),
        ))
    }

    pub fn is_not_found(&self) -> bool {
        self.0.code == codes::RESOURCE_NOT_FOUND
    }
}

impl From<StorageError> for ChatError {
    fn from(err: StorageError) -> Self {
        ChatError(Box::new(err.into_inner()))
    }
}

impl From<LlmError> for ChatError {
    fn from(err: LlmError) -> Self {
        ChatError(Box::new(err.into_inner()))
    }
}

impl From<FileError> for ChatError {
    fn from(err: FileError) -> Self {
        ChatError(Box::new(err.into_inner()))
    }
}
