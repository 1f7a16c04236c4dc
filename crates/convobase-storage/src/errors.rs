use convobase_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct StorageError(pub Box<ErrorObj>);

impl StorageError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn internal(msg: &str) -> Self {
        StorageError(Box::new(
            ErrorBuilder::new(codes::STORAGE_INTERNAL)
                .user_msg("Storage operation failed.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn not_found(what: &str) -> Self {
        StorageError(Box::new(
            ErrorBuilder::new(codes::RESOURCE_NOT_FOUND)
                .user_msg("Not found.")
                .dev_msg(what)
                .build(),
        ))
    }

    pub fn codec(msg: &str) -> Self {
        StorageError(Box::new(
            ErrorBuilder::new(codes::STORAGE_INTERNAL)
                .user_msg("Stored record could not be decoded.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn is_not_found(&self) -> bool {
        self.0.code == codes::RESOURCE_NOT_FOUND
    }
}
