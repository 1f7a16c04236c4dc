use convobase_errors::prelude::*;
use convobase_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct FileError(pub Box<ErrorObj>);

impl FileError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn validation(msg: &str) -> Self {
        FileError(Box::new(
            ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .user_msg(msg)
                .build(),
        ))
    }

    pub fn unsupported_type(file_type: &str) -> Self {
        FileError(Box::new(
            ErrorBuilder::new(codes::FILE_UNSUPPORTED_TYPE)
                .user_msg(&format!("Unsupported file type: {file_type}"))
                .build(),
        ))
    }

    pub fn forbidden_visibility(msg: &str) -> Self {
        FileError(Box::new(
            ErrorBuilder::new(codes::POLICY_FORBIDDEN_VISIBILITY)
                .user_msg("The requested visibility is not permitted for this role.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn forbidden(msg: &str) -> Self {
        FileError(Box::new(
            ErrorBuilder::new(codes::POLICY_FORBIDDEN_SCOPE)
                .user_msg("Not permitted.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn not_found(file_id: &str) -> Self {
        FileError(Box::new(
            ErrorBuilder::new(codes::RESOURCE_NOT_FOUND)
                .user_msg("File not found.")
                .dev_msg(&format!("file {file_id}"))
                .build(),
        ))
    }

    pub fn is_not_found(&self) -> bool {
        self.0.code == codes::RESOURCE_NOT_FOUND
    }
}

impl From<StorageError> for FileError {
    fn from(err: StorageError) -> Self {
        FileError(Box::new(err.into_inner()))
    }
}
