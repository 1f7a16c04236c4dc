use convobase_auth::AuthError;
use convobase_errors::prelude::*;
use convobase_storage::StorageError;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct AdminError(pub Box<ErrorObj>);

impl AdminError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn validation(msg: &str) -> Self {
        AdminError(Box::new(
            ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .user_msg(msg)
                .build(),
        ))
    }

    pub fn forbidden_role(msg: &str) -> Self {
        AdminError(Box::new(
            ErrorBuilder::new(codes::POLICY_FORBIDDEN_ROLE)
                .user_msg("Not permitted for this role.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn not_found(what: &str) -> Self {
        AdminError(Box::new(
            ErrorBuilder::new(codes::RESOURCE_NOT_FOUND)
                .user_msg("Not found.")
                .dev_msg(what)
                .build(),
        ))
    }

    pub fn is_not_found(&self) -> bool {
        self.0.code == codes::RESOURCE_NOT_FOUND
    }
}

impl From<AuthError> for AdminError {
    fn from(err: AuthError) -> Self {
        AdminError(Box::new(err.into_inner()))
    }
}

impl From<StorageError> for AdminError {
    fn from(err: StorageError) -> Self {
        AdminError(Box::new(err.into_inner()))
    }
}
