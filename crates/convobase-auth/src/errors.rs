use convobase_errors::prelude::*;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct AuthError(pub Box<ErrorObj>);

impl AuthError {
    pub fn into_inner(self) -> ErrorObj {
        *self.0
    }

    pub fn unauthenticated(msg: &str) -> Self {
        AuthError(Box::new(
            ErrorBuilder::new(codes::AUTH_UNAUTHENTICATED)
                .user_msg("Authentication failed.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn forbidden_role(msg: &str) -> Self {
        AuthError(Box::new(
            ErrorBuilder::new(codes::POLICY_FORBIDDEN_ROLE)
                .user_msg("The requested role is not permitted.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn forbidden_scope(msg: &str) -> Self {
        AuthError(Box::new(
            ErrorBuilder::new(codes::POLICY_FORBIDDEN_SCOPE)
                .user_msg("The requested scope is not permitted.")
                .dev_msg(msg)
                .build(),
        ))
    }

    pub fn validation(msg: &str) -> Self {
        AuthError(Box::new(
            ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .user_msg(msg)
                .build(),
        ))
    }

    pub fn provider(msg: &str) -> Self {
        AuthError(Box::new(
            ErrorBuilder::new(codes::UNKNOWN_INTERNAL)
                .user_msg("Identity provider request failed.")
                .dev_msg(msg)
                .build(),
        ))
    }
}
