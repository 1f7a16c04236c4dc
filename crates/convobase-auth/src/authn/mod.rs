mod cognito;
mod memory;

pub use cognito::{CognitoConfig, CognitoIdentityProvider};
pub use memory::MemoryIdentityProvider;

use async_trait::async_trait;

use crate::errors::AuthError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SignUpOutcome {
    /// The provider's subject identifier, persisted verbatim as the user id.
    pub subject_id: String,
    pub confirmed: bool,
}

#[derive(Clone, Debug)]
pub struct SignInTokens {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: String,
    pub expires_in: i32,
}

/// Identity operations the core needs. Passwords never touch the core's own
/// storage; only temporary passwords from admin-create are returned, once.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, AuthError>;

    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), AuthError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInTokens, AuthError>;

    /// Creates the identity with a suppressed welcome mail and returns the
    /// subject identifier.
    async fn admin_create_user(
        &self,
        email: &str,
        name: &str,
        temporary_password: &str,
    ) -> Result<String, AuthError>;

    async fn update_attributes(&self, email: &str, name: &str) -> Result<(), AuthError>;
}

/// Turns a bearer value into a subject id.
#[async_trait]
pub trait BearerResolver: Send + Sync {
    async fn resolve_subject(&self, bearer: &str) -> Result<String, AuthError>;
}

/// The reference resolver: the bearer value IS the subject id. This is a
/// trust-boundary stub; a production deployment must verify a signed token
/// against the identity provider's keys and extract the subject claim.
pub struct SubjectBearerResolver;

#[async_trait]
impl BearerResolver for SubjectBearerResolver {
    async fn resolve_subject(&self, bearer: &str) -> Result<String, AuthError> {
        let bearer = bearer.trim();
        if bearer.is_empty() {
            return Err(AuthError::unauthenticated("empty bearer value"));
        }
        Ok(bearer.to_string())
    }
}
