use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::authn::{IdentityProvider, SignInTokens, SignUpOutcome};
use crate::errors::AuthError;

/// Hermetic identity provider for tests and local runs. Stores password
/// digests only; any non-empty confirmation code is accepted.
#[derive(Clone, Default)]
pub struct MemoryIdentityProvider {
    inner: Arc<RwLock<HashMap<String, MemoryIdentity>>>,
}

#[derive(Clone)]
struct MemoryIdentity {
    subject_id: String,
    password_digest: String,
    name: String,
    confirmed: bool,
}

fn digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

impl MemoryIdentityProvider {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl IdentityProvider for MemoryIdentityProvider {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let mut guard = self.inner.write();
        if guard.contains_key(email) {
            return Err(AuthError::validation("An account with this email exists."));
        }
        let subject_id = uuid::Uuid::new_v4().to_string();
        guard.insert(
            email.to_string(),
            MemoryIdentity {
                subject_id: subject_id.clone(),
                password_digest: digest(password),
                name: name.to_string(),
                confirmed: false,
            },
        );
        Ok(SignUpOutcome {
            subject_id,
            confirmed: false,
        })
    }

    async fn confirm_sign_up(&self, email: &str, code: &str) -> Result<(), AuthError> {
        if code.trim().is_empty() {
            return Err(AuthError::validation("Confirmation code is required."));
        }
        let mut guard = self.inner.write();
        let identity = guard
            .get_mut(email)
            .ok_or_else(|| AuthError::validation("Unknown email address."))?;
        identity.confirmed = true;
        Ok(())
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignInTokens, AuthError> {
        let guard = self.inner.read();
        let identity = guard
            .get(email)
            .ok_or_else(|| AuthError::unauthenticated("unknown email"))?;
        if !identity.confirmed {
            return Err(AuthError::unauthenticated("account not confirmed"));
        }
        if identity.password_digest != digest(password) {
            return Err(AuthError::unauthenticated("password mismatch"));
        }
        Ok(SignInTokens {
            access_token: format!("access-{}", uuid::Uuid::new_v4()),
            id_token: format!("id-{}", uuid::Uuid::new_v4()),
            refresh_token: format!("refresh-{}", uuid::Uuid::new_v4()),
            expires_in: 3600,
        })
    }

    async fn admin_create_user(
        &self,
        email: &str,
        name: &str,
        temporary_password: &str,
    ) -> Result<String, AuthError> {
        let mut guard = self.inner.write();
        if guard.contains_key(email) {
            return Err(AuthError::validation("An account with this email exists."));
        }
        let subject_id = uuid::Uuid::new_v4().to_string();
        guard.insert(
            email.to_string(),
            MemoryIdentity {
                subject_id: subject_id.clone(),
                password_digest: digest(temporary_password),
                name: name.to_string(),
                confirmed: true,
            },
        );
        Ok(subject_id)
    }

    async fn update_attributes(&self, email: &str, name: &str) -> Result<(), AuthError> {
        let mut guard = self.inner.write();
        let identity = guard
            .get_mut(email)
            .ok_or_else(|| AuthError::validation("Unknown email address."))?;
        identity.name = name.to_string();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sign_up_confirm_sign_in_flow() {
        let provider = MemoryIdentityProvider::new();
        let outcome = provider
            .sign_up("a@x.com", "Password1!", "A")
            .await
            .unwrap();
        assert!(!outcome.confirmed);

        assert!(provider.sign_in("a@x.com", "Password1!").await.is_err());
        provider.confirm_sign_up("a@x.com", "123456").await.unwrap();

        let tokens = provider.sign_in("a@x.com", "Password1!").await.unwrap();
        assert_eq!(tokens.expires_in, 3600);

        let err = provider.sign_in("a@x.com", "wrong").await.unwrap_err();
        assert_eq!(err.0.code.0, "AUTH.UNAUTHENTICATED");
    }

    #[tokio::test]
    async fn duplicate_sign_up_rejected() {
        let provider = MemoryIdentityProvider::new();
        provider.sign_up("a@x.com", "pw", "A").await.unwrap();
        assert!(provider.sign_up("a@x.com", "pw", "A").await.is_err());
    }

    #[tokio::test]
    async fn admin_created_identity_signs_in_immediately() {
        let provider = MemoryIdentityProvider::new();
        let subject = provider
            .admin_create_user("b@x.com", "B", "Temp-Pass-123!")
            .await
            .unwrap();
        assert!(!subject.is_empty());
        provider.sign_in("b@x.com", "Temp-Pass-123!").await.unwrap();
    }
}
