use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use convobase_auth::authn::{IdentityProvider, SignInTokens};
use convobase_auth::policy::{can_create_user, can_see_user};
use convobase_storage::kv::{IndexName, KvQuery, KvStore, KvUpdate};
use convobase_storage::model::keys;
use convobase_storage::model::UserRecord;
use convobase_types::prelude::{Actor, Role, ScopeIds, Timestamp};

use crate::errors::AdminError;
use crate::password::generate_temp_password;

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpResult {
    pub user_id: String,
    pub confirmed: bool,
}

#[derive(Clone, Debug)]
pub struct SignInResult {
    pub tokens: SignInTokens,
    pub user: UserRecord,
}

#[derive(Clone, Debug)]
pub struct CreateUserRequest {
    pub email: String,
    pub name: String,
    pub role: Role,
    pub scopes: ScopeIds,
    pub temporary_password: Option<String>,
}

#[derive(Clone, Debug)]
pub struct CreatedUser {
    pub user: UserRecord,
    /// Returned exactly once; the user must change it on first sign-in.
    pub temporary_password: String,
}

pub struct AdminService {
    kv: Arc<dyn KvStore>,
    identity: Arc<dyn IdentityProvider>,
}

impl AdminService {
    pub fn new(kv: Arc<dyn KvStore>, identity: Arc<dyn IdentityProvider>) -> Self {
        Self { kv, identity }
    }

    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<SignUpResult, AdminError> {
        if email.trim().is_empty() || password.is_empty() || name.trim().is_empty() {
            return Err(AdminError::validation(
                "email, password and name are required.",
            ));
        }
        let outcome = self.identity.sign_up(email, password, name).await?;

        let now = Timestamp::now();
        let user = UserRecord {
            user_id: outcome.subject_id.clone(),
            email: email.to_string(),
            name: name.to_string(),
            role: Role::User,
            scopes: ScopeIds::default(),
            created_at: now,
            updated_at: now,
        };
        self.kv.put(user.into_item()?).await?;

        Ok(SignUpResult {
            user_id: outcome.subject_id,
            confirmed: outcome.confirmed,
        })
    }

    pub async fn confirm(&self, email: &str, code: &str) -> Result<(), AdminError> {
        self.identity.confirm_sign_up(email, code).await?;
        Ok(())
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> Result<SignInResult, AdminError> {
        let tokens = self.identity.sign_in(email, password).await?;
        let user = self
            .find_by_email(email)
            .await?
            .ok_or_else(|| AdminError::not_found(&format!("profile for {email}")))?;
        Ok(SignInResult { tokens, user })
    }

    pub async fn get_profile(&self, user_id: &str) -> Result<UserRecord, AdminError> {
        let item = self
            .kv
            .get(&keys::user_pk(user_id), keys::SK_META)
            .await?
            .ok_or_else(|| AdminError::not_found(&format!("user {user_id}")))?;
        Ok(UserRecord::from_item(&item)?)
    }

    pub async fn update_profile(
        &self,
        user_id: &str,
        name: Option<String>,
    ) -> Result<UserRecord, AdminError> {
        let mut user = self.get_profile(user_id).await?;
        let Some(name) = name.filter(|n| !n.trim().is_empty()) else {
            return Ok(user);
        };

        self.identity.update_attributes(&user.email, &name).await?;
        let now = Timestamp::now();
        self.kv
            .update(
                &keys::user_pk(user_id),
                keys::SK_META,
                &KvUpdate::new()
                    .set("name", json!(name))
                    .set("updatedAt", json!(now)),
            )
            .await?;
        user.name = name;
        user.updated_at = now;
        Ok(user)
    }

    /// Scope-filtered listing of the `USERS` partition. The forced filters
    /// per role are not client-controlled.
    pub async fn list_users(
        &self,
        actor: &Actor,
        organization_filter: Option<&str>,
    ) -> Result<Vec<UserRecord>, AdminError> {
        if actor.role == Role::User {
            return Err(AdminError::forbidden_role("users may not list users"));
        }

        let items = self
            .kv
            .query(
                &KvQuery::index(IndexName::Gsi1, keys::USERS_PARTITION)
                    .with_sort_prefix(keys::USER_PREFIX)
                    .descending(),
            )
            .await?;

        let mut users = Vec::with_capacity(items.len());
        for item in &items {
            users.push(UserRecord::from_item(item)?);
        }
        users.retain(|user| can_see_user(actor, user));
        if actor.role == Role::SystemAdmin {
            if let Some(org) = organization_filter {
                users.retain(|user| user.scopes.organization_id.as_deref() == Some(org));
            }
        }
        Ok(users)
    }

    pub async fn create_user(
        &self,
        actor: &Actor,
        request: CreateUserRequest,
    ) -> Result<CreatedUser, AdminError> {
        if request.email.trim().is_empty() || request.name.trim().is_empty() {
            return Err(AdminError::validation("email and name are required."));
        }
        can_create_user(actor, request.role, &request.scopes)?;

        let temporary_password = request
            .temporary_password
            .filter(|p| !p.is_empty())
            .unwrap_or_else(generate_temp_password);
        let subject_id = self
            .identity
            .admin_create_user(&request.email, &request.name, &temporary_password)
            .await?;

        let now = Timestamp::now();
        let user = UserRecord {
            user_id: subject_id,
            email: request.email,
            name: request.name,
            role: request.role,
            scopes: request.scopes,
            created_at: now,
            updated_at: now,
        };
        self.kv.put(user.into_item()?).await?;

        Ok(CreatedUser {
            user,
            temporary_password,
        })
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, AdminError> {
        let items = self
            .kv
            .query(
                &KvQuery::index(IndexName::Gsi1, keys::USERS_PARTITION)
                    .with_sort_prefix(keys::USER_PREFIX),
            )
            .await?;
        for item in &items {
            let user = UserRecord::from_item(item)?;
            if user.email == email {
                return Ok(Some(user));
            }
        }
        Ok(None)
    }
}
