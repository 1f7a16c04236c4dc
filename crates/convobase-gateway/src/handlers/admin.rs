use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use convobase_admin::CreateUserRequest;
use convobase_storage::model::keys;
use convobase_storage::model::UserRecord;
use convobase_types::prelude::{Actor, Role, ScopeIds};

use crate::app::AppState;
use crate::error::ApiError;

/// Resolves the authenticated actor from the `Authorization` header. The
/// bearer resolution itself is behind `BearerResolver` (see convobase-auth
/// for the production caveat).
async fn actor_from_bearer(state: &AppState, headers: &HeaderMap) -> Result<Actor, ApiError> {
    let bearer = headers
        .get("authorization")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or_else(|| ApiError::unauthenticated("missing bearer token"))?;
    let subject = state.bearer.resolve_subject(bearer).await?;
    let item = state
        .kv
        .get(&keys::user_pk(&subject), keys::SK_META)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("unknown subject"))?;
    Ok(UserRecord::from_item(&item)?.actor())
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    #[serde(default)]
    organization_id: Option<String>,
}

pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListUsersQuery>,
    headers: HeaderMap,
) -> Result<Json<Value>, ApiError> {
    let actor = actor_from_bearer(&state, &headers).await?;
    let users = state
        .admin
        .list_users(&actor, query.organization_id.as_deref())
        .await?;
    Ok(Json(json!({ "users": users })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserPayload {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    organization_id: Option<String>,
    #[serde(default)]
    company_id: Option<String>,
    #[serde(default)]
    department_id: Option<String>,
    #[serde(default)]
    temporary_password: Option<String>,
}

pub async fn create_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<CreateUserPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let actor = actor_from_bearer(&state, &headers).await?;
    let Json(payload) = body
        .map_err(|err| ApiError::validation(&format!("invalid request body: {err}")))?;

    let role_text = payload
        .role
        .filter(|r| !r.is_empty())
        .ok_or_else(|| ApiError::validation("role is required."))?;
    let role = Role::parse(&role_text)
        .ok_or_else(|| ApiError::validation(&format!("unknown role: {role_text}")))?;

    let created = state
        .admin
        .create_user(
            &actor,
            CreateUserRequest {
                email: payload.email.unwrap_or_default(),
                name: payload.name.unwrap_or_default(),
                role,
                scopes: ScopeIds::new(
                    payload.organization_id,
                    payload.company_id,
                    payload.department_id,
                ),
                temporary_password: payload.temporary_password,
            },
        )
        .await?;

    Ok(Json(json!({
        "user": created.user,
        "temporaryPassword": created.temporary_password,
        "message": "The user must change this temporary password on first sign-in.",
    })))
}
