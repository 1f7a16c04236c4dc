use axum::extract::rejection::JsonRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
pub struct SignUpPayload {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

pub async fn sign_up(
    State(state): State<AppState>,
    body: Result<Json<SignUpPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body
        .map_err(|err| ApiError::validation(&format!("invalid request body: {err}")))?;
    let result = state
        .admin
        .sign_up(
            payload.email.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
            payload.name.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(json!({
        "userId": result.user_id,
        "confirmed": result.confirmed,
    })))
}

#[derive(Deserialize)]
pub struct ConfirmPayload {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

pub async fn confirm(
    State(state): State<AppState>,
    body: Result<Json<ConfirmPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body
        .map_err(|err| ApiError::validation(&format!("invalid request body: {err}")))?;
    state
        .admin
        .confirm(
            payload.email.as_deref().unwrap_or_default(),
            payload.code.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct SignInPayload {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

pub async fn sign_in(
    State(state): State<AppState>,
    body: Result<Json<SignInPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body
        .map_err(|err| ApiError::validation(&format!("invalid request body: {err}")))?;
    let result = state
        .admin
        .sign_in(
            payload.email.as_deref().unwrap_or_default(),
            payload.password.as_deref().unwrap_or_default(),
        )
        .await?;
    Ok(Json(json!({
        "accessToken": result.tokens.access_token,
        "idToken": result.tokens.id_token,
        "refreshToken": result.tokens.refresh_token,
        "expiresIn": result.tokens.expires_in,
        "user": result.user,
    })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileQuery {
    #[serde(default)]
    user_id: Option<String>,
}

pub async fn get_profile(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
) -> Result<Json<Value>, ApiError> {
    let user_id = query
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::validation("userId is required."))?;
    let user = state.admin.get_profile(&user_id).await?;
    Ok(Json(json!({ "user": user })))
}

#[derive(Deserialize)]
pub struct ProfileUpdatePayload {
    #[serde(default)]
    name: Option<String>,
}

pub async fn update_profile(
    State(state): State<AppState>,
    Query(query): Query<ProfileQuery>,
    body: Result<Json<ProfileUpdatePayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body
        .map_err(|err| ApiError::validation(&format!("invalid request body: {err}")))?;
    let user_id = query
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::validation("userId is required."))?;
    let user = state.admin.update_profile(&user_id, payload.name).await?;
    Ok(Json(json!({ "user": user })))
}
