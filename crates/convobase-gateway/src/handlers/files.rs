use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use convobase_files::{QueryAnswer, UploadReceipt, UploadRequest};
use convobase_types::prelude::{Actor, FileCategory, FileType, Role, ScopeIds, Visibility};

use crate::app::AppState;
use crate::error::ApiError;

/// The reference surface carries the caller's identity in query params for
/// the file and conversation routes; missing fields default to the most
/// restrictive actor.
#[derive(Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ActorQuery {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    user_role: Option<String>,
    #[serde(default)]
    organization_id: Option<String>,
    #[serde(default)]
    company_id: Option<String>,
    #[serde(default)]
    department_id: Option<String>,
    #[serde(default)]
    category: Option<String>,
}

impl ActorQuery {
    fn actor(&self) -> Result<Actor, ApiError> {
        let role = match self.user_role.as_deref() {
            None | Some("") => Role::User,
            Some(text) => Role::parse(text)
                .ok_or_else(|| ApiError::validation(&format!("unknown role: {text}")))?,
        };
        Ok(Actor::new(
            self.user_id.clone().unwrap_or_default(),
            role,
            ScopeIds::new(
                self.organization_id.clone(),
                self.company_id.clone(),
                self.department_id.clone(),
            ),
        ))
    }

    fn category(&self) -> Result<Option<FileCategory>, ApiError> {
        match self.category.as_deref() {
            None | Some("") => Ok(None),
            Some(text) => FileCategory::parse(text)
                .map(Some)
                .ok_or_else(|| ApiError::validation(&format!("unknown category: {text}"))),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadPayload {
    #[serde(default)]
    file_name: Option<String>,
    #[serde(default)]
    file_type: Option<String>,
    #[serde(default)]
    mime_type: Option<String>,
    #[serde(default)]
    file_data_base64: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    user_role: Option<String>,
    #[serde(default)]
    organization_id: Option<String>,
    #[serde(default)]
    company_id: Option<String>,
    #[serde(default)]
    department_id: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

pub async fn upload(
    State(state): State<AppState>,
    body: Result<Json<UploadPayload>, JsonRejection>,
) -> Result<Json<UploadReceipt>, ApiError> {
    let Json(payload) = body
        .map_err(|err| ApiError::validation(&format!("invalid request body: {err}")))?;

    let file_name = payload
        .file_name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| ApiError::validation("fileName is required."))?;
    let file_type_text = payload
        .file_type
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ApiError::validation("fileType is required."))?;
    let file_type = FileType::parse(&file_type_text)
        .ok_or_else(|| convobase_files::FileError::unsupported_type(&file_type_text))?;
    let file_data_base64 = payload
        .file_data_base64
        .ok_or_else(|| ApiError::validation("fileDataBase64 is required."))?;
    let user_id = payload
        .user_id
        .filter(|u| !u.is_empty())
        .ok_or_else(|| ApiError::validation("userId is required."))?;

    let role = match payload.user_role.as_deref() {
        None | Some("") => Role::User,
        Some(text) => Role::parse(text)
            .ok_or_else(|| ApiError::validation(&format!("unknown role: {text}")))?,
    };
    let visibility = match payload.visibility.as_deref() {
        None | Some("") => None,
        Some(text) => Some(
            Visibility::parse(text)
                .ok_or_else(|| ApiError::validation(&format!("unknown visibility: {text}")))?,
        ),
    };
    let category = match payload.category.as_deref() {
        None | Some("") => None,
        Some(text) => Some(
            FileCategory::parse(text)
                .ok_or_else(|| ApiError::validation(&format!("unknown category: {text}")))?,
        ),
    };

    let receipt = state
        .files
        .upload(UploadRequest {
            file_name,
            file_type,
            mime_type: payload
                .mime_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            file_data_base64,
            actor: Actor::new(
                user_id,
                role,
                ScopeIds::new(
                    payload.organization_id,
                    payload.company_id,
                    payload.department_id,
                ),
            ),
            visibility,
            category,
            description: payload.description,
        })
        .await?;
    Ok(Json(receipt))
}

pub async fn list(
    State(state): State<AppState>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<Value>, ApiError> {
    let actor = query.actor()?;
    let files = state.files.list(&actor, query.category()?).await?;
    Ok(Json(json!({ "files": files })))
}

pub async fn get_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<Value>, ApiError> {
    let actor = query.actor()?;
    let file = state.files.get(&actor, &file_id).await?;
    Ok(Json(json!({ "file": file })))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilityPayload {
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    user_role: Option<String>,
    #[serde(default)]
    visibility: Option<String>,
}

pub async fn update_visibility(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    body: Result<Json<VisibilityPayload>, JsonRejection>,
) -> Result<Json<Value>, ApiError> {
    let Json(payload) = body
        .map_err(|err| ApiError::validation(&format!("invalid request body: {err}")))?;
    let visibility_text = payload
        .visibility
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::validation("visibility is required."))?;
    let visibility = Visibility::parse(&visibility_text)
        .ok_or_else(|| ApiError::validation(&format!("unknown visibility: {visibility_text}")))?;
    let role = match payload.user_role.as_deref() {
        None | Some("") => Role::User,
        Some(text) => Role::parse(text)
            .ok_or_else(|| ApiError::validation(&format!("unknown role: {text}")))?,
    };
    let actor = Actor::new(
        payload.user_id.unwrap_or_default(),
        role,
        ScopeIds::default(),
    );

    state
        .files
        .update_visibility(&actor, &file_id, visibility)
        .await?;
    Ok(Json(json!({
        "fileId": file_id,
        "visibility": visibility,
    })))
}

pub async fn delete_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> Result<Json<Value>, ApiError> {
    let actor = query.actor()?;
    state.files.delete(&actor, &file_id).await?;
    Ok(Json(json!({ "success": true })))
}

#[derive(Deserialize)]
pub struct QueryPayload {
    #[serde(default)]
    question: Option<String>,
}

pub async fn query_file(
    State(state): State<AppState>,
    Path(file_id): Path<String>,
    body: Result<Json<QueryPayload>, JsonRejection>,
) -> Result<Json<QueryAnswer>, ApiError> {
    let Json(payload) = body
        .map_err(|err| ApiError::validation(&format!("invalid request body: {err}")))?;
    let answer = state
        .files
        .query_file(&file_id, payload.question.as_deref().unwrap_or_default())
        .await?;
    Ok(Json(answer))
}
