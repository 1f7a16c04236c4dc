use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use convobase_chat::{ChatTurnOutcome, ChatTurnRequest};
use convobase_llm::chat::ChatMessage;

use crate::app::AppState;
use crate::error::ApiError;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatPayload {
    #[serde(default)]
    model: Option<String>,
    #[serde(default)]
    messages: Vec<ChatMessage>,
    #[serde(default)]
    system_prompt: Option<String>,
    #[serde(default)]
    max_tokens: Option<u32>,
    #[serde(default)]
    temperature: Option<f32>,
    #[serde(default)]
    conversation_id: Option<String>,
    #[serde(default)]
    user_id: Option<String>,
    #[serde(default)]
    file_ids: Vec<String>,
    #[serde(default)]
    save_history: Option<bool>,
}

pub async fn chat(
    State(state): State<AppState>,
    body: Result<Json<ChatPayload>, JsonRejection>,
) -> Result<Json<ChatTurnOutcome>, ApiError> {
    let Json(payload) = body
        .map_err(|err| ApiError::validation(&format!("invalid request body: {err}")))?;
    let model = payload
        .model
        .filter(|m| !m.is_empty())
        .ok_or_else(|| ApiError::validation("model is required."))?;

    let outcome = state
        .chat
        .handle(ChatTurnRequest {
            model,
            messages: payload.messages,
            system_prompt: payload.system_prompt,
            max_tokens: payload.max_tokens,
            temperature: payload.temperature,
            conversation_id: payload.conversation_id,
            user_id: payload.user_id,
            file_ids: payload.file_ids,
            save_history: payload.save_history.unwrap_or(true),
        })
        .await?;
    Ok(Json(outcome))
}
