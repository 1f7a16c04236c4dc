use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::app::AppState;

pub async fn list_models(State(state): State<AppState>) -> Json<Value> {
    Json(json!({ "models": state.models.all() }))
}
