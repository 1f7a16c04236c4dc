pub mod admin;
pub mod auth;
pub mod chat;
pub mod conversations;
pub mod files;
pub mod models;

use axum::Json;
use serde_json::{json, Value};

pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
