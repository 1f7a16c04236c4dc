use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::debug;

use convobase_admin::AdminError;
use convobase_auth::AuthError;
use convobase_chat::ChatError;
use convobase_errors::prelude::*;
use convobase_files::FileError;
use convobase_llm::LlmError;
use convobase_storage::StorageError;

/// Outermost boundary: every service error maps onto the taxonomy here and
/// surfaces as `{"error": "<message>"}` with the code's HTTP status.
#[derive(Debug)]
pub struct ApiError(pub ErrorObj);

impl ApiError {
    pub fn validation(msg: &str) -> Self {
        ApiError(
            ErrorBuilder::new(codes::SCHEMA_VALIDATION)
                .user_msg(msg)
                .build(),
        )
    }

    pub fn unauthenticated(msg: &str) -> Self {
        ApiError(
            ErrorBuilder::new(codes::AUTH_UNAUTHENTICATED)
                .user_msg("Authentication required.")
                .dev_msg(msg)
                .build(),
        )
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let Some(dev) = &self.0.message_dev {
            debug!(code = self.0.code.0, dev, "request failed");
        }
        let status = StatusCode::from_u16(self.0.http_status())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.0.message_user }))).into_response()
    }
}

macro_rules! from_wrapped {
    ($($source:ty),+ $(,)?) => {
        $(impl From<$source> for ApiError {
            fn from(err: $source) -> Self {
                ApiError(err.into_inner())
            }
        })+
    };
}

from_wrapped!(AdminError, AuthError, ChatError, FileError, LlmError, StorageError);
