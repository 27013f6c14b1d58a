//! Errors surfaced by the conversation API.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

#[derive(Debug, thiserror::Error)]
pub enum ConversationError {
    #[error("conversation not found")]
    NotFound(String),
    #[error("invalid provider tokens: {0}")]
    InvalidProviderTokens(String),
}

impl ConversationError {
    pub fn status(&self) -> StatusCode {
        match self {
            ConversationError::NotFound(_) => StatusCode::NOT_FOUND,
            ConversationError::InvalidProviderTokens(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ConversationError {
    fn into_response(self) -> Response {
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}
