//! Conversation API handlers.
//!
//! Handlers under `/api/conversations/{id}` rely on
//! [`attach_conversation_middleware`](super::attach_conversation_middleware)
//! having resolved the conversation, and every handler may read the
//! [`ProviderTokens`] extension.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Extension, Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::conversation::manager::{Conversation, ConversationManager, ConversationSummary};
use crate::conversation::middleware::ProviderTokens;
use crate::events::{Event, EventKind, EventSource};

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub conversations: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CreateConversationRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PostEventRequest {
    pub content: String,
    #[serde(default)]
    pub source: Option<EventSource>,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    pub since: Option<u64>,
}

/// Routes for the `/api` surface.
pub fn api_routes(manager: Arc<ConversationManager>) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route(
            "/api/conversations",
            get(list_conversations).post(create_conversation),
        )
        .route(
            "/api/conversations/{id}",
            get(get_conversation).delete(delete_conversation),
        )
        .route(
            "/api/conversations/{id}/events",
            get(list_events).post(post_event),
        )
        .with_state(manager)
}

async fn health(State(manager): State<Arc<ConversationManager>>) -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        conversations: manager.len(),
    })
}

async fn list_conversations(
    State(manager): State<Arc<ConversationManager>>,
) -> Json<Vec<ConversationSummary>> {
    Json(manager.list())
}

async fn create_conversation(
    State(manager): State<Arc<ConversationManager>>,
    Extension(tokens): Extension<ProviderTokens>,
    Json(request): Json<CreateConversationRequest>,
) -> impl IntoResponse {
    let conversation = manager.create(request.title, tokens.providers());
    (StatusCode::CREATED, Json(conversation.summary()))
}

async fn get_conversation(
    Extension(conversation): Extension<Arc<Conversation>>,
) -> Json<ConversationSummary> {
    Json(conversation.summary())
}

async fn delete_conversation(
    State(manager): State<Arc<ConversationManager>>,
    Extension(conversation): Extension<Arc<Conversation>>,
) -> StatusCode {
    manager.remove(&conversation.id);
    StatusCode::NO_CONTENT
}

async fn list_events(
    Extension(conversation): Extension<Arc<Conversation>>,
    Query(query): Query<EventsQuery>,
) -> Json<Vec<Event>> {
    Json(conversation.stream.get_events(query.since))
}

async fn post_event(
    Extension(conversation): Extension<Arc<Conversation>>,
    Json(request): Json<PostEventRequest>,
) -> impl IntoResponse {
    let source = request.source.unwrap_or(EventSource::User);
    let event = conversation
        .stream
        .add_event(EventKind::message(request.content), source);
    tracing::debug!(
        conversation_id = %conversation.id,
        event_id = event.id,
        source = %source,
        "Event posted"
    );
    (StatusCode::CREATED, Json(event))
}
