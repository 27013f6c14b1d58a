//! Conversation-scoped request middleware.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderName, Request},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use crate::conversation::error::ConversationError;
use crate::conversation::manager::ConversationManager;

pub static X_PROVIDER_TOKENS: HeaderName = HeaderName::from_static("x-provider-tokens");

const CONVERSATION_PREFIX: &str = "/api/conversations/";

/// Git hosting providers a token may belong to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    Github,
    Gitlab,
    Bitbucket,
}

/// Provider tokens supplied with a request.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct ProviderTokens(HashMap<ProviderType, String>);

impl ProviderTokens {
    pub fn get(&self, provider: ProviderType) -> Option<&str> {
        self.0.get(&provider).map(String::as_str)
    }

    /// Providers with a token, sorted.
    pub fn providers(&self) -> Vec<ProviderType> {
        let mut providers: Vec<ProviderType> = self.0.keys().copied().collect();
        providers.sort();
        providers
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse the `X-Provider-Tokens` JSON object.
    pub fn parse(raw: &str) -> Result<Self, ConversationError> {
        serde_json::from_str::<HashMap<ProviderType, String>>(raw)
            .map(|tokens| {
                ProviderTokens(tokens.into_iter().filter(|(_, t)| !t.is_empty()).collect())
            })
            .map_err(|e| ConversationError::InvalidProviderTokens(e.to_string()))
    }
}

impl fmt::Debug for ProviderTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // never print secrets
        f.debug_struct("ProviderTokens")
            .field("providers", &self.providers())
            .finish()
    }
}

/// Attach `ProviderTokens` to every request.
pub async fn provider_token_middleware(mut request: Request<Body>, next: Next) -> Response {
    let tokens = match request.headers().get(&X_PROVIDER_TOKENS) {
        None => ProviderTokens::default(),
        Some(value) => {
            let parsed = value
                .to_str()
                .map_err(|e| ConversationError::InvalidProviderTokens(e.to_string()))
                .and_then(ProviderTokens::parse);
            match parsed {
                Ok(tokens) => tokens,
                Err(e) => {
                    tracing::debug!(error = %e, "Rejected provider token header");
                    return e.into_response();
                }
            }
        }
    };

    request.extensions_mut().insert(tokens);
    next.run(request).await
}

/// Conversation id named by a `/api/conversations/{id}[/...]` path.
pub fn conversation_id_from_path(path: &str) -> Option<&str> {
    let rest = path.strip_prefix(CONVERSATION_PREFIX)?;
    let id = rest.split('/').next().unwrap_or_default();
    (!id.is_empty()).then_some(id)
}

/// Resolve the conversation named in the path and attach it to the request.
pub async fn attach_conversation_middleware(
    State(manager): State<Arc<ConversationManager>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(id) = conversation_id_from_path(request.uri().path()).map(str::to_owned) else {
        return next.run(request).await;
    };

    match manager.get(&id) {
        Some(conversation) => {
            request.extensions_mut().insert(conversation);
            next.run(request).await
        }
        None => {
            tracing::debug!(conversation_id = %id, "Unknown conversation");
            ConversationError::NotFound(id).into_response()
        }
    }
}
