//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Build the application router (API + SPA fallback)
//! - Wire up middleware in a fixed order
//! - Wrap the HTTP app in the realtime socket adapter
//! - Serve with graceful shutdown
//!
//! # Layer Order (outermost first)
//! ```text
//! TraceLayer
//! realtime adapter        /ws → socket handler, else ↓
//! provider tokens         X-Provider-Tokens → extension
//! attach conversation     /api/conversations/{id} → extension or 404
//! rate limiter            token bucket per client, static assets exempt
//! timing                  X-Process-Time
//! cache headers           Cache-Control / Pragma / Expires
//! compression             gzip
//! CORS                    loopback origins
//! routes                  /api/*, fallback: SPA static files
//! ```

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{middleware, Router};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::{ListenerConfig, ServerConfig};
use crate::conversation::{
    api_routes, attach_conversation_middleware, provider_token_middleware, ConversationManager,
};
use crate::http::performance::apply_performance_optimizations;
use crate::http::static_files::spa_service;
use crate::lifecycle::shutdown;
use crate::realtime;
use crate::security::{localhost_cors, rate_limit_middleware, InMemoryRateLimiter, RateLimitState};

/// Error type for server operations.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {address}: {source}")]
    Bind {
        address: String,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// HTTP + realtime server for agent conversations.
pub struct HttpServer {
    router: Router,
    config: ServerConfig,
    conversations: Arc<ConversationManager>,
}

impl HttpServer {
    /// Create a new server with an empty conversation registry.
    pub fn new(config: ServerConfig) -> Self {
        let conversations = Arc::new(ConversationManager::new(config.events.history_limit));
        Self::with_conversations(config, conversations)
    }

    /// Create a server over an existing conversation registry.
    pub fn with_conversations(config: ServerConfig, conversations: Arc<ConversationManager>) -> Self {
        let router = Self::build_router(&config, Arc::clone(&conversations));
        Self {
            router,
            config,
            conversations,
        }
    }

    /// Build the full router with all middleware layers.
    pub fn build_router(config: &ServerConfig, conversations: Arc<ConversationManager>) -> Router {
        let app = api_routes(Arc::clone(&conversations))
            .fallback_service(spa_service(&config.static_files))
            .layer(localhost_cors(&config.cors));

        let app = apply_performance_optimizations(app, &config.compression, &config.cache);

        let app = if config.rate_limit.enabled {
            let state = RateLimitState {
                limiter: Arc::new(InMemoryRateLimiter::from_config(&config.rate_limit)),
                cache: Arc::new(config.cache.clone()),
            };
            app.layer(middleware::from_fn_with_state(state, rate_limit_middleware))
        } else {
            app
        };

        let app = app
            .layer(middleware::from_fn_with_state(
                Arc::clone(&conversations),
                attach_conversation_middleware,
            ))
            .layer(middleware::from_fn(provider_token_middleware));

        realtime::wrap(app, conversations).layer(TraceLayer::new_for_http())
    }

    /// Bind the configured listener address.
    pub async fn bind(config: &ListenerConfig) -> Result<TcpListener, ServerError> {
        TcpListener::bind(&config.bind_address)
            .await
            .map_err(|source| ServerError::Bind {
                address: config.bind_address.clone(),
                source,
            })
    }

    /// Serve until Ctrl+C/SIGTERM or until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), ServerError> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();

        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let reason = shutdown::requested(shutdown).await;
                tracing::info!(reason = ?reason, "HTTP server draining");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// A clone of the router, for driving the app without a listener.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn conversations(&self) -> Arc<ConversationManager> {
        Arc::clone(&self.conversations)
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}
