//! Conversations: uuid-addressed event streams plus their HTTP surface.
//!
//! # Data Flow
//! ```text
//! request
//!     → middleware::provider_token_middleware (X-Provider-Tokens → ProviderTokens)
//!     → middleware::attach_conversation_middleware (/api/conversations/{id} → Arc<Conversation>)
//!     → routes.rs handlers
//!     → manager.rs (DashMap of live conversations, each owning an EventStream)
//! ```

pub mod error;
pub mod manager;
pub mod middleware;
pub mod routes;

pub use error::ConversationError;
pub use manager::{Conversation, ConversationManager, ConversationSummary};
pub use middleware::{
    attach_conversation_middleware, provider_token_middleware, ProviderTokens, ProviderType,
    X_PROVIDER_TOKENS,
};
pub use routes::api_routes;
