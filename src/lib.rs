//! Agent conversation server library.

pub mod cli;
pub mod config;
pub mod conversation;
pub mod events;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod realtime;
pub mod security;

pub use config::schema::ServerConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
