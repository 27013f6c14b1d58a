//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!     → each section handed to the layer that owns it
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Layers receive their own section explicitly; there are no process-wide defaults

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    CacheConfig, CompressionConfig, CorsConfig, EventsConfig, ListenerConfig, ObservabilityConfig,
    RateLimitConfig, ServerConfig, StaticFilesConfig,
};
