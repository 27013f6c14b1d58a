//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the agent server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Response compression settings.
    pub compression: CompressionConfig,

    /// Cache-Control policy for static and dynamic paths.
    pub cache: CacheConfig,

    /// Rate limiting configuration.
    pub rate_limit: RateLimitConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Frontend bundle served at the root path.
    pub static_files: StaticFilesConfig,

    /// Conversation event stream settings.
    pub events: EventsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "127.0.0.1:3000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:3000".to_string(),
        }
    }
}

/// Gzip compression settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CompressionConfig {
    /// Enable response compression.
    pub enabled: bool,

    /// Bodies must be strictly larger than this many bytes to be compressed.
    pub minimum_size: usize,

    /// MIME types eligible for compression (parameters excluded).
    pub compressible_types: Vec<String>,
}

impl Default for CompressionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            minimum_size: 500,
            compressible_types: [
                "text/html",
                "text/css",
                "text/javascript",
                "application/javascript",
                "application/json",
                "text/plain",
                "text/xml",
                "application/xml",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Cache header configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Path prefixes treated as immutable static assets.
    pub static_paths: Vec<String>,

    /// max-age for static assets in seconds (default: one week).
    pub max_age_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            static_paths: vec![
                "/assets/".to_string(),
                "/static/".to_string(),
                "/favicon.ico".to_string(),
            ],
            max_age_secs: 604_800,
        }
    }
}

impl CacheConfig {
    /// Whether `path` falls under one of the static prefixes.
    pub fn is_static(&self, path: &str) -> bool {
        self.static_paths
            .iter()
            .any(|prefix| path.starts_with(prefix.as_str()))
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Enable rate limiting.
    pub enabled: bool,

    /// Requests allowed per window, per client.
    pub requests: u32,

    /// Window length in seconds.
    pub seconds: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests: 20,
            seconds: 1,
        }
    }
}

/// CORS configuration.
///
/// Loopback origins are always allowed; `allowed_origins` adds exact
/// matches on top (e.g. a hosted frontend).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

/// Static frontend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StaticFilesConfig {
    /// Directory holding the built frontend.
    pub directory: String,

    /// File served for paths that match nothing (client-side routes).
    pub index: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            directory: "./frontend/build".to_string(),
            index: "index.html".to_string(),
        }
    }
}

/// Event stream configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct EventsConfig {
    /// Events retained per conversation for replay.
    pub history_limit: usize,
}

impl Default for EventsConfig {
    fn default() -> Self {
        Self {
            history_limit: 1000,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = ServerConfig::default();
        assert_eq!(config.compression.minimum_size, 500);
        assert_eq!(config.compression.compressible_types.len(), 8);
        assert_eq!(config.cache.max_age_secs, 604_800);
        assert_eq!(config.rate_limit.requests, 20);
        assert_eq!(config.rate_limit.seconds, 1);
    }

    #[test]
    fn static_prefix_matching() {
        let cache = CacheConfig::default();
        assert!(cache.is_static("/assets/app.js"));
        assert!(cache.is_static("/favicon.ico"));
        assert!(!cache.is_static("/api/conversations"));
        assert!(!cache.is_static("/assetsx"));
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ServerConfig = toml::from_str(
            r#"
            [rate_limit]
            requests = 5
            "#,
        )
        .unwrap();
        assert_eq!(config.rate_limit.requests, 5);
        assert_eq!(config.rate_limit.seconds, 1);
        assert_eq!(config.listener.bind_address, "127.0.0.1:3000");
    }
}
