//! Loopback-only CORS.
//!
//! Credentials are allowed, so the `*` wildcard cannot be sent for methods
//! or headers; the preflight's requested methods and headers are mirrored
//! back instead, which grants the same access.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

use crate::config::CorsConfig;

/// Whether `origin` (scheme://host[:port]) names a loopback host.
pub fn is_loopback_origin(origin: &str) -> bool {
    let Some(rest) = origin
        .strip_prefix("http://")
        .or_else(|| origin.strip_prefix("https://"))
    else {
        return false;
    };

    let host = if let Some(bracketed) = rest.strip_prefix('[') {
        match bracketed.split_once(']') {
            Some((host, _)) => host,
            None => return false,
        }
    } else {
        rest.split(':').next().unwrap_or_default()
    };

    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

/// Build the CORS layer for the HTTP app.
pub fn localhost_cors(config: &CorsConfig) -> CorsLayer {
    let extra: Arc<HashSet<String>> = Arc::new(
        config
            .allowed_origins
            .iter()
            .map(|o| o.trim_end_matches('/').to_string())
            .collect(),
    );

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _parts: &axum::http::request::Parts| {
                let Ok(origin) = origin.to_str() else {
                    return false;
                };
                let allowed = is_loopback_origin(origin) || extra.contains(origin);
                if !allowed {
                    tracing::debug!(origin, "Rejected cross-origin request");
                }
                allowed
            },
        ))
        .allow_credentials(true)
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{header, Method, Request, StatusCode},
        routing::get,
        Router,
    };
    use tower::ServiceExt;

    #[test]
    fn loopback_detection() {
        assert!(is_loopback_origin("http://localhost:3001"));
        assert!(is_loopback_origin("https://LOCALHOST"));
        assert!(is_loopback_origin("http://127.0.0.1:8080"));
        assert!(is_loopback_origin("http://127.0.0.2"));
        assert!(is_loopback_origin("http://[::1]:5173"));
        assert!(!is_loopback_origin("http://example.com"));
        assert!(!is_loopback_origin("http://localhost.evil.com"));
        assert!(!is_loopback_origin("file://localhost"));
        assert!(!is_loopback_origin("http://[::1"));
    }

    fn app(config: &CorsConfig) -> Router {
        Router::new()
            .route("/api/health", get(|| async { "ok" }))
            .layer(localhost_cors(config))
    }

    #[tokio::test]
    async fn preflight_from_localhost_is_mirrored() {
        let response = app(&CorsConfig::default())
            .oneshot(
                Request::builder()
                    .method(Method::OPTIONS)
                    .uri("/api/health")
                    .header(header::ORIGIN, "http://localhost:3001")
                    .header(header::ACCESS_CONTROL_REQUEST_METHOD, "DELETE")
                    .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "x-provider-tokens")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "http://localhost:3001");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], "DELETE");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], "x-provider-tokens");
    }

    #[tokio::test]
    async fn foreign_origin_gets_no_allow_header() {
        let response = app(&CorsConfig::default())
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header(header::ORIGIN, "http://example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }

    #[tokio::test]
    async fn configured_origin_is_allowed() {
        let config = CorsConfig {
            allowed_origins: vec!["https://app.example.com/".into()],
        };
        let response = app(&config)
            .oneshot(
                Request::builder()
                    .uri("/api/health")
                    .header(header::ORIGIN, "https://app.example.com")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://app.example.com"
        );
    }
}
