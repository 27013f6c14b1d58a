//! Response performance middleware.
//!
//! # Layer Order
//! ```text
//! request  → timing → cache_headers → compression → handler
//! response ← timing ← cache_headers ← compression ← handler
//! ```
//!
//! Timing is outermost so `X-Process-Time` includes compression work.
//! Compression is innermost so it sees the handler's own headers and its
//! `Content-Length` describes the bytes actually sent.

pub mod cache_headers;
pub mod compression;
pub mod timing;

use std::sync::Arc;

use axum::{middleware, Router};

use crate::config::{CacheConfig, CompressionConfig};

pub use cache_headers::{cache_headers_middleware, CachePolicy};
pub use compression::{compression_middleware, CompressionPolicy};
pub use timing::{timing_middleware, X_PROCESS_TIME};

/// Layer compression, cache headers and timing onto `router`.
pub fn apply_performance_optimizations(
    router: Router,
    compression: &CompressionConfig,
    cache: &CacheConfig,
) -> Router {
    let router = if compression.enabled {
        router.layer(middleware::from_fn_with_state(
            Arc::new(CompressionPolicy::new(compression)),
            compression_middleware,
        ))
    } else {
        router
    };

    router
        .layer(middleware::from_fn_with_state(
            Arc::new(CachePolicy::new(cache)),
            cache_headers_middleware,
        ))
        .layer(middleware::from_fn(timing_middleware))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{
            header::{ACCEPT_ENCODING, CACHE_CONTROL, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE},
            Request,
        },
        routing::get,
    };
    use tower::ServiceExt;

    fn app(compression: &CompressionConfig) -> Router {
        let router = Router::new()
            .route(
                "/assets/app.js",
                get(|| async { ([(CONTENT_TYPE, "application/javascript")], "var a = 1;\n".repeat(100)) }),
            )
            .route(
                "/api/data",
                get(|| async { ([(CONTENT_TYPE, "application/json")], format!("[{}]", "1,".repeat(400) + "1")) }),
            );
        apply_performance_optimizations(router, compression, &CacheConfig::default())
    }

    fn gzip_request(path: &str) -> Request<Body> {
        Request::builder()
            .uri(path)
            .header(ACCEPT_ENCODING, "gzip")
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn full_stack_on_static_asset() {
        let response = app(&CompressionConfig::default())
            .oneshot(gzip_request("/assets/app.js"))
            .await
            .unwrap();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();

        assert_eq!(headers[CONTENT_ENCODING], "gzip");
        assert_eq!(headers[CONTENT_LENGTH], body.len().to_string().as_str());
        assert_eq!(headers[CACHE_CONTROL], "public, max-age=604800, immutable");
        assert!(headers.contains_key(&X_PROCESS_TIME));
    }

    #[tokio::test]
    async fn full_stack_on_dynamic_path() {
        let response = app(&CompressionConfig::default())
            .oneshot(gzip_request("/api/data"))
            .await
            .unwrap();
        let headers = response.headers();
        assert_eq!(headers[CONTENT_ENCODING], "gzip");
        assert_eq!(headers[CACHE_CONTROL], cache_headers::NO_CACHE_DIRECTIVE);
        assert_eq!(headers["pragma"], "no-cache");
        assert_eq!(headers["expires"], "0");
    }

    #[tokio::test]
    async fn compression_can_be_disabled() {
        let config = CompressionConfig {
            enabled: false,
            ..CompressionConfig::default()
        };
        let response = app(&config).oneshot(gzip_request("/api/data")).await.unwrap();
        assert!(response.headers().get(CONTENT_ENCODING).is_none());
        assert!(response.headers().contains_key(&X_PROCESS_TIME));
    }
}
