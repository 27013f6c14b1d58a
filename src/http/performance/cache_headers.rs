//! Cache-Control headers by path class.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{CACHE_CONTROL, EXPIRES, PRAGMA},
        HeaderValue, Request,
    },
    middleware::Next,
    response::Response,
};

use crate::config::CacheConfig;

pub const NO_CACHE_DIRECTIVE: &str = "no-cache, no-store, must-revalidate, max-age=0";

/// Precomputed header values for the two path classes.
#[derive(Debug, Clone)]
pub struct CachePolicy {
    config: CacheConfig,
    static_value: Option<HeaderValue>,
}

impl CachePolicy {
    pub fn new(config: &CacheConfig) -> Self {
        let directive = format!("public, max-age={}, immutable", config.max_age_secs);
        Self {
            config: config.clone(),
            static_value: HeaderValue::try_from(directive).ok(),
        }
    }
}

pub async fn cache_headers_middleware(
    State(policy): State<Arc<CachePolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let is_static = policy.config.is_static(request.uri().path());

    let mut response = next.run(request).await;
    let headers = response.headers_mut();

    match (is_static, &policy.static_value) {
        (true, Some(value)) => {
            headers.insert(CACHE_CONTROL, value.clone());
        }
        _ => {
            headers.insert(CACHE_CONTROL, HeaderValue::from_static(NO_CACHE_DIRECTIVE));
            headers.insert(PRAGMA, HeaderValue::from_static("no-cache"));
            headers.insert(EXPIRES, HeaderValue::from_static("0"));
        }
    }

    response
}
