//! Gzip response compression.
//!
//! A response is compressed only when every condition holds:
//! - the request `Accept-Encoding` lists `gzip` (and not with `q=0`)
//! - the response `Content-Type`, minus parameters, is in the allow-set
//! - the response carries no `Content-Encoding`
//! - the body is strictly longer than the configured minimum
//! - the response is not a byte range (`206` or `Content-Range`)
//!
//! Anything else passes through with headers and body untouched.

use std::collections::HashSet;
use std::io::Write;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{
        header::{
            ACCEPT_ENCODING, CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_RANGE, CONTENT_TYPE, VARY,
        },
        HeaderMap, HeaderValue, Request, StatusCode,
    },
    middleware::Next,
    response::{IntoResponse, Response},
};
use flate2::{write::GzEncoder, Compression};

use crate::config::CompressionConfig;
use crate::observability::metrics;

/// Immutable compression policy shared by every request.
#[derive(Debug, Clone)]
pub struct CompressionPolicy {
    minimum_size: usize,
    compressible_types: HashSet<String>,
}

impl CompressionPolicy {
    pub fn new(config: &CompressionConfig) -> Self {
        Self {
            minimum_size: config.minimum_size,
            compressible_types: config
                .compressible_types
                .iter()
                .map(|t| t.trim().to_ascii_lowercase())
                .collect(),
        }
    }

    fn is_compressible_type(&self, headers: &HeaderMap) -> bool {
        headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| {
                let mime = ct.split(';').next().unwrap_or_default().trim();
                self.compressible_types
                    .contains(&mime.to_ascii_lowercase())
            })
            .unwrap_or(false)
    }

    /// Status and header checks; the body length is checked once it is read.
    fn is_candidate(&self, status: StatusCode, headers: &HeaderMap) -> bool {
        status != StatusCode::PARTIAL_CONTENT
            && !headers.contains_key(CONTENT_RANGE)
            && !headers.contains_key(CONTENT_ENCODING)
            && self.is_compressible_type(headers)
    }

    fn declared_length_too_small(&self, headers: &HeaderMap) -> bool {
        headers
            .get(CONTENT_LENGTH)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<usize>().ok())
            .is_some_and(|len| len <= self.minimum_size)
    }
}

/// Whether an `Accept-Encoding` value admits gzip.
pub fn accepts_gzip(accept_encoding: &str) -> bool {
    accept_encoding.split(',').any(|entry| {
        let mut params = entry.split(';');
        let coding = params.next().unwrap_or_default().trim();
        if !coding.eq_ignore_ascii_case("gzip") {
            return false;
        }
        // "gzip;q=0" explicitly refuses the coding.
        !params.any(|p| {
            p.trim()
                .strip_prefix("q=")
                .and_then(|q| q.trim().parse::<f32>().ok())
                .is_some_and(|q| q <= 0.0)
        })
    })
}

/// Gzip `data` at the default compression level.
pub fn gzip(data: &[u8]) -> std::io::Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::default());
    encoder.write_all(data)?;
    encoder.finish()
}

pub async fn compression_middleware(
    State(policy): State<Arc<CompressionPolicy>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let wants_gzip = request
        .headers()
        .get(ACCEPT_ENCODING)
        .and_then(|v| v.to_str().ok())
        .is_some_and(accepts_gzip);

    let response = next.run(request).await;

    if !wants_gzip
        || !policy.is_candidate(response.status(), response.headers())
        || policy.declared_length_too_small(response.headers())
    {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let bytes = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "Failed to buffer response body for compression");
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to read response body")
                .into_response();
        }
    };

    if bytes.len() <= policy.minimum_size {
        return Response::from_parts(parts, Body::from(bytes));
    }

    let compressed = match gzip(&bytes) {
        Ok(compressed) => compressed,
        Err(e) => {
            tracing::warn!(error = %e, "Gzip failed, sending uncompressed body");
            return Response::from_parts(parts, Body::from(bytes));
        }
    };

    tracing::trace!(
        original = bytes.len(),
        compressed = compressed.len(),
        "Compressed response body"
    );
    metrics::record_compression(bytes.len(), compressed.len());

    parts
        .headers
        .insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
    parts
        .headers
        .insert(CONTENT_LENGTH, HeaderValue::from(compressed.len()));
    parts
        .headers
        .append(VARY, HeaderValue::from_static("accept-encoding"));
    Response::from_parts(parts, Body::from(compressed))
}
