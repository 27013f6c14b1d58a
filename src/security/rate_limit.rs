//! In-memory per-client rate limiting.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::{ConnectInfo, State},
    http::{header::RETRY_AFTER, HeaderValue, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::{CacheConfig, RateLimitConfig};
use crate::observability::metrics;

/// Prune idle buckets once the table grows past this.
const MAX_TRACKED_CLIENTS: usize = 10_000;
const IDLE_BUCKET_TTL: Duration = Duration::from_secs(60);

/// A simple token bucket.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn new(capacity: f64, now: Instant) -> Self {
        Self {
            tokens: capacity,
            last_update: now,
        }
    }

    fn try_acquire(&mut self, capacity: f64, refill_rate: f64, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();

        self.tokens = (self.tokens + elapsed * refill_rate).min(capacity);
        self.last_update = now;

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

/// Token-bucket limiter keyed by client.
///
/// Each client may burst up to `requests` and refills at
/// `requests / seconds` tokens per second.
#[derive(Debug)]
pub struct InMemoryRateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    capacity: f64,
    refill_rate: f64,
    window: Duration,
}

impl InMemoryRateLimiter {
    pub fn new(requests: u32, seconds: u64) -> Self {
        let capacity = f64::from(requests.max(1));
        let seconds = seconds.max(1);
        Self {
            buckets: Mutex::new(HashMap::new()),
            capacity,
            refill_rate: capacity / seconds as f64,
            window: Duration::from_secs(seconds),
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests, config.seconds)
    }

    /// Take one token for `key`; false when the client is over its limit.
    pub fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    fn check_at(&self, key: &str, now: Instant) -> bool {
        let mut buckets = self
            .buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if buckets.len() > MAX_TRACKED_CLIENTS {
            buckets.retain(|_, b| now.saturating_duration_since(b.last_update) < IDLE_BUCKET_TTL);
        }

        let capacity = self.capacity;
        buckets
            .entry(key.to_string())
            .or_insert_with(|| TokenBucket::new(capacity, now))
            .try_acquire(capacity, self.refill_rate, now)
    }

    /// Seconds a rejected client should wait, rounded up.
    pub fn retry_after_secs(&self) -> u64 {
        let per_token = 1.0 / self.refill_rate;
        (per_token.ceil() as u64).clamp(1, self.window.as_secs().max(1))
    }

    pub fn tracked_clients(&self) -> usize {
        self.buckets
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// State for the rate limit middleware.
#[derive(Debug, Clone)]
pub struct RateLimitState {
    pub limiter: Arc<InMemoryRateLimiter>,
    /// Static asset requests are never limited.
    pub cache: Arc<CacheConfig>,
}

/// Middleware function for per-client rate limiting.
pub async fn rate_limit_middleware(
    State(state): State<RateLimitState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    if state.cache.is_static(request.uri().path()) {
        return next.run(request).await;
    }

    // ConnectInfo is absent when the router is driven without a listener.
    let key = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    if state.limiter.check(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, path = %request.uri().path(), "Rate limit exceeded");
        metrics::record_rate_limited("rps_limit");
        (
            StatusCode::TOO_MANY_REQUESTS,
            [(RETRY_AFTER, HeaderValue::from(state.limiter.retry_after_secs()))],
            "Too many requests",
        )
            .into_response()
    }
}
