//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → rate_limit.rs (per-client token bucket, static assets exempt)
//!     → [performance layers]
//!     → cors.rs (loopback-only origins, preflight handling)
//!     → application routes
//! ```

pub mod cors;
pub mod rate_limit;

pub use cors::localhost_cors;
pub use rate_limit::{rate_limit_middleware, InMemoryRateLimiter, RateLimitState};
