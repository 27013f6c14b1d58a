//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer composition, graceful shutdown)
//!     → performance/ (timing, cache headers, gzip)
//!     → conversation API routes
//!     → static_files.rs (SPA fallback)
//!     → Send to client
//! ```

pub mod performance;
pub mod server;
pub mod static_files;

pub use server::{HttpServer, ServerError};
