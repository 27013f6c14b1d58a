//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → shutdown_signal() resolves
//!
//! Shutdown (shutdown.rs):
//!     trigger() or signal → requested() resolves → server drains and exits
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::{Shutdown, ShutdownReason};
pub use signals::shutdown_signal;
