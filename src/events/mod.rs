//! In-process conversation event streams.
//!
//! # Data Flow
//! ```text
//! producer (HTTP API, socket client, CLI input)
//!     → EventStream::add_event (assign id, source, timestamp; append history)
//!     → every registered callback, in registration order
//!     → consumers (socket forwarders, CLI renderer)
//! ```
//!
//! There is no persistence and no cross-process delivery. Streams live as
//! long as their conversation.

pub mod event;
pub mod stream;

pub use event::{Event, EventKind, EventSource};
pub use stream::{EventCallback, EventStream, EventSubscriber};
