//! Terminal chat session over a conversation event stream.
//!
//! The session subscribes a renderer to the stream, then turns each input
//! line into a `User` message. Rendering happens inside the stream callback,
//! so output ordering follows event ids.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::Notify;

use crate::events::{Event, EventKind, EventSource, EventStream, EventSubscriber};

const CALLBACK_ID: &str = "chat";
const EXIT_COMMAND: &str = "/exit";

/// Interactive chat bound to one event stream and one writer.
pub struct ChatSession<W> {
    stream: Arc<EventStream>,
    output: Arc<Mutex<W>>,
    ready: Arc<Notify>,
}

impl<W: Write + Send + 'static> ChatSession<W> {
    pub fn new(stream: Arc<EventStream>, output: W) -> Self {
        Self {
            stream,
            output: Arc::new(Mutex::new(output)),
            ready: Arc::new(Notify::new()),
        }
    }

    /// Notified once the session is subscribed and reading input.
    pub fn ready_handle(&self) -> Arc<Notify> {
        Arc::clone(&self.ready)
    }

    /// Run until `/exit`, end of input, or a read error.
    pub async fn run<R: AsyncBufRead + Unpin>(self, input: R) -> io::Result<()> {
        let output = Arc::clone(&self.output);
        self.stream
            .subscribe(EventSubscriber::Cli, CALLBACK_ID, move |event| {
                let Some(line) = render(event) else {
                    return;
                };
                if let Ok(mut out) = output.lock() {
                    let _ = writeln!(out, "{line}");
                    let _ = out.flush();
                }
            });
        let _subscription = Subscription {
            stream: &self.stream,
        };
        self.ready.notify_one();

        let mut lines = input.lines();
        let result = loop {
            match lines.next_line().await {
                Ok(Some(line)) => {
                    let line = line.trim();
                    if line.is_empty() {
                        continue;
                    }
                    if line == EXIT_COMMAND {
                        break Ok(());
                    }
                    self.stream
                        .add_event(EventKind::message(line), EventSource::User);
                }
                Ok(None) => break Ok(()),
                Err(e) => break Err(e),
            }
        };

        tracing::debug!("Chat session ended");
        result
    }
}

/// Removes the renderer when the session ends, including when `run` is cancelled.
struct Subscription<'a> {
    stream: &'a EventStream,
}

impl Drop for Subscription<'_> {
    fn drop(&mut self) {
        self.stream.unsubscribe(EventSubscriber::Cli, CALLBACK_ID);
    }
}

/// Terminal line for an event. The user's own messages are not echoed.
pub fn render(event: &Event) -> Option<String> {
    match (&event.kind, event.source) {
        (EventKind::Message { .. }, EventSource::User) => None,
        (EventKind::Message { content }, EventSource::Agent) => Some(format!("Agent: {content}")),
        (EventKind::Message { content }, EventSource::Environment) => {
            Some(format!("Environment: {content}"))
        }
        (EventKind::Status { message }, _) => Some(format!("[{message}]")),
    }
}
