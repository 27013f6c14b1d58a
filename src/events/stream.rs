//! Subscription registry and synchronous fan-out.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use crate::events::event::{Event, EventKind, EventSource};
use crate::observability::metrics;

/// Callback invoked for every published event.
pub type EventCallback = Arc<dyn Fn(&Event) + Send + Sync>;

/// Well-known subscriber ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventSubscriber {
    Server,
    Cli,
    Realtime,
    Test,
}

impl fmt::Display for EventSubscriber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EventSubscriber::Server => "server",
            EventSubscriber::Cli => "cli",
            EventSubscriber::Realtime => "realtime",
            EventSubscriber::Test => "test",
        };
        f.write_str(name)
    }
}

struct Registration {
    subscriber: EventSubscriber,
    callback_id: String,
    callback: EventCallback,
}

struct StreamState {
    next_id: u64,
    history: VecDeque<Event>,
}

/// Ordered fan-out of events to registered callbacks.
///
/// Publishers are serialised by a dispatch lock, so every callback sees
/// events in id order. The registry is snapshotted before callbacks run;
/// a callback may subscribe or unsubscribe, but must not publish to the
/// same stream synchronously (hand off to a channel instead).
pub struct EventStream {
    registry: Mutex<Vec<Registration>>,
    state: Mutex<StreamState>,
    dispatch: Mutex<()>,
    history_limit: usize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl EventStream {
    pub fn new(history_limit: usize) -> Self {
        Self {
            registry: Mutex::new(Vec::new()),
            state: Mutex::new(StreamState {
                next_id: 0,
                history: VecDeque::new(),
            }),
            dispatch: Mutex::new(()),
            history_limit: history_limit.max(1),
        }
    }

    /// Register `callback` under `(subscriber, callback_id)`.
    ///
    /// Re-registering an existing pair replaces the callback but keeps its
    /// position in dispatch order.
    pub fn subscribe<F>(&self, subscriber: EventSubscriber, callback_id: &str, callback: F)
    where
        F: Fn(&Event) + Send + Sync + 'static,
    {
        let callback: EventCallback = Arc::new(callback);
        let mut registry = lock(&self.registry);
        match registry
            .iter_mut()
            .find(|r| r.subscriber == subscriber && r.callback_id == callback_id)
        {
            Some(existing) => existing.callback = callback,
            None => registry.push(Registration {
                subscriber,
                callback_id: callback_id.to_string(),
                callback,
            }),
        }
        tracing::debug!(subscriber = %subscriber, callback_id, "Subscribed to event stream");
    }

    /// Remove a registration. Unknown pairs are ignored.
    pub fn unsubscribe(&self, subscriber: EventSubscriber, callback_id: &str) {
        let mut registry = lock(&self.registry);
        let before = registry.len();
        registry.retain(|r| !(r.subscriber == subscriber && r.callback_id == callback_id));
        if registry.len() != before {
            tracing::debug!(subscriber = %subscriber, callback_id, "Unsubscribed from event stream");
        }
    }

    /// Stamp and publish an event, returning it once every callback has run.
    pub fn add_event(&self, kind: EventKind, source: EventSource) -> Event {
        let _dispatch = lock(&self.dispatch);

        let event = {
            let mut state = lock(&self.state);
            let event = Event {
                id: state.next_id,
                source,
                timestamp: Utc::now(),
                kind,
            };
            state.next_id += 1;
            state.history.push_back(event.clone());
            while state.history.len() > self.history_limit {
                state.history.pop_front();
            }
            event
        };

        let callbacks: Vec<EventCallback> = lock(&self.registry)
            .iter()
            .map(|r| Arc::clone(&r.callback))
            .collect();

        tracing::trace!(
            event_id = event.id,
            source = %event.source,
            subscribers = callbacks.len(),
            "Dispatching event"
        );
        for callback in &callbacks {
            callback(&event);
        }

        metrics::record_event_published(source.as_str());
        event
    }

    /// Retained events with id greater than `since` (all when `None`).
    pub fn get_events(&self, since: Option<u64>) -> Vec<Event> {
        lock(&self.state)
            .history
            .iter()
            .filter(|e| since.map_or(true, |since| e.id > since))
            .cloned()
            .collect()
    }

    /// Id of the most recent event, if any were published.
    pub fn latest_id(&self) -> Option<u64> {
        lock(&self.state).next_id.checked_sub(1)
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.registry).len()
    }
}

impl Default for EventStream {
    fn default() -> Self {
        Self::new(1000)
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("subscribers", &self.subscriber_count())
            .field("latest_id", &self.latest_id())
            .finish()
    }
}
