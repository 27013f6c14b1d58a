//! Registry of live conversations.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;

use crate::conversation::middleware::ProviderType;
use crate::events::{EventStream, EventSubscriber};

/// A live conversation and its event stream.
#[derive(Debug)]
pub struct Conversation {
    pub id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    /// Git providers the creator had tokens for. Tokens themselves are not kept.
    pub providers: Vec<ProviderType>,
    pub stream: Arc<EventStream>,
    closed: watch::Sender<bool>,
}

/// Public view of a conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub id: String,
    pub title: Option<String>,
    pub created_at: DateTime<Utc>,
    pub providers: Vec<ProviderType>,
    pub latest_event_id: Option<u64>,
    pub subscribers: usize,
}

impl Conversation {
    /// Mark the conversation gone; socket sessions watching it disconnect.
    pub fn close(&self) {
        self.closed.send_replace(true);
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Resolves once `close` has been called.
    pub fn closed(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }

    pub fn summary(&self) -> ConversationSummary {
        ConversationSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            created_at: self.created_at,
            providers: self.providers.clone(),
            latest_event_id: self.stream.latest_id(),
            subscribers: self.stream.subscriber_count(),
        }
    }
}

/// Thread-safe map of conversation id to conversation.
#[derive(Debug)]
pub struct ConversationManager {
    conversations: DashMap<String, Arc<Conversation>>,
    history_limit: usize,
}

impl ConversationManager {
    pub fn new(history_limit: usize) -> Self {
        Self {
            conversations: DashMap::new(),
            history_limit,
        }
    }

    /// Start a new conversation with a fresh event stream.
    pub fn create(&self, title: Option<String>, providers: Vec<ProviderType>) -> Arc<Conversation> {
        let id = uuid::Uuid::new_v4().simple().to_string();
        let stream = Arc::new(EventStream::new(self.history_limit));

        let log_id = id.clone();
        stream.subscribe(EventSubscriber::Server, "log", move |event| {
            tracing::debug!(
                conversation_id = %log_id,
                event_id = event.id,
                source = %event.source,
                "Conversation event"
            );
        });

        let conversation = Arc::new(Conversation {
            id: id.clone(),
            title,
            created_at: Utc::now(),
            providers,
            stream,
            closed: watch::channel(false).0,
        });
        self.conversations.insert(id.clone(), Arc::clone(&conversation));
        tracing::info!(conversation_id = %id, "Conversation created");
        conversation
    }

    pub fn get(&self, id: &str) -> Option<Arc<Conversation>> {
        self.conversations.get(id).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove and close a conversation. Socket sessions on it are ended;
    /// other holders of the Arc keep a readable stream.
    pub fn remove(&self, id: &str) -> Option<Arc<Conversation>> {
        let removed = self.conversations.remove(id).map(|(_, c)| c);
        if let Some(conversation) = &removed {
            conversation.close();
            tracing::info!(conversation_id = %id, "Conversation removed");
        }
        removed
    }

    /// Summaries ordered by creation time, oldest first.
    pub fn list(&self) -> Vec<ConversationSummary> {
        let mut summaries: Vec<ConversationSummary> = self
            .conversations
            .iter()
            .map(|entry| entry.value().summary())
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        summaries
    }

    pub fn len(&self) -> usize {
        self.conversations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conversations.is_empty()
    }
}

impl Default for ConversationManager {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventKind, EventSource};

    #[test]
    fn create_get_remove() {
        let manager = ConversationManager::default();
        let conversation = manager.create(Some("demo".into()), vec![ProviderType::Github]);
        assert_eq!(conversation.id.len(), 32);
        assert_eq!(manager.len(), 1);

        let found = manager.get(&conversation.id).unwrap();
        assert!(Arc::ptr_eq(&found, &conversation));

        let closed = conversation.closed();
        assert!(!conversation.is_closed());
        assert!(manager.remove(&conversation.id).is_some());
        assert!(conversation.is_closed());
        assert!(closed.has_changed().unwrap());
        assert!(manager.get(&conversation.id).is_none());
        assert!(manager.remove(&conversation.id).is_none());
        assert!(manager.is_empty());
    }

    #[test]
    fn summary_reflects_stream() {
        let manager = ConversationManager::default();
        let conversation = manager.create(None, Vec::new());
        assert_eq!(conversation.summary().latest_event_id, None);

        conversation
            .stream
            .add_event(EventKind::message("hello"), EventSource::User);
        let summary = conversation.summary();
        assert_eq!(summary.latest_event_id, Some(0));
        // the server's own logging subscriber
        assert_eq!(summary.subscribers, 1);
    }

    #[test]
    fn streams_are_independent() {
        let manager = ConversationManager::default();
        let a = manager.create(None, Vec::new());
        let b = manager.create(None, Vec::new());
        a.stream.add_event(EventKind::message("x"), EventSource::User);
        assert_eq!(a.stream.latest_id(), Some(0));
        assert_eq!(b.stream.latest_id(), None);
        assert_eq!(manager.list().len(), 2);
    }
}
