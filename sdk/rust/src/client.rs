use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;

type Error = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationInfo {
    pub id: String,
    pub title: Option<String>,
    pub created_at: String,
    pub providers: Vec<String>,
    pub latest_event_id: Option<u64>,
    pub subscribers: usize,
}

/// Event as sent on the wire; `content` is set for messages, `message` for status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventInfo {
    pub id: u64,
    pub source: String,
    pub timestamp: String,
    pub kind: String,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

pub struct AgentClient {
    client: Client,
    base_url: String,
}

impl AgentClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn health(&self) -> Result<serde_json::Value, Error> {
        let resp = self.get("/api/health").await?;
        decode(resp).await
    }

    /// Start a conversation, optionally passing a raw `X-Provider-Tokens` JSON value.
    pub async fn create_conversation(
        &self,
        title: Option<&str>,
        provider_tokens: Option<&str>,
    ) -> Result<ConversationInfo, Error> {
        let mut req = self
            .client
            .post(format!("{}/api/conversations", self.base_url))
            .json(&json!({ "title": title }));
        if let Some(tokens) = provider_tokens {
            req = req.header("X-Provider-Tokens", tokens);
        }
        decode(req.send().await?).await
    }

    pub async fn list_conversations(&self) -> Result<Vec<ConversationInfo>, Error> {
        let resp = self.get("/api/conversations").await?;
        decode(resp).await
    }

    pub async fn delete_conversation(&self, conversation_id: &str) -> Result<(), Error> {
        let resp = self
            .client
            .delete(format!(
                "{}/api/conversations/{}",
                self.base_url, conversation_id
            ))
            .send()
            .await?;
        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await?;
            return Err(format!("Server returned error status {}: {}", status, text).into());
        }
        Ok(())
    }

    pub async fn post_event(
        &self,
        conversation_id: &str,
        content: &str,
        source: Option<&str>,
    ) -> Result<EventInfo, Error> {
        let resp = self
            .client
            .post(format!(
                "{}/api/conversations/{}/events",
                self.base_url, conversation_id
            ))
            .json(&json!({ "content": content, "source": source }))
            .send()
            .await?;
        decode(resp).await
    }

    pub async fn list_events(
        &self,
        conversation_id: &str,
        since: Option<u64>,
    ) -> Result<Vec<EventInfo>, Error> {
        let path = match since {
            Some(since) => format!("/api/conversations/{conversation_id}/events?since={since}"),
            None => format!("/api/conversations/{conversation_id}/events"),
        };
        let resp = self.get(&path).await?;
        decode(resp).await
    }

    /// Plain GET against any path, for callers that need the raw response.
    pub async fn get(&self, path: &str) -> Result<Response, reqwest::Error> {
        self.client
            .get(format!("{}{}", self.base_url, path))
            .send()
            .await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(resp: Response) -> Result<T, Error> {
    let status = resp.status();
    let text = resp.text().await?;
    if !status.is_success() {
        return Err(format!("Server returned error status {}: {}", status, text).into());
    }
    Ok(serde_json::from_str(&text)?)
}
