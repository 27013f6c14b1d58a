//! HTTP client for the agent server's conversation API.

pub mod client;

pub use client::{AgentClient, ConversationInfo, EventInfo};
