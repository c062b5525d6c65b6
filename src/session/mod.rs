//! Session log: ordered, append-only per-session message store.
//!
//! The agent loop records every event here — the user query, assistant text
//! fragments, tool-call announcements, tool results, and the final answer.
//! Ordering is the sole guarantee; concurrent requests driving the same
//! session interleave their appends.

mod json_store;
mod memory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SessionError;

pub use json_store::JsonFileStore;
pub use memory::MemoryStore;

/// Message author role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    Tool,
    System,
    Internal,
}

/// Semantic tag on a session message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    UserMessage,
    AssistantMessage,
    ToolCall,
    ToolResult,
    AssistantFinal,
}

/// One appended session message. The store assigns the timestamp at append
/// time when it is absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionMessage {
    pub role: Role,
    pub content: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<MessageKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl SessionMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            kind: None,
            tool_name: None,
            timestamp: None,
        }
    }

    pub fn with_kind(mut self, kind: MessageKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn with_tool_name(mut self, tool_name: impl Into<String>) -> Self {
        self.tool_name = Some(tool_name.into());
        self
    }
}

/// Full history of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHistory {
    pub session_id: String,
    #[serde(default)]
    pub messages: Vec<SessionMessage>,
}

/// Append-only per-session message store.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create the session if it does not exist.
    async fn ensure(&self, session_id: &str) -> Result<(), SessionError>;

    async fn exists(&self, session_id: &str) -> Result<bool, SessionError>;

    /// Append a message, creating the session if needed. Assigns the
    /// timestamp when the message carries none.
    async fn append(&self, session_id: &str, message: SessionMessage) -> Result<(), SessionError>;

    /// All messages of one session, in append order.
    async fn messages(&self, session_id: &str) -> Result<Vec<SessionMessage>, SessionError>;

    /// All sessions and their messages.
    async fn list_all(&self) -> Result<BTreeMap<String, Vec<SessionMessage>>, SessionError>;
}

pub(crate) fn stamp(mut message: SessionMessage) -> SessionMessage {
    if message.timestamp.is_none() {
        message.timestamp = Some(Utc::now());
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_with_type_tag() {
        let msg = SessionMessage::new(Role::Tool, "{}")
            .with_kind(MessageKind::ToolResult)
            .with_tool_name("load_files");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "tool");
        assert_eq!(value["type"], "tool_result");
        assert_eq!(value["tool_name"], "load_files");
        assert!(value.get("timestamp").is_none());
    }

    #[test]
    fn message_round_trips() {
        let msg = SessionMessage::new(Role::User, "hello").with_kind(MessageKind::UserMessage);
        let raw = serde_json::to_string(&msg).unwrap();
        let back: SessionMessage = serde_json::from_str(&raw).unwrap();
        assert_eq!(back.role, Role::User);
        assert_eq!(back.content, "hello");
        assert_eq!(back.kind, Some(MessageKind::UserMessage));
    }
}
