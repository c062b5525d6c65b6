//! In-process session store.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::SessionError;
use crate::session::{stamp, SessionMessage, SessionStore};

/// In-memory store behind an async RwLock. The default for tests and for
/// deployments that do not need persistence.
#[derive(Default)]
pub struct MemoryStore {
    sessions: RwLock<BTreeMap<String, Vec<SessionMessage>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn ensure(&self, session_id: &str) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default();
        Ok(())
    }

    async fn exists(&self, session_id: &str) -> Result<bool, SessionError> {
        Ok(self.sessions.read().await.contains_key(session_id))
    }

    async fn append(&self, session_id: &str, message: SessionMessage) -> Result<(), SessionError> {
        self.sessions
            .write()
            .await
            .entry(session_id.to_string())
            .or_default()
            .push(stamp(message));
        Ok(())
    }

    async fn messages(&self, session_id: &str) -> Result<Vec<SessionMessage>, SessionError> {
        self.sessions
            .read()
            .await
            .get(session_id)
            .cloned()
            .ok_or_else(|| SessionError::NotFound {
                id: session_id.to_string(),
            })
    }

    async fn list_all(&self) -> Result<BTreeMap<String, Vec<SessionMessage>>, SessionError> {
        Ok(self.sessions.read().await.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[tokio::test]
    async fn append_read_round_trip_preserves_order() {
        let store = MemoryStore::new();
        store.ensure("s1").await.unwrap();

        for i in 0..5 {
            store
                .append("s1", SessionMessage::new(Role::User, format!("msg {i}")))
                .await
                .unwrap();
        }

        let messages = store.messages("s1").await.unwrap();
        assert_eq!(messages.len(), 5);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.content, format!("msg {i}"));
            assert!(msg.timestamp.is_some(), "timestamp assigned at append");
        }
    }

    #[tokio::test]
    async fn missing_session_is_not_found() {
        let store = MemoryStore::new();
        assert!(!store.exists("nope").await.unwrap());
        assert!(store.messages("nope").await.is_err());
    }

    #[tokio::test]
    async fn ensure_is_idempotent() {
        let store = MemoryStore::new();
        store.ensure("s").await.unwrap();
        store
            .append("s", SessionMessage::new(Role::User, "hi"))
            .await
            .unwrap();
        store.ensure("s").await.unwrap();
        assert_eq!(store.messages("s").await.unwrap().len(), 1);
    }
}
