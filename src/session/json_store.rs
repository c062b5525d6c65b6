//! Single-file JSON session store.

use std::collections::BTreeMap;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::error::SessionError;
use crate::session::{stamp, SessionMessage, SessionStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionRecord {
    #[serde(default)]
    messages: Vec<SessionMessage>,
}

/// Persists all sessions to one JSON file via read-modify-write.
///
/// Appends within this process are serialized behind a mutex. Two *processes*
/// racing the same file are last-write-wins; that race is a documented
/// limitation of this store, not something the agent core resolves.
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    async fn load_all(&self) -> Result<BTreeMap<String, SessionRecord>, SessionError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => return Err(e.into()),
        };
        match serde_json::from_str(&raw) {
            Ok(data) => Ok(data),
            Err(e) => {
                // Unreadable file: start fresh rather than wedging every request.
                tracing::warn!("Session file {} is corrupt ({}), ignoring", self.path.display(), e);
                Ok(BTreeMap::new())
            }
        }
    }

    async fn save_all(&self, data: &BTreeMap<String, SessionRecord>) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let raw = serde_json::to_string_pretty(data)?;
        tokio::fs::write(&self.path, raw).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn ensure(&self, session_id: &str) -> Result<(), SessionError> {
        let _guard = self.lock.lock().await;
        let mut data = self.load_all().await?;
        data.entry(session_id.to_string()).or_default();
        self.save_all(&data).await
    }

    async fn exists(&self, session_id: &str) -> Result<bool, SessionError> {
        let _guard = self.lock.lock().await;
        Ok(self.load_all().await?.contains_key(session_id))
    }

    async fn append(&self, session_id: &str, message: SessionMessage) -> Result<(), SessionError> {
        let _guard = self.lock.lock().await;
        let mut data = self.load_all().await?;
        data.entry(session_id.to_string())
            .or_default()
            .messages
            .push(stamp(message));
        self.save_all(&data).await
    }

    async fn messages(&self, session_id: &str) -> Result<Vec<SessionMessage>, SessionError> {
        let _guard = self.lock.lock().await;
        self.load_all()
            .await?
            .remove(session_id)
            .map(|record| record.messages)
            .ok_or_else(|| SessionError::NotFound {
                id: session_id.to_string(),
            })
    }

    async fn list_all(&self) -> Result<BTreeMap<String, Vec<SessionMessage>>, SessionError> {
        let _guard = self.lock.lock().await;
        Ok(self
            .load_all()
            .await?
            .into_iter()
            .map(|(id, record)| (id, record.messages))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{MessageKind, Role};

    fn temp_store() -> (JsonFileStore, tempfile::TempDir) {
        let dir = tempfile::tempdir().expect("temp dir");
        let store = JsonFileStore::new(dir.path().join("sessions.json"));
        (store, dir)
    }

    #[tokio::test]
    async fn round_trip_preserves_order_and_timestamps() {
        let (store, _dir) = temp_store();
        store.ensure("s1").await.unwrap();

        for i in 0..4 {
            store
                .append(
                    "s1",
                    SessionMessage::new(Role::Assistant, format!("m{i}"))
                        .with_kind(MessageKind::AssistantMessage),
                )
                .await
                .unwrap();
        }

        let messages = store.messages("s1").await.unwrap();
        assert_eq!(messages.len(), 4);
        for (i, msg) in messages.iter().enumerate() {
            assert_eq!(msg.content, format!("m{i}"));
            assert!(msg.timestamp.is_some());
        }
    }

    #[tokio::test]
    async fn missing_file_reads_as_empty() {
        let (store, _dir) = temp_store();
        assert!(store.list_all().await.unwrap().is_empty());
        assert!(!store.exists("s").await.unwrap());
    }

    #[tokio::test]
    async fn corrupt_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");
        std::fs::write(&path, "not json at all").unwrap();
        let store = JsonFileStore::new(&path);
        assert!(store.list_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.json");

        {
            let store = JsonFileStore::new(&path);
            store
                .append("s1", SessionMessage::new(Role::User, "persisted"))
                .await
                .unwrap();
        }

        let store = JsonFileStore::new(&path);
        let messages = store.messages("s1").await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].content, "persisted");
    }
}
