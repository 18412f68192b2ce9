//! In-memory session store implementation.
//!
//! State is lost when the process exits. Useful for one-shot runs and tests.

use super::{resolve_session_id, Session, SessionKey, SessionStore, State, StateDelta};
use crate::error::{RecallError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use tracing::debug;

/// In-memory session store.
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<SessionKey, Session>>,
}

impl MemorySessionStore {
    /// Create a new, empty in-memory session store.
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

fn lock_error<E: std::fmt::Display>(e: E) -> RecallError {
    RecallError::SessionStore(format!("Failed to acquire lock: {}", e))
}

fn not_found(key: &SessionKey) -> RecallError {
    RecallError::SessionNotFound {
        app_name: key.app_name.clone(),
        user_id: key.user_id.clone(),
        session_id: key.session_id.clone(),
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
        state: State,
    ) -> Result<Session> {
        let id = resolve_session_id(session_id);
        let key = SessionKey::new(app_name, user_id, &id);

        let mut sessions = self.sessions.write().map_err(lock_error)?;
        if sessions.contains_key(&key) {
            return Err(RecallError::SessionExists(id));
        }

        let session = Session::new(app_name, user_id, &id, state);
        sessions.insert(key, session.clone());

        debug!("Created in-memory session {}", id);
        Ok(session)
    }

    async fn get_session(&self, key: &SessionKey) -> Result<Session> {
        let sessions = self.sessions.read().map_err(lock_error)?;
        sessions.get(key).cloned().ok_or_else(|| not_found(key))
    }

    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>> {
        let sessions = self.sessions.read().map_err(lock_error)?;

        let mut result: Vec<Session> = sessions
            .values()
            .filter(|s| s.app_name == app_name && s.user_id == user_id)
            .cloned()
            .collect();

        result.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(result)
    }

    async fn apply_delta(&self, key: &SessionKey, delta: &StateDelta) -> Result<Session> {
        let mut sessions = self.sessions.write().map_err(lock_error)?;
        let session = sessions.get_mut(key).ok_or_else(|| not_found(key))?;

        session.state.apply(delta);
        session.updated_at = Utc::now();

        debug!("Applied delta {:?} to session {}", delta.keys(), key.session_id);
        Ok(session.clone())
    }

    async fn delete_session(&self, key: &SessionKey) -> Result<bool> {
        let mut sessions = self.sessions.write().map_err(lock_error)?;
        Ok(sessions.remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{REMINDERS_KEY, USER_NAME_KEY};
    use serde_json::json;

    fn initial_state() -> State {
        let mut state = State::new();
        state.insert(USER_NAME_KEY, "Afzal");
        state.insert(REMINDERS_KEY, json!([]));
        state
    }

    #[tokio::test]
    async fn test_memory_session_store() {
        let store = MemorySessionStore::new();

        let session = store
            .create_session("app", "afzal", None, initial_state())
            .await
            .unwrap();
        assert!(uuid::Uuid::parse_str(&session.id).is_ok());

        let mut delta = StateDelta::new();
        delta.set(REMINDERS_KEY, json!(["buy milk"]));
        store.apply_delta(&session.key(), &delta).await.unwrap();

        let reloaded = store.get_session(&session.key()).await.unwrap();
        assert_eq!(reloaded.state.get_items(REMINDERS_KEY), vec!["buy milk"]);
        assert_eq!(reloaded.state.get_str(USER_NAME_KEY), Some("Afzal"));

        let listed = store.list_sessions("app", "afzal").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(store.list_sessions("app", "someone-else").await.unwrap().is_empty());

        assert!(store.delete_session(&session.key()).await.unwrap());
        assert!(!store.delete_session(&session.key()).await.unwrap());
    }

    #[tokio::test]
    async fn test_get_missing_session_is_not_found() {
        let store = MemorySessionStore::new();
        let err = store
            .get_session(&SessionKey::new("app", "user", "nope"))
            .await
            .unwrap_err();
        assert!(matches!(err, RecallError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_session_id_rejected() {
        let store = MemorySessionStore::new();
        store
            .create_session("app", "user", Some("s1"), State::new())
            .await
            .unwrap();
        let err = store
            .create_session("app", "user", Some("s1"), State::new())
            .await
            .unwrap_err();
        assert!(matches!(err, RecallError::SessionExists(_)));
    }

    #[tokio::test]
    async fn test_list_orders_most_recent_first() {
        let store = MemorySessionStore::new();
        let first = store
            .create_session("app", "user", Some("first"), State::new())
            .await
            .unwrap();
        store
            .create_session("app", "user", Some("second"), State::new())
            .await
            .unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        let mut delta = StateDelta::new();
        delta.set("touched", true);
        store.apply_delta(&first.key(), &delta).await.unwrap();

        let listed = store.list_sessions("app", "user").await.unwrap();
        assert_eq!(listed[0].id, "first");
    }
}
