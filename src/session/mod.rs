//! Session state storage for Recall.
//!
//! A session is scoped by (application, user, session id) and owns a mutable
//! JSON state mapping. Backends implement [`SessionStore`]; the volatile
//! [`MemorySessionStore`] and the durable [`SqliteSessionStore`] share the
//! same semantics.

mod lifecycle;
mod memory;
mod sqlite;

pub use lifecycle::SessionManager;
pub use memory::MemorySessionStore;
pub use sqlite::SqliteSessionStore;

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// State key holding the reminder list.
pub const REMINDERS_KEY: &str = "reminders";

/// State key holding the user's display name.
pub const USER_NAME_KEY: &str = "user_name";

/// Identifies one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionKey {
    pub app_name: String,
    pub user_id: String,
    pub session_id: String,
}

impl SessionKey {
    pub fn new(app_name: &str, user_id: &str, session_id: &str) -> Self {
        Self {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            session_id: session_id.to_string(),
        }
    }
}

impl fmt::Display for SessionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.app_name, self.user_id, self.session_id)
    }
}

/// Session state: an ordered mapping from string keys to JSON values.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct State(Map<String, Value>);

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Get a value as a string slice, if it is one.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// Entries of the array stored under `key`, whatever their type.
    ///
    /// A missing key or a non-array value reads as an empty list.
    pub fn get_items(&self, key: &str) -> Vec<Value> {
        self.0
            .get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Merge a delta: each key in the delta replaces the stored value.
    pub fn apply(&mut self, delta: &StateDelta) {
        for (key, value) in delta.iter() {
            self.0.insert(key.clone(), value.clone());
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for State {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// Pending state mutations produced within one turn.
///
/// Values are full replacements, so merging the same delta twice yields the
/// same state as merging it once.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StateDelta(Map<String, Value>);

impl StateDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

/// A stored session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub app_name: String,
    pub user_id: String,
    pub id: String,
    pub state: State,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new session stamped with the current time.
    pub fn new(app_name: &str, user_id: &str, id: &str, state: State) -> Self {
        let now = Utc::now();
        Self {
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
            id: id.to_string(),
            state,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn key(&self) -> SessionKey {
        SessionKey::new(&self.app_name, &self.user_id, &self.id)
    }
}

/// Trait for session store implementations.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Create a session. A fresh identifier is generated when `session_id` is `None`.
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
        state: State,
    ) -> Result<Session>;

    /// Look up a session, failing with `SessionNotFound` if absent.
    async fn get_session(&self, key: &SessionKey) -> Result<Session>;

    /// List sessions for (app, user), most recently updated first.
    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>>;

    /// Merge a delta into a session's state and return the updated session.
    async fn apply_delta(&self, key: &SessionKey, delta: &StateDelta) -> Result<Session>;

    /// Delete a session. Returns whether it existed.
    async fn delete_session(&self, key: &SessionKey) -> Result<bool>;
}

/// Resolve the session id for a new session.
pub(crate) fn resolve_session_id(session_id: Option<&str>) -> String {
    match session_id {
        Some(id) if !id.trim().is_empty() => id.trim().to_string(),
        _ => uuid::Uuid::new_v4().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn state(value: Value) -> State {
        match value {
            Value::Object(map) => State::from(map),
            _ => panic!("Expected object"),
        }
    }

    #[test]
    fn test_apply_delta_replaces_keys() {
        let mut s = state(json!({"user_name": "Afzal", "reminders": []}));
        let mut delta = StateDelta::new();
        delta.set(USER_NAME_KEY, "Bob");

        s.apply(&delta);

        assert_eq!(s.get_str(USER_NAME_KEY), Some("Bob"));
        assert!(s.get_items(REMINDERS_KEY).is_empty());
    }

    #[test]
    fn test_apply_delta_twice_is_idempotent() {
        let mut s = state(json!({"reminders": ["buy milk"]}));
        let mut delta = StateDelta::new();
        delta.set(REMINDERS_KEY, json!(["buy milk", "call mom"]));

        s.apply(&delta);
        let once = s.clone();
        s.apply(&delta);

        assert_eq!(s, once);
        assert_eq!(s.get_items(REMINDERS_KEY), vec!["buy milk", "call mom"]);
    }

    #[test]
    fn test_get_items_missing_key_is_empty() {
        let s = State::new();
        assert!(s.get_items(REMINDERS_KEY).is_empty());
    }

    #[test]
    fn test_resolve_session_id() {
        assert_eq!(resolve_session_id(Some("abc")), "abc");
        let generated = resolve_session_id(None);
        assert!(uuid::Uuid::parse_str(&generated).is_ok());
        assert_ne!(resolve_session_id(Some("  ")), "");
    }

    #[test]
    fn test_session_key_display() {
        let key = SessionKey::new("app", "user", "s1");
        assert_eq!(key.to_string(), "app/user/s1");
    }
}
