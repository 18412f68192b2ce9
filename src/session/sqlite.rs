//! SQLite-based session store implementation.
//!
//! One row per (app_name, user_id, session_id); the state mapping is stored
//! as serialized JSON so nested values keep their types across restarts.

use super::{resolve_session_id, Session, SessionKey, SessionStore, State, StateDelta};
use crate::error::{RecallError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info, instrument};

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS sessions (
        app_name TEXT NOT NULL,
        user_id TEXT NOT NULL,
        id TEXT NOT NULL,
        state_json TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL,
        PRIMARY KEY (app_name, user_id, id)
    );

    CREATE INDEX IF NOT EXISTS idx_sessions_updated_at
        ON sessions(app_name, user_id, updated_at);
"#;

/// SQLite-based session store.
pub struct SqliteSessionStore {
    conn: Mutex<Connection>,
}

impl SqliteSessionStore {
    /// Open (or create) a session database at `path`.
    #[instrument(skip_all)]
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;

        // Enable WAL mode for better concurrent performance
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        conn.execute_batch(SCHEMA)?;

        info!("Initialized SQLite session store at {:?}", path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Create an in-memory SQLite session store (useful for testing).
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RecallError::SessionStore(format!("Failed to acquire lock: {}", e)))
    }
}

fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_timestamp(s: &str, session_id: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            RecallError::SessionStore(format!(
                "Corrupt timestamp '{}' for session {}: {}",
                s, session_id, e
            ))
        })
}

/// Raw row before the state JSON is decoded.
struct SessionRow {
    app_name: String,
    user_id: String,
    id: String,
    state_json: String,
    created_at: String,
    updated_at: String,
}

impl SessionRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            app_name: row.get(0)?,
            user_id: row.get(1)?,
            id: row.get(2)?,
            state_json: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn into_session(self) -> Result<Session> {
        let state: State = serde_json::from_str(&self.state_json).map_err(|e| {
            RecallError::SessionStore(format!("Corrupt state for session {}: {}", self.id, e))
        })?;

        let created_at = parse_timestamp(&self.created_at, &self.id)?;
        let updated_at = parse_timestamp(&self.updated_at, &self.id)?;

        Ok(Session {
            app_name: self.app_name,
            user_id: self.user_id,
            id: self.id,
            state,
            created_at,
            updated_at,
        })
    }
}

fn not_found(key: &SessionKey) -> RecallError {
    RecallError::SessionNotFound {
        app_name: key.app_name.clone(),
        user_id: key.user_id.clone(),
        session_id: key.session_id.clone(),
    }
}

fn select_session(conn: &Connection, key: &SessionKey) -> Result<Option<SessionRow>> {
    let row = conn
        .query_row(
            r#"
            SELECT app_name, user_id, id, state_json, created_at, updated_at
            FROM sessions
            WHERE app_name = ?1 AND user_id = ?2 AND id = ?3
            "#,
            params![key.app_name, key.user_id, key.session_id],
            SessionRow::from_row,
        )
        .optional()?;
    Ok(row)
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    #[instrument(skip(self, state))]
    async fn create_session(
        &self,
        app_name: &str,
        user_id: &str,
        session_id: Option<&str>,
        state: State,
    ) -> Result<Session> {
        let id = resolve_session_id(session_id);
        let session = Session::new(app_name, user_id, &id, state);
        let state_json = serde_json::to_string(&session.state)?;

        let conn = self.lock()?;
        let inserted = conn.execute(
            r#"
            INSERT OR IGNORE INTO sessions
            (app_name, user_id, id, state_json, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                session.app_name,
                session.user_id,
                session.id,
                state_json,
                format_timestamp(&session.created_at),
                format_timestamp(&session.updated_at),
            ],
        )?;

        if inserted == 0 {
            return Err(RecallError::SessionExists(id));
        }

        info!("Created session {}", session.id);
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn get_session(&self, key: &SessionKey) -> Result<Session> {
        let conn = self.lock()?;
        select_session(&conn, key)?
            .ok_or_else(|| not_found(key))?
            .into_session()
    }

    #[instrument(skip(self))]
    async fn list_sessions(&self, app_name: &str, user_id: &str) -> Result<Vec<Session>> {
        let conn = self.lock()?;

        let mut stmt = conn.prepare(
            r#"
            SELECT app_name, user_id, id, state_json, created_at, updated_at
            FROM sessions
            WHERE app_name = ?1 AND user_id = ?2
            ORDER BY updated_at DESC, created_at DESC
            "#,
        )?;

        let rows = stmt
            .query_map(params![app_name, user_id], SessionRow::from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        let sessions = rows
            .into_iter()
            .map(SessionRow::into_session)
            .collect::<Result<Vec<_>>>()?;

        debug!("Found {} sessions for {}/{}", sessions.len(), app_name, user_id);
        Ok(sessions)
    }

    #[instrument(skip(self, delta))]
    async fn apply_delta(&self, key: &SessionKey, delta: &StateDelta) -> Result<Session> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;

        let mut session = select_session(&tx, key)?
            .ok_or_else(|| not_found(key))?
            .into_session()?;

        session.state.apply(delta);
        session.updated_at = Utc::now();

        tx.execute(
            r#"
            UPDATE sessions
            SET state_json = ?4, updated_at = ?5
            WHERE app_name = ?1 AND user_id = ?2 AND id = ?3
            "#,
            params![
                key.app_name,
                key.user_id,
                key.session_id,
                serde_json::to_string(&session.state)?,
                format_timestamp(&session.updated_at),
            ],
        )?;

        tx.commit()?;
        debug!("Committed delta {:?} to session {}", delta.keys(), key.session_id);
        Ok(session)
    }

    #[instrument(skip(self))]
    async fn delete_session(&self, key: &SessionKey) -> Result<bool> {
        let conn = self.lock()?;
        let deleted = conn.execute(
            "DELETE FROM sessions WHERE app_name = ?1 AND user_id = ?2 AND id = ?3",
            params![key.app_name, key.user_id, key.session_id],
        )?;

        info!("Deleted session {}", key.session_id);
        Ok(deleted > 0)
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
    async fn test_sqlite_session_store() {
        let store = SqliteSessionStore::in_memory().unwrap();

        let session = store
            .create_session("app", "afzal", None, initial_state())
            .await
            .unwrap();

        let mut delta = StateDelta::new();
        delta.set(REMINDERS_KEY, json!(["buy milk", {"nested": [1, 2]}]));
        let updated = store.apply_delta(&session.key(), &delta).await.unwrap();
        assert!(updated.updated_at >= session.updated_at);

        let reloaded = store.get_session(&session.key()).await.unwrap();
        assert_eq!(
            reloaded.state.get(REMINDERS_KEY),
            Some(&json!(["buy milk", {"nested": [1, 2]}]))
        );

        let listed = store.list_sessions("app", "afzal").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, session.id);

        assert!(store.delete_session(&session.key()).await.unwrap());
        let err = store.get_session(&session.key()).await.unwrap_err();
        assert!(matches!(err, RecallError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_apply_delta_to_missing_session_fails() {
        let store = SqliteSessionStore::in_memory().unwrap();
        let mut delta = StateDelta::new();
        delta.set("k", "v");
        let err = store
            .apply_delta(&SessionKey::new("app", "user", "ghost"), &delta)
            .await
            .unwrap_err();
        assert!(matches!(err, RecallError::SessionNotFound { .. }));
    }

    #[tokio::test]
    async fn test_duplicate_session_id_rejected() {
        let store = SqliteSessionStore::in_memory().unwrap();
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
    async fn test_corrupt_timestamp_is_an_error() {
        let store = SqliteSessionStore::in_memory().unwrap();
        let session = store
            .create_session("app", "afzal", Some("s1"), initial_state())
            .await
            .unwrap();

        store
            .lock()
            .unwrap()
            .execute("UPDATE sessions SET updated_at = 'not a date' WHERE id = 's1'", [])
            .unwrap();

        let err = store.get_session(&session.key()).await.unwrap_err();
        assert!(matches!(err, RecallError::SessionStore(msg) if msg.contains("s1")));

        let err = store.list_sessions("app", "afzal").await.unwrap_err();
        assert!(matches!(err, RecallError::SessionStore(_)));
    }

    #[tokio::test]
    async fn test_state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sessions.db");

        let key = {
            let store = SqliteSessionStore::new(&path).unwrap();
            let session = store
                .create_session("app", "afzal", None, initial_state())
                .await
                .unwrap();
            let mut delta = StateDelta::new();
            delta.set(USER_NAME_KEY, "Bob");
            store.apply_delta(&session.key(), &delta).await.unwrap();
            session.key()
        };

        let reopened = SqliteSessionStore::new(&path).unwrap();
        let session = reopened.get_session(&key).await.unwrap();
        assert_eq!(session.state.get_str(USER_NAME_KEY), Some("Bob"));
        assert_eq!(session.state.get(REMINDERS_KEY), Some(&json!([])));
    }
}
