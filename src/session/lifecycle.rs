//! Session lifecycle: resolving which session a conversation runs in.

use super::{Session, SessionKey, SessionStore, State};
use crate::error::{RecallError, Result};
use std::sync::Arc;
use tracing::{info, instrument};

/// Creates, looks up and lists sessions for one (app, user) pair.
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    app_name: String,
    user_id: String,
}

impl SessionManager {
    pub fn new(store: Arc<dyn SessionStore>, app_name: &str, user_id: &str) -> Self {
        Self {
            store,
            app_name: app_name.to_string(),
            user_id: user_id.to_string(),
        }
    }

    pub fn store(&self) -> Arc<dyn SessionStore> {
        Arc::clone(&self.store)
    }

    pub fn app_name(&self) -> &str {
        &self.app_name
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn key(&self, session_id: &str) -> SessionKey {
        SessionKey::new(&self.app_name, &self.user_id, session_id)
    }

    /// Reuse the most recently updated session, or create one with `initial_state`.
    ///
    /// Returns the session and whether it was newly created.
    #[instrument(skip(self, initial_state), fields(app = %self.app_name, user = %self.user_id))]
    pub async fn resume_or_create(&self, initial_state: State) -> Result<(Session, bool)> {
        let existing = self.list().await?;

        if let Some(session) = existing.into_iter().next() {
            info!("Resuming session {}", session.id);
            return Ok((session, false));
        }

        let session = self.create(None, initial_state).await?;
        Ok((session, true))
    }

    /// Look up a session by id, creating a fresh one if it does not exist.
    pub async fn get_or_create(&self, session_id: &str, initial_state: State) -> Result<Session> {
        match self.store.get_session(&self.key(session_id)).await {
            Ok(session) => Ok(session),
            Err(RecallError::SessionNotFound { .. }) => {
                info!("Session {} not found, creating it", session_id);
                self.create(Some(session_id), initial_state).await
            }
            Err(e) => Err(e),
        }
    }

    pub async fn create(&self, session_id: Option<&str>, initial_state: State) -> Result<Session> {
        let session = self
            .store
            .create_session(&self.app_name, &self.user_id, session_id, initial_state)
            .await?;
        info!("New session created: {}", session.id);
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Result<Session> {
        self.store.get_session(&self.key(session_id)).await
    }

    pub async fn list(&self) -> Result<Vec<Session>> {
        self.store.list_sessions(&self.app_name, &self.user_id).await
    }

    pub async fn delete(&self, session_id: &str) -> Result<bool> {
        self.store.delete_session(&self.key(session_id)).await
    }
}
