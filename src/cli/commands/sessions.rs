//! Session inspection commands.

use super::open_store;
use crate::cli::{Output, SessionsAction};
use crate::config::Settings;
use crate::session::SessionManager;
use anyhow::Result;

/// Run a sessions subcommand against the configured store.
pub async fn run_sessions(action: &SessionsAction, settings: Settings) -> Result<()> {
    let store = open_store(&settings)?;
    let manager = SessionManager::new(store, &settings.session.app_name, &settings.session.user_id);

    match action {
        SessionsAction::List => {
            let sessions = manager.list().await?;
            if sessions.is_empty() {
                Output::info("No sessions yet. Start one with 'recall chat'.");
                return Ok(());
            }

            Output::header(&format!(
                "Sessions for {} / {}",
                manager.app_name(),
                manager.user_id()
            ));
            for session in &sessions {
                Output::session_info(session);
            }
        }

        SessionsAction::Show { session_id } => {
            let session = match session_id {
                Some(id) => manager.get(id).await?,
                None => match manager.list().await?.into_iter().next() {
                    Some(session) => session,
                    None => {
                        Output::info("No sessions yet.");
                        return Ok(());
                    }
                },
            };

            Output::header(&format!("Session {}", session.id));
            Output::kv("App", &session.app_name);
            Output::kv("User", &session.user_id);
            Output::kv("Created", &session.created_at.to_rfc3339());
            Output::kv("Updated", &session.updated_at.to_rfc3339());
            Output::state(&session.state);
        }

        SessionsAction::Delete { session_id } => {
            if manager.delete(session_id).await? {
                Output::success(&format!("Deleted session {}", session_id));
            } else {
                Output::warning(&format!("Session {} not found", session_id));
            }
        }
    }

    Ok(())
}
