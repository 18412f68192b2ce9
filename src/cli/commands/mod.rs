//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod email;
mod profile;
mod sessions;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use email::run_email;
pub use profile::run_profile;
pub use sessions::run_sessions;

use crate::agent::{Agent, ChatModel, OpenAiChatModel, Runner, TurnReport};
use crate::cli::preflight;
use crate::cli::Output;
use crate::config::{Settings, StoreProvider};
use crate::error::Result;
use crate::openai::create_client;
use crate::session::{MemorySessionStore, SessionStore, SqliteSessionStore, State};
use std::sync::Arc;
use tracing::debug;

/// Open the session store selected in the configuration.
pub(crate) fn open_store(settings: &Settings) -> Result<Arc<dyn SessionStore>> {
    match settings.session.store {
        StoreProvider::Sqlite => {
            let path = settings.sqlite_path();
            debug!("Opening {} session store at {:?}", settings.session.store, path);
            Ok(Arc::new(SqliteSessionStore::new(&path)?))
        }
        StoreProvider::Memory => {
            debug!("Opening {} session store", settings.session.store);
            Ok(Arc::new(MemorySessionStore::new()))
        }
    }
}

/// Check the API key and build the chat model.
pub(crate) fn connect_model(settings: &Settings) -> Result<Arc<dyn ChatModel>> {
    if let Err(e) = preflight::check_model_access() {
        Output::error(&format!("{}", e));
        return Err(e);
    }
    let client = create_client(&settings.model)?;
    Ok(Arc::new(OpenAiChatModel::new(client)))
}

/// Run a single turn in a fresh in-memory session seeded with `state`.
pub(crate) async fn run_single_turn(
    agent: Agent,
    model: Arc<dyn ChatModel>,
    settings: &Settings,
    state: State,
    message: &str,
) -> Result<TurnReport> {
    let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
    let session = store
        .create_session(
            &settings.session.app_name,
            &settings.session.user_id,
            None,
            state,
        )
        .await?;

    let mut runner = Runner::new(agent, model, store)
        .with_max_iterations(settings.model.max_iterations)
        .with_max_history(settings.model.max_history);

    let spinner = Output::spinner("Thinking...");
    let result = runner.run_turn(&session.key(), message).await;
    spinner.finish_and_clear();
    result
}
