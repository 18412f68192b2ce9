//! Question answering over a seeded in-memory session.

use super::{connect_model, run_single_turn};
use crate::agent::catalog;
use crate::cli::Output;
use crate::config::{ProfileSettings, Prompts, Settings};
use crate::session::{State, USER_NAME_KEY};
use anyhow::Result;

const USER_PREFERENCES_KEY: &str = "user_preferences";

/// Run the profile command and print the final session state.
pub async fn run_profile(question: &str, model: Option<String>, settings: Settings) -> Result<()> {
    let chat_model = connect_model(&settings)?;
    let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
    let model = model.unwrap_or_else(|| settings.model.name.clone());
    let agent = catalog::profile_agent(&prompts, &model);

    let state = profile_state(&settings.profile);
    let report = run_single_turn(agent, chat_model, &settings, state, question).await?;

    Output::agent_response(&report.output);

    Output::header("Final Session State");
    for (key, value) in report.state.iter() {
        Output::kv(key, &value.to_string());
    }

    Ok(())
}

fn profile_state(profile: &ProfileSettings) -> State {
    let mut state = State::new();
    state.insert(USER_NAME_KEY, profile.user_name.as_str());
    state.insert(USER_PREFERENCES_KEY, profile.user_preferences.as_str());
    state
}
