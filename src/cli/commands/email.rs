//! Email drafting with structured output.

use super::{connect_model, run_single_turn};
use crate::agent::{catalog, AgentOutput};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::session::State;
use anyhow::Result;

/// Run the email command, printing the validated `{subject, body}` JSON.
pub async fn run_email(task: &str, model: Option<String>, settings: Settings) -> Result<()> {
    let chat_model = connect_model(&settings)?;
    let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
    let model = model.unwrap_or_else(|| settings.model.name.clone());
    let agent = catalog::email_agent(&prompts, &model);

    let report = match run_single_turn(agent, chat_model, &settings, State::new(), task).await {
        Ok(report) => report,
        Err(e) => {
            Output::error(&format!("Failed to draft email: {}", e));
            return Err(e.into());
        }
    };

    match &report.output {
        AgentOutput::Structured(value) => println!("{}", serde_json::to_string_pretty(value)?),
        AgentOutput::Text(text) => println!("{}", text),
    }

    Ok(())
}
