//! Ask command implementation.

use super::{connect_model, run_single_turn};
use crate::agent::catalog;
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::session::State;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    no_tools: bool,
    model: Option<String>,
    settings: Settings,
) -> Result<()> {
    let chat_model = connect_model(&settings)?;
    let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
    let model = model.unwrap_or_else(|| settings.model.name.clone());

    let agent = if no_tools {
        catalog::basic_agent(&prompts, &model)
    } else {
        catalog::assistant_agent(&prompts, &model)
    };

    match run_single_turn(agent, chat_model, &settings, State::new(), question).await {
        Ok(report) => {
            for record in &report.tool_calls {
                Output::tool_call(record);
            }
            println!("\n{}\n", report.output);
        }
        Err(e) => {
            Output::error(&format!("Failed to generate answer: {}", e));
            return Err(e.into());
        }
    }

    Ok(())
}
