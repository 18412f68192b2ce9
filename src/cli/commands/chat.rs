//! Interactive reminder assistant with durable session state.

use super::{connect_model, open_store};
use crate::agent::{catalog, Runner};
use crate::cli::Output;
use crate::config::{Prompts, Settings};
use crate::session::{SessionKey, SessionManager, SessionStore, State};
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};
use tracing::{error, info};

const EXIT_WORDS: &[&str] = &["exit", "quit", "bye"];

/// Run the interactive chat command.
pub async fn run_chat(
    model: Option<String>,
    session_id: Option<String>,
    settings: Settings,
) -> Result<()> {
    let chat_model = connect_model(&settings)?;
    let store = open_store(&settings)?;
    let manager = SessionManager::new(
        store.clone(),
        &settings.session.app_name,
        &settings.session.user_id,
    );

    let initial_state = State::from(settings.session.initial_state.clone());
    let session = match session_id.as_deref() {
        Some(id) => manager.get_or_create(id, initial_state).await?,
        None => {
            let (session, created) = manager.resume_or_create(initial_state).await?;
            if created {
                Output::info(&format!("Created new session: {}", session.id));
            } else {
                Output::info(&format!("Continuing existing session: {}", session.id));
            }
            session
        }
    };
    let key = session.key();

    let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;
    let model = model.unwrap_or_else(|| settings.model.name.clone());
    let agent = catalog::reminder_agent(&prompts, &model);

    let mut runner = Runner::new(agent, chat_model, store.clone())
        .with_max_iterations(settings.model.max_iterations)
        .with_max_history(settings.model.max_history);

    println!("\n{}", style("Recall Assistant").bold().cyan());
    println!("{}\n", style("Type your message, or 'exit' to quit.").dim());

    let stdin = io::stdin();
    let turns = chat_loop(
        stdin.lock(),
        &mut runner,
        store.as_ref(),
        &key,
        settings.session.show_state,
    )
    .await?;

    info!("Chat ended for session {} after {} turns", key.session_id, turns);
    println!();
    Output::success("Ending the conversation... Your data has been saved.");
    Ok(())
}

/// Read lines from `input` until an exit word or EOF, running every other
/// non-empty line as a turn. Returns the number of turns run.
async fn chat_loop<R: BufRead>(
    mut input: R,
    runner: &mut Runner,
    store: &dyn SessionStore,
    key: &SessionKey,
    show_state: bool,
) -> Result<usize> {
    let mut stdout = io::stdout();
    let mut turns = 0;

    loop {
        if show_state {
            match store.get_session(key).await {
                Ok(current) => Output::state(&current.state),
                Err(e) => {
                    error!("Failed to read session {}: {}", key.session_id, e);
                    Output::warning(&format!("Could not load session state: {}", e));
                }
            }
        }

        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let line = line.trim();

        if line.is_empty() {
            continue;
        }

        if is_exit(line) {
            break;
        }

        turns += 1;
        match runner.send(key, line).await {
            Some(report) => {
                for record in &report.tool_calls {
                    Output::tool_call(record);
                }
                Output::agent_response(&report.output);
            }
            None => {
                Output::warning("No response this turn. Your saved reminders are unaffected.");
            }
        }
    }

    Ok(turns)
}

fn is_exit(input: &str) -> bool {
    EXIT_WORDS.iter().any(|word| input.eq_ignore_ascii_case(word))
}
