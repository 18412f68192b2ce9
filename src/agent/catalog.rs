//! The built-in agents.

use super::definition::Agent;
use super::output::{FieldType, OutputSchema};
use super::tools::{ToolKind, REMINDER_TOOLS};
use crate::config::Prompts;

/// State key the email assistant stores its draft under.
pub const EMAIL_OUTPUT_KEY: &str = "email";

/// Instruction-only agent.
pub fn basic_agent(prompts: &Prompts, model: &str) -> Agent {
    Agent::new("root_agent", model, prompts.basic.instruction.as_str())
        .with_description(&prompts.basic.description)
}

/// Assistant with access to the clock.
pub fn assistant_agent(prompts: &Prompts, model: &str) -> Agent {
    Agent::new("tool_agent", model, prompts.assistant.instruction.as_str())
        .with_description(&prompts.assistant.description)
        .with_tools(&[ToolKind::GetCurrentTime])
}

/// Answers questions about the user from `user_name` and `user_preferences`.
pub fn profile_agent(prompts: &Prompts, model: &str) -> Agent {
    Agent::new(
        "question_answering_agent",
        model,
        prompts.profile.instruction.as_str(),
    )
    .with_description(&prompts.profile.description)
}

/// Schema of the email assistant's response.
pub fn email_schema() -> OutputSchema {
    OutputSchema::new("email_content")
        .with_description("Email subject and body")
        .field(
            "subject",
            FieldType::String,
            "The subject line of the email. Should be short and concise.",
        )
        .field(
            "body",
            FieldType::String,
            "The body of the email. Should be short, concise and well formatted.",
        )
}

/// Drafts emails as `{subject, body}` JSON.
pub fn email_agent(prompts: &Prompts, model: &str) -> Agent {
    Agent::new("email_assistant", model, prompts.email.instruction.as_str())
        .with_description(&prompts.email.description)
        .with_output_schema(email_schema())
        .with_output_key(EMAIL_OUTPUT_KEY)
}

/// Manages reminders and the user's name in session state.
pub fn reminder_agent(prompts: &Prompts, model: &str) -> Agent {
    Agent::new("memory_agent", model, prompts.reminders.instruction.as_str())
        .with_description(&prompts.reminders.description)
        .with_tools(REMINDER_TOOLS)
}
