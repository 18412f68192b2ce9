//! Agent instruction templates for Recall.
//!
//! Each agent's prompt can be overridden by placing `<agent>.toml` (with
//! `description` and `instruction` keys) in the custom prompts directory.
//! Instructions may reference session state as `{key}` or `{key?}`.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Description and instruction template for one agent.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AgentPrompt {
    pub description: String,
    pub instruction: String,
}

impl AgentPrompt {
    fn new(description: &str, instruction: &str) -> Self {
        Self {
            description: description.to_string(),
            instruction: instruction.to_string(),
        }
    }
}

/// Collection of all agent prompts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Prompts {
    /// Plain question answering, no tools.
    pub basic: AgentPrompt,
    /// General assistant with the clock tool.
    pub assistant: AgentPrompt,
    /// Answers questions about the user from session state.
    pub profile: AgentPrompt,
    /// Drafts emails as structured output.
    pub email: AgentPrompt,
    /// Reminder manager with persistent state.
    pub reminders: AgentPrompt,
}

impl Default for Prompts {
    fn default() -> Self {
        Self {
            basic: AgentPrompt::new(
                "A helpful assistant for user questions.",
                "Answer user questions to the best of your knowledge.",
            ),

            assistant: AgentPrompt::new(
                "A helpful assistant that can use tools to answer user questions.",
                r#"You are a helpful assistant that can use the following tools to answer user questions.
- get_current_time: Use this tool to get the current time."#,
            ),

            profile: AgentPrompt::new(
                "Question answering agent",
                r#"You are a helpful assistant that answers questions about the user's preferences.
Here is some information about the user:
Name: {user_name}
Preferences: {user_preferences}
Answer the question based on the information provided."#,
            ),

            email: AgentPrompt::new(
                "A helpful assistant that can help with email content creation.",
                r#"You are a helpful assistant that can help with email content creation.
You will be given a task and you need to create email content for the task.
Use the following JSON format for the email content.
For example, if the task is "Write an email to the customer about the product", the email content should be:
{
    "subject": "Product Inquiry",
    "body": "Dear [Customer Name],\n\nI hope this email finds you well. I am writing to inquire about the [product name] you offer. Please let me know if you have any information about this product.\n\nBest regards,\n[Your Name]"
}
Do not include any other text in your response."#,
            ),

            reminders: AgentPrompt::new(
                "A smart reminder agent with persistent storage",
                r#"You are a smart reminder agent with persistent storage.

The user's information is stored in the session state.
- User's name: {user_name}
- Reminders: {reminders}

You can use the following tools to manage the user's reminders:
- add_reminder: Add a reminder to the user's list of reminders
- view_reminders: View the user's list of reminders
- delete_reminder: Delete a reminder from the user's list of reminders
- update_reminder: Update a reminder in the user's list of reminders
- update_user_name: Update the user's name

When deleting or updating, use the exact reminder text from the list.
If a tool reports an error, explain it to the user."#,
            ),
        }
    }
}

impl Prompts {
    /// Load prompts, applying overrides from an optional custom directory.
    pub fn load(custom_dir: Option<&str>) -> crate::error::Result<Self> {
        let mut prompts = Prompts::default();

        if let Some(dir) = custom_dir {
            let custom_path = PathBuf::from(shellexpand::tilde(dir).to_string());

            override_from(&custom_path, "basic", &mut prompts.basic)?;
            override_from(&custom_path, "assistant", &mut prompts.assistant)?;
            override_from(&custom_path, "profile", &mut prompts.profile)?;
            override_from(&custom_path, "email", &mut prompts.email)?;
            override_from(&custom_path, "reminders", &mut prompts.reminders)?;
        }

        Ok(prompts)
    }
}

/// Replace the non-empty fields of `prompt` with those found in `<dir>/<name>.toml`.
fn override_from(dir: &Path, name: &str, prompt: &mut AgentPrompt) -> crate::error::Result<()> {
    let path = dir.join(format!("{}.toml", name));
    if !path.exists() {
        return Ok(());
    }

    let content = std::fs::read_to_string(&path)?;
    let custom: AgentPrompt = toml::from_str(&content)?;

    if !custom.description.is_empty() {
        prompt.description = custom.description;
    }
    if !custom.instruction.is_empty() {
        prompt.instruction = custom.instruction;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_prompts() {
        let prompts = Prompts::default();
        assert!(prompts.reminders.instruction.contains("{user_name}"));
        assert!(prompts.profile.instruction.contains("{user_preferences}"));
        assert!(!prompts.basic.instruction.is_empty());
    }

    #[test]
    fn test_custom_dir_overrides_instruction_only() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("reminders.toml"),
            "instruction = \"Be brief, {user_name}.\"\n",
        )
        .unwrap();

        let prompts = Prompts::load(dir.path().to_str()).unwrap();
        assert_eq!(prompts.reminders.instruction, "Be brief, {user_name}.");
        assert_eq!(
            prompts.reminders.description,
            Prompts::default().reminders.description
        );
        assert_eq!(prompts.email, Prompts::default().email);
    }
}
