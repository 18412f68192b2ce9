//! Tool definitions and implementations for the agent system.
//!
//! Tools read the session state through a [`ToolContext`] and record their
//! writes in the context's pending [`StateDelta`]. The runner commits that
//! delta only when the tool succeeds.

use crate::session::{State, StateDelta, REMINDERS_KEY, USER_NAME_KEY};
use async_openai::types::{ChatCompletionTool, ChatCompletionToolType, FunctionObject};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{info, warn};

/// Every tool the agent system knows about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolKind {
    AddReminder,
    ViewReminders,
    DeleteReminder,
    UpdateReminder,
    UpdateUserName,
    GetCurrentTime,
}

/// The tools that manage the reminder list and user name.
pub const REMINDER_TOOLS: &[ToolKind] = &[
    ToolKind::AddReminder,
    ToolKind::ViewReminders,
    ToolKind::DeleteReminder,
    ToolKind::UpdateReminder,
    ToolKind::UpdateUserName,
];

impl ToolKind {
    pub const ALL: [ToolKind; 6] = [
        ToolKind::AddReminder,
        ToolKind::ViewReminders,
        ToolKind::DeleteReminder,
        ToolKind::UpdateReminder,
        ToolKind::UpdateUserName,
        ToolKind::GetCurrentTime,
    ];

    pub fn name(self) -> &'static str {
        match self {
            ToolKind::AddReminder => "add_reminder",
            ToolKind::ViewReminders => "view_reminders",
            ToolKind::DeleteReminder => "delete_reminder",
            ToolKind::UpdateReminder => "update_reminder",
            ToolKind::UpdateUserName => "update_user_name",
            ToolKind::GetCurrentTime => "get_current_time",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }

    /// OpenAI function definition read by the model to select and call the tool.
    pub fn definition(self) -> ChatCompletionTool {
        let (description, parameters) = match self {
            ToolKind::AddReminder => (
                "Add a reminder to the user's list of reminders.",
                json!({
                    "type": "object",
                    "properties": {
                        "reminder": {
                            "type": "string",
                            "description": "The reminder text to add"
                        }
                    },
                    "required": ["reminder"]
                }),
            ),
            ToolKind::ViewReminders => (
                "View the user's list of reminders.",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
            ToolKind::DeleteReminder => (
                "Delete a reminder from the user's list of reminders. \
                The reminder text must match an existing reminder exactly.",
                json!({
                    "type": "object",
                    "properties": {
                        "reminder": {
                            "type": "string",
                            "description": "The exact text of the reminder to delete"
                        }
                    },
                    "required": ["reminder"]
                }),
            ),
            ToolKind::UpdateReminder => (
                "Update a reminder in the user's list of reminders. \
                Replaces the first reminder whose text matches exactly.",
                json!({
                    "type": "object",
                    "properties": {
                        "reminder": {
                            "type": "string",
                            "description": "The exact text of the reminder to change"
                        },
                        "new_reminder": {
                            "type": "string",
                            "description": "The replacement reminder text"
                        }
                    },
                    "required": ["reminder", "new_reminder"]
                }),
            ),
            ToolKind::UpdateUserName => (
                "Update the user's name.",
                json!({
                    "type": "object",
                    "properties": {
                        "user_name": {
                            "type": "string",
                            "description": "The new name for the user"
                        }
                    },
                    "required": ["user_name"]
                }),
            ),
            ToolKind::GetCurrentTime => (
                "Get the current local date and time.",
                json!({
                    "type": "object",
                    "properties": {}
                }),
            ),
        };

        ChatCompletionTool {
            r#type: ChatCompletionToolType::Function,
            function: FunctionObject {
                name: self.name().to_string(),
                description: Some(description.to_string()),
                parameters: Some(parameters),
                strict: None,
            },
        }
    }
}

/// Get OpenAI function/tool definitions for a set of tools.
pub fn tool_definitions(tools: &[ToolKind]) -> Vec<ChatCompletionTool> {
    tools.iter().map(|kind| kind.definition()).collect()
}

/// A parsed tool invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ToolCall {
    AddReminder { reminder: String },
    ViewReminders,
    DeleteReminder { reminder: String },
    UpdateReminder { reminder: String, new_reminder: String },
    UpdateUserName { user_name: String },
    GetCurrentTime,
}

/// Tool precondition failures, reported back to the model.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ToolError {
    #[error("Reminder '{0}' not found")]
    ReminderNotFound(String),

    #[error("Invalid arguments for '{tool}': {reason}")]
    InvalidArguments { tool: String, reason: String },

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Tool '{0}' is not available to this agent")]
    NotPermitted(String),
}

impl ToolError {
    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            ToolError::ReminderNotFound(_) => "not_found",
            ToolError::InvalidArguments { .. } => "invalid_arguments",
            ToolError::UnknownTool(_) => "unknown_tool",
            ToolError::NotPermitted(_) => "not_permitted",
        }
    }
}

/// Successful tool result payload.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolSuccess {
    pub action: String,
    pub data: Map<String, Value>,
    pub message: String,
}

impl ToolSuccess {
    fn new(action: ToolKind, message: String) -> Self {
        Self {
            action: action.name().to_string(),
            data: Map::new(),
            message,
        }
    }

    fn with(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.data.insert(key.to_string(), value.into());
        self
    }
}

/// Result of a single tool invocation.
#[derive(Debug, Clone, PartialEq)]
pub enum ToolOutcome {
    Success(ToolSuccess),
    Failure { action: String, error: ToolError },
}

impl ToolOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ToolOutcome::Success(_))
    }

    pub fn action(&self) -> &str {
        match self {
            ToolOutcome::Success(s) => &s.action,
            ToolOutcome::Failure { action, .. } => action,
        }
    }

    /// JSON form fed back to the model.
    pub fn to_json(&self) -> Value {
        match self {
            ToolOutcome::Success(success) => {
                let mut obj = Map::new();
                obj.insert("status".to_string(), json!("success"));
                obj.insert("action".to_string(), json!(success.action));
                for (key, value) in &success.data {
                    obj.insert(key.clone(), value.clone());
                }
                obj.insert("message".to_string(), json!(success.message));
                Value::Object(obj)
            }
            ToolOutcome::Failure { action, error } => json!({
                "status": "error",
                "action": action,
                "error": error.code(),
                "message": error.to_string(),
            }),
        }
    }
}

/// Tool execution context: a read view of the session state plus pending writes.
pub struct ToolContext<'a> {
    state: &'a State,
    delta: StateDelta,
}

impl<'a> ToolContext<'a> {
    pub fn new(state: &'a State) -> Self {
        Self {
            state,
            delta: StateDelta::new(),
        }
    }

    /// Read a value, seeing this invocation's own pending writes first.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.delta.get(key).or_else(|| self.state.get(key))
    }

    /// Raw entries of the array under `key`, of any type. Missing reads as empty.
    pub fn get_items(&self, key: &str) -> Vec<Value> {
        self.get(key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    }

    /// Record a write. It becomes visible to the session only when committed.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        self.delta.set(key, value);
    }

    pub fn into_delta(self) -> StateDelta {
        self.delta
    }
}

impl ToolCall {
    pub fn kind(&self) -> ToolKind {
        match self {
            ToolCall::AddReminder { .. } => ToolKind::AddReminder,
            ToolCall::ViewReminders => ToolKind::ViewReminders,
            ToolCall::DeleteReminder { .. } => ToolKind::DeleteReminder,
            ToolCall::UpdateReminder { .. } => ToolKind::UpdateReminder,
            ToolCall::UpdateUserName { .. } => ToolKind::UpdateUserName,
            ToolCall::GetCurrentTime => ToolKind::GetCurrentTime,
        }
    }

    /// Execute the tool against the context.
    pub fn execute(&self, ctx: &mut ToolContext<'_>) -> Result<ToolSuccess, ToolError> {
        match self {
            ToolCall::AddReminder { reminder } => Ok(add_reminder(ctx, reminder)),
            ToolCall::ViewReminders => Ok(view_reminders(ctx)),
            ToolCall::DeleteReminder { reminder } => delete_reminder(ctx, reminder),
            ToolCall::UpdateReminder {
                reminder,
                new_reminder,
            } => update_reminder(ctx, reminder, new_reminder),
            ToolCall::UpdateUserName { user_name } => Ok(update_user_name(ctx, user_name)),
            ToolCall::GetCurrentTime => Ok(get_current_time()),
        }
    }
}

fn add_reminder(ctx: &mut ToolContext<'_>, reminder: &str) -> ToolSuccess {
    let mut reminders = ctx.get_items(REMINDERS_KEY);
    reminders.push(Value::String(reminder.to_string()));
    ctx.set(REMINDERS_KEY, reminders);

    ToolSuccess::new(
        ToolKind::AddReminder,
        format!("Reminder '{}' added successfully", reminder),
    )
    .with("reminder", reminder)
}

fn view_reminders(ctx: &ToolContext<'_>) -> ToolSuccess {
    let reminders = ctx.get_items(REMINDERS_KEY);
    let message = if reminders.is_empty() {
        "No reminders yet.".to_string()
    } else {
        let shown: Vec<String> = reminders
            .iter()
            .map(|r| match r {
                Value::String(text) => text.clone(),
                other => other.to_string(),
            })
            .collect();
        format!("Reminders: {}", shown.join("; "))
    };

    ToolSuccess::new(ToolKind::ViewReminders, message).with(REMINDERS_KEY, reminders)
}

fn delete_reminder(ctx: &mut ToolContext<'_>, reminder: &str) -> Result<ToolSuccess, ToolError> {
    let mut reminders = ctx.get_items(REMINDERS_KEY);
    let index = reminders
        .iter()
        .position(|r| r.as_str() == Some(reminder))
        .ok_or_else(|| ToolError::ReminderNotFound(reminder.to_string()))?;

    reminders.remove(index);
    ctx.set(REMINDERS_KEY, reminders);

    Ok(ToolSuccess::new(
        ToolKind::DeleteReminder,
        format!("Reminder '{}' deleted successfully", reminder),
    )
    .with("reminder", reminder))
}

/// Replaces the first entry equal to `reminder`.
fn update_reminder(
    ctx: &mut ToolContext<'_>,
    reminder: &str,
    new_reminder: &str,
) -> Result<ToolSuccess, ToolError> {
    let mut reminders = ctx.get_items(REMINDERS_KEY);
    let slot = reminders
        .iter_mut()
        .find(|r| r.as_str() == Some(reminder))
        .ok_or_else(|| ToolError::ReminderNotFound(reminder.to_string()))?;

    *slot = Value::String(new_reminder.to_string());
    ctx.set(REMINDERS_KEY, reminders);

    Ok(ToolSuccess::new(
        ToolKind::UpdateReminder,
        format!(
            "Reminder '{}' updated to '{}' successfully",
            reminder, new_reminder
        ),
    )
    .with("reminder", reminder)
    .with("new_reminder", new_reminder))
}

fn update_user_name(ctx: &mut ToolContext<'_>, user_name: &str) -> ToolSuccess {
    ctx.set(USER_NAME_KEY, user_name);

    ToolSuccess::new(
        ToolKind::UpdateUserName,
        format!("User name updated to '{}' successfully", user_name),
    )
    .with(USER_NAME_KEY, user_name)
}

fn get_current_time() -> ToolSuccess {
    let now = chrono::Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    ToolSuccess::new(ToolKind::GetCurrentTime, format!("The current time is {}", now))
        .with("current_time", now)
}

/// Parse a tool call from the OpenAI response format.
pub fn parse_tool_call(name: &str, arguments: &str) -> Result<ToolCall, ToolError> {
    if ToolKind::from_name(name).is_none() {
        return Err(ToolError::UnknownTool(name.to_string()));
    }

    let invalid = |reason: String| ToolError::InvalidArguments {
        tool: name.to_string(),
        reason,
    };

    let mut args = if arguments.trim().is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(arguments) {
            Ok(Value::Object(map)) => map,
            Ok(_) => return Err(invalid("arguments must be a JSON object".to_string())),
            Err(e) => return Err(invalid(e.to_string())),
        }
    };

    args.insert("name".to_string(), json!(name));
    serde_json::from_value(Value::Object(args)).map_err(|e| invalid(e.to_string()))
}

/// Parse and run one model-requested tool call against a state snapshot.
///
/// Returns the outcome and the delta to commit, which is empty on failure.
pub fn invoke_tool(
    name: &str,
    arguments: &str,
    permitted: &[ToolKind],
    state: &State,
) -> (ToolOutcome, StateDelta) {
    info!("Tool: {} called with args: {}", name, arguments);

    let call = match parse_tool_call(name, arguments) {
        Ok(call) if permitted.contains(&call.kind()) => call,
        Ok(_) => return failure(name, ToolError::NotPermitted(name.to_string())),
        Err(e) => return failure(name, e),
    };

    let mut ctx = ToolContext::new(state);
    match call.execute(&mut ctx) {
        Ok(success) => (ToolOutcome::Success(success), ctx.into_delta()),
        Err(e) => failure(name, e),
    }
}

fn failure(name: &str, error: ToolError) -> (ToolOutcome, StateDelta) {
    warn!("Tool {} failed: {}", name, error);
    (
        ToolOutcome::Failure {
            action: name.to_string(),
            error,
        },
        StateDelta::new(),
    )
}
