//! Turn runner with tool calling loop.
//!
//! A turn moves through `Idle -> AwaitingModel -> (ToolDispatch)* -> Finalizing -> Idle`.
//! Each tool's delta is committed to the session store as soon as the tool
//! returns, before its result is fed back to the model. A failed turn keeps
//! those commits and rolls back only the in-process conversation history.

use super::definition::Agent;
use super::model::{ChatModel, ModelReply, ModelRequest};
use super::tools::{invoke_tool, ToolOutcome};
use crate::error::{RecallError, Result};
use crate::session::{SessionKey, SessionStore, State, StateDelta};
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestAssistantMessageArgs,
    ChatCompletionRequestMessage, ChatCompletionRequestToolMessageArgs,
    ChatCompletionRequestUserMessageArgs,
};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, instrument};

const DEFAULT_MAX_ITERATIONS: usize = 10;
const DEFAULT_MAX_HISTORY: usize = 40;

/// Where the runner is within a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    AwaitingModel,
    ToolDispatch,
    Finalizing,
}

impl fmt::Display for TurnPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnPhase::Idle => "idle",
            TurnPhase::AwaitingModel => "awaiting_model",
            TurnPhase::ToolDispatch => "tool_dispatch",
            TurnPhase::Finalizing => "finalizing",
        };
        f.write_str(name)
    }
}

/// Final output of a turn.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    Text(String),
    /// Schema-validated JSON object.
    Structured(Value),
}

impl fmt::Display for AgentOutput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentOutput::Text(text) => f.write_str(text),
            AgentOutput::Structured(value) => {
                let pretty = serde_json::to_string_pretty(value).map_err(|_| fmt::Error)?;
                f.write_str(&pretty)
            }
        }
    }
}

/// Record of a tool call made during a turn.
#[derive(Debug, Clone)]
pub struct ToolCallRecord {
    /// Name of the tool called.
    pub name: String,
    /// JSON arguments passed to the tool.
    pub arguments: String,
    /// Result returned to the model.
    pub outcome: ToolOutcome,
    /// State changes committed for this call.
    pub committed: StateDelta,
}

impl fmt::Display for ToolCallRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.arguments)
    }
}

/// Result of one completed turn.
#[derive(Debug, Clone)]
pub struct TurnReport {
    pub output: AgentOutput,
    pub tool_calls: Vec<ToolCallRecord>,
    /// Number of model calls used.
    pub iterations: usize,
    /// Session state after the turn.
    pub state: State,
}

/// Drives conversational turns for one agent against a session store.
pub struct Runner {
    agent: Agent,
    model: Arc<dyn ChatModel>,
    store: Arc<dyn SessionStore>,
    max_iterations: usize,
    max_history: usize,
    histories: HashMap<SessionKey, Vec<ChatCompletionRequestMessage>>,
    phase: TurnPhase,
}

impl Runner {
    pub fn new(agent: Agent, model: Arc<dyn ChatModel>, store: Arc<dyn SessionStore>) -> Self {
        Self {
            agent,
            model,
            store,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_history: DEFAULT_MAX_HISTORY,
            histories: HashMap::new(),
            phase: TurnPhase::Idle,
        }
    }

    /// Set maximum model calls per turn.
    pub fn with_max_iterations(mut self, max: usize) -> Self {
        self.max_iterations = max.max(1);
        self
    }

    /// Set how many history messages are kept between turns.
    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    /// Number of messages remembered for a session.
    pub fn history_len(&self, key: &SessionKey) -> usize {
        self.histories.get(key).map_or(0, Vec::len)
    }

    /// Forget the conversation history of a session. State is untouched.
    pub fn clear_history(&mut self, key: &SessionKey) {
        self.histories.remove(key);
    }

    /// Run a turn, logging and swallowing turn-level failures.
    pub async fn send(&mut self, key: &SessionKey, message: &str) -> Option<TurnReport> {
        match self.run_turn(key, message).await {
            Ok(report) => Some(report),
            Err(e) => {
                error!("Turn failed for session {}: {}", key.session_id, e);
                None
            }
        }
    }

    /// Run one turn: user message in, final response out.
    #[instrument(skip(self, message), fields(agent = %self.agent.name, session = %key.session_id))]
    pub async fn run_turn(&mut self, key: &SessionKey, message: &str) -> Result<TurnReport> {
        info!("Processing user query: {}", message);

        let mut history = self.histories.remove(key).unwrap_or_default();
        let checkpoint = history.len();

        self.transition(TurnPhase::AwaitingModel);
        let result = self.drive(key, message, &mut history).await;

        match &result {
            Ok(_) => trim_history(&mut history, self.max_history),
            Err(_) => history.truncate(checkpoint),
        }
        if !history.is_empty() {
            self.histories.insert(key.clone(), history);
        }

        self.transition(TurnPhase::Idle);
        result
    }

    async fn drive(
        &mut self,
        key: &SessionKey,
        message: &str,
        history: &mut Vec<ChatCompletionRequestMessage>,
    ) -> Result<TurnReport> {
        history.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(message)
                .build()
                .map_err(|e| RecallError::Agent(e.to_string()))?
                .into(),
        );

        let mut tool_calls = Vec::new();
        let mut iterations = 0;

        loop {
            iterations += 1;
            if iterations > self.max_iterations {
                return Err(RecallError::Agent(format!(
                    "Agent exceeded maximum iterations ({})",
                    self.max_iterations
                )));
            }

            debug!("Turn iteration {}, {} messages", iterations, history.len());

            // Re-read state every iteration so the instruction reflects committed deltas.
            let session = self.store.get_session(key).await?;
            let request = ModelRequest {
                model: self.agent.model.clone(),
                instruction: self.agent.render_instruction(&session.state)?,
                messages: history.clone(),
                tools: self.agent.tool_definitions(),
                response_format: self.agent.response_format(),
            };

            let reply = self.model.complete(request).await?;

            if reply.wants_tools() {
                self.transition(TurnPhase::ToolDispatch);
                history.push(assistant_tool_call_message(&reply)?);

                for call in &reply.tool_calls {
                    let record = self.dispatch(key, call).await?;
                    history.push(
                        ChatCompletionRequestToolMessageArgs::default()
                            .tool_call_id(call.id.as_str())
                            .content(record.outcome.to_json().to_string())
                            .build()
                            .map_err(|e| RecallError::Agent(e.to_string()))?
                            .into(),
                    );
                    tool_calls.push(record);
                }

                self.transition(TurnPhase::AwaitingModel);
                continue;
            }

            self.transition(TurnPhase::Finalizing);
            let content = reply.content.unwrap_or_default();
            let output = self.finalize(key, &content).await?;

            history.push(
                ChatCompletionRequestAssistantMessageArgs::default()
                    .content(content)
                    .build()
                    .map_err(|e| RecallError::Agent(e.to_string()))?
                    .into(),
            );

            let session = self.store.get_session(key).await?;
            return Ok(TurnReport {
                output,
                tool_calls,
                iterations,
                state: session.state,
            });
        }
    }

    /// Execute one requested tool call and commit its delta.
    async fn dispatch(
        &self,
        key: &SessionKey,
        call: &ChatCompletionMessageToolCall,
    ) -> Result<ToolCallRecord> {
        let session = self.store.get_session(key).await?;
        let (outcome, delta) = invoke_tool(
            &call.function.name,
            &call.function.arguments,
            &self.agent.tools,
            &session.state,
        );

        if !delta.is_empty() {
            self.store.apply_delta(key, &delta).await?;
        }

        Ok(ToolCallRecord {
            name: call.function.name.clone(),
            arguments: call.function.arguments.clone(),
            outcome,
            committed: delta,
        })
    }

    /// Validate the final content and store structured output when configured.
    async fn finalize(&self, key: &SessionKey, content: &str) -> Result<AgentOutput> {
        let Some(schema) = &self.agent.output_schema else {
            return Ok(AgentOutput::Text(content.to_string()));
        };

        let value = schema.validate(content)?;

        if let Some(output_key) = &self.agent.output_key {
            let mut delta = StateDelta::new();
            delta.set(output_key.as_str(), value.clone());
            self.store.apply_delta(key, &delta).await?;
        }

        Ok(AgentOutput::Structured(value))
    }

    fn transition(&mut self, next: TurnPhase) {
        debug!("Runner phase {} -> {}", self.phase, next);
        self.phase = next;
    }
}

fn assistant_tool_call_message(reply: &ModelReply) -> Result<ChatCompletionRequestMessage> {
    let mut args = ChatCompletionRequestAssistantMessageArgs::default();
    args.tool_calls(reply.tool_calls.clone());
    if let Some(content) = reply.content.as_deref().filter(|c| !c.is_empty()) {
        args.content(content);
    }
    let message = args.build().map_err(|e| RecallError::Agent(e.to_string()))?;
    Ok(message.into())
}

/// Keep at most `max_messages`, cutting only at a user message so tool results
/// never lose the assistant message that requested them.
fn trim_history(history: &mut Vec<ChatCompletionRequestMessage>, max_messages: usize) {
    if history.len() <= max_messages {
        return;
    }

    let earliest = history.len() - max_messages;
    let cut = history[earliest..]
        .iter()
        .position(|m| matches!(m, ChatCompletionRequestMessage::User(_)))
        .map(|offset| earliest + offset);

    match cut {
        Some(index) => {
            history.drain(..index);
        }
        None => history.clear(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::catalog::{email_agent, reminder_agent, EMAIL_OUTPUT_KEY};
    use crate::agent::model::testing::{tool_call, tool_reply, ScriptedModel};
    use crate::agent::tools::ToolError;
    use crate::config::Prompts;
    use crate::session::{MemorySessionStore, REMINDERS_KEY, USER_NAME_KEY};
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    async fn setup(
        agent: Agent,
        replies: Vec<Result<ModelReply>>,
    ) -> (Runner, Arc<ScriptedModel>, Arc<dyn SessionStore>, SessionKey) {
        let store: Arc<dyn SessionStore> = Arc::new(MemorySessionStore::new());
        let mut state = State::new();
        state.insert(USER_NAME_KEY, "Afzal");
        state.insert(REMINDERS_KEY, json!([]));
        let session = store
            .create_session("app", "afzal", None, state)
            .await
            .unwrap();

        let model = Arc::new(ScriptedModel::new(replies));
        let runner = Runner::new(agent, model.clone(), Arc::clone(&store));
        (runner, model, store, session.key())
    }

    fn reminders() -> Agent {
        reminder_agent(&Prompts::default(), "gpt-4o")
    }

    #[tokio::test]
    async fn test_add_then_view_in_one_turn() {
        let (mut runner, model, store, key) = setup(
            reminders(),
            vec![
                Ok(tool_reply(vec![tool_call(
                    "c1",
                    "add_reminder",
                    r#"{"reminder": "buy milk"}"#,
                )])),
                Ok(tool_reply(vec![tool_call("c2", "view_reminders", "{}")])),
                Ok(ModelReply::text("Your reminders: buy milk")),
            ],
        )
        .await;

        let report = runner.run_turn(&key, "remind me to buy milk").await.unwrap();

        assert_eq!(report.output, AgentOutput::Text("Your reminders: buy milk".to_string()));
        assert_eq!(report.iterations, 3);
        assert_eq!(report.tool_calls.len(), 2);
        match &report.tool_calls[1].outcome {
            ToolOutcome::Success(s) => assert_eq!(s.data[REMINDERS_KEY], json!(["buy milk"])),
            other => panic!("Expected success, got {:?}", other),
        }
        assert_eq!(report.state.get_items(REMINDERS_KEY), vec!["buy milk"]);

        let stored = store.get_session(&key).await.unwrap();
        assert_eq!(stored.state.get_items(REMINDERS_KEY), vec!["buy milk"]);

        // The model saw the committed reminder in its instruction after the add.
        let instructions = model.instructions();
        assert!(instructions[0].contains("Reminders: []"));
        assert!(instructions[1].contains(r#"Reminders: ["buy milk"]"#));
        assert_eq!(runner.phase(), TurnPhase::Idle);
        // user, assistant(tool), tool, assistant(tool), tool, assistant
        assert_eq!(runner.history_len(&key), 6);
    }

    #[tokio::test]
    async fn test_rename_is_visible_in_later_turns() {
        let (mut runner, model, _store, key) = setup(
            reminders(),
            vec![
                Ok(tool_reply(vec![tool_call(
                    "c1",
                    "update_user_name",
                    r#"{"user_name": "Bob"}"#,
                )])),
                Ok(ModelReply::text("Hi Bob")),
                Ok(ModelReply::text("You are Bob")),
            ],
        )
        .await;

        assert_ok!(runner.run_turn(&key, "call me Bob").await);
        assert_ok!(runner.run_turn(&key, "what's my name?").await);

        let instructions = model.instructions();
        assert!(instructions[0].contains("User's name: Afzal"));
        assert!(instructions[1].contains("User's name: Bob"));
        assert!(instructions[2].contains("User's name: Bob"));

        // Second turn carries the first turn's conversation.
        let requests = model.requests();
        assert_eq!(requests[2].messages.len(), 5);
    }

    #[tokio::test]
    async fn test_tool_error_is_reported_to_model() {
        let (mut runner, _model, store, key) = setup(
            reminders(),
            vec![
                Ok(tool_reply(vec![tool_call(
                    "c1",
                    "delete_reminder",
                    r#"{"reminder": "walk dog"}"#,
                )])),
                Ok(ModelReply::text("There is no such reminder.")),
            ],
        )
        .await;

        let report = runner.run_turn(&key, "delete walk dog").await.unwrap();

        assert_eq!(
            report.tool_calls[0].outcome,
            ToolOutcome::Failure {
                action: "delete_reminder".to_string(),
                error: ToolError::ReminderNotFound("walk dog".to_string()),
            }
        );
        assert!(report.tool_calls[0].committed.is_empty());
        let stored = store.get_session(&key).await.unwrap();
        assert!(stored.state.get_items(REMINDERS_KEY).is_empty());
    }

    #[tokio::test]
    async fn test_model_failure_keeps_committed_delta() {
        let (mut runner, _model, store, key) = setup(
            reminders(),
            vec![
                Ok(tool_reply(vec![tool_call(
                    "c1",
                    "add_reminder",
                    r#"{"reminder": "pay rent"}"#,
                )])),
                Err(RecallError::OpenAI("connection reset".to_string())),
            ],
        )
        .await;

        assert!(runner.send(&key, "remind me to pay rent").await.is_none());

        let stored = store.get_session(&key).await.unwrap();
        assert_eq!(stored.state.get_items(REMINDERS_KEY), vec!["pay rent"]);
        assert_eq!(runner.history_len(&key), 0);
        assert_eq!(runner.phase(), TurnPhase::Idle);
    }

    #[tokio::test]
    async fn test_failed_turn_does_not_break_next_turn() {
        let (mut runner, model, _store, key) = setup(
            reminders(),
            vec![
                Ok(ModelReply::text("first")),
                Err(RecallError::Model("timeout".to_string())),
            ],
        )
        .await;

        assert_ok!(runner.run_turn(&key, "hello").await);
        assert_err!(runner.run_turn(&key, "again").await);
        assert_eq!(runner.history_len(&key), 2);

        model.push(Ok(ModelReply::text("recovered")));
        let report = runner.send(&key, "third").await.unwrap();
        assert_eq!(report.output, AgentOutput::Text("recovered".to_string()));
    }

    #[tokio::test]
    async fn test_unknown_tool_does_not_abort_turn() {
        let (mut runner, _model, _store, key) = setup(
            reminders(),
            vec![
                Ok(tool_reply(vec![tool_call("c1", "get_current_time", "{}")])),
                Ok(ModelReply::text("I can't tell the time.")),
            ],
        )
        .await;

        let report = runner.run_turn(&key, "what time is it?").await.unwrap();
        assert!(!report.tool_calls[0].outcome.is_success());
    }

    #[tokio::test]
    async fn test_max_iterations() {
        let replies = (0..5)
            .map(|i| Ok(tool_reply(vec![tool_call(&format!("c{}", i), "view_reminders", "{}")])))
            .collect();
        let (runner, _model, _store, key) = setup(reminders(), replies).await;
        let mut runner = runner.with_max_iterations(2);

        let err = runner.run_turn(&key, "loop forever").await.unwrap_err();
        assert!(matches!(err, RecallError::Agent(msg) if msg.contains("maximum iterations")));
    }

    #[tokio::test]
    async fn test_structured_output_is_validated_and_stored() {
        let (mut runner, model, store, key) = setup(
            email_agent(&Prompts::default(), "gpt-4o"),
            vec![Ok(ModelReply::text(
                r#"{"subject": "Team lunch", "body": "Lunch is on Friday."}"#,
            ))],
        )
        .await;

        let report = runner
            .run_turn(&key, "Invite the team to lunch on Friday")
            .await
            .unwrap();

        let expected = json!({"subject": "Team lunch", "body": "Lunch is on Friday."});
        assert_eq!(report.output, AgentOutput::Structured(expected.clone()));

        let stored = store.get_session(&key).await.unwrap();
        assert_eq!(stored.state.get(EMAIL_OUTPUT_KEY), Some(&expected));

        let requests = model.requests();
        assert!(requests[0].response_format.is_some());
        assert!(requests[0].tools.is_empty());
    }

    #[tokio::test]
    async fn test_structured_output_with_prose_yields_no_response() {
        let (mut runner, _model, store, key) = setup(
            email_agent(&Prompts::default(), "gpt-4o"),
            vec![Ok(ModelReply::text("Here is your email: Subject: Hi"))],
        )
        .await;

        assert!(runner.send(&key, "write an email").await.is_none());
        let stored = store.get_session(&key).await.unwrap();
        assert!(stored.state.get(EMAIL_OUTPUT_KEY).is_none());
    }

    #[tokio::test]
    async fn test_missing_session_fails_turn() {
        let (mut runner, _model, _store, _key) =
            setup(reminders(), vec![Ok(ModelReply::text("unused"))]).await;
        let ghost = SessionKey::new("app", "afzal", "ghost");

        let err = runner.run_turn(&ghost, "hi").await.unwrap_err();
        assert!(matches!(err, RecallError::SessionNotFound { .. }));
    }

    #[test]
    fn test_trim_history_cuts_at_user_message() {
        let user = |text: &str| -> ChatCompletionRequestMessage {
            ChatCompletionRequestUserMessageArgs::default()
                .content(text)
                .build()
                .unwrap()
                .into()
        };
        let assistant = |text: &str| -> ChatCompletionRequestMessage {
            ChatCompletionRequestAssistantMessageArgs::default()
                .content(text)
                .build()
                .unwrap()
                .into()
        };

        let mut history = vec![
            user("1"),
            assistant("a"),
            assistant("b"),
            user("2"),
            assistant("c"),
        ];
        trim_history(&mut history, 3);
        assert_eq!(history.len(), 2);
        assert!(matches!(history[0], ChatCompletionRequestMessage::User(_)));
    }

    #[test]
    fn test_tool_call_record_display() {
        let record = ToolCallRecord {
            name: "add_reminder".to_string(),
            arguments: r#"{"reminder": "x"}"#.to_string(),
            outcome: ToolOutcome::Failure {
                action: "add_reminder".to_string(),
                error: ToolError::UnknownTool("x".to_string()),
            },
            committed: StateDelta::new(),
        };
        assert_eq!(format!("{}", record), r#"add_reminder({"reminder": "x"})"#);
    }
}
