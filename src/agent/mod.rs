//! Agent system: session-scoped tool agents with state-templated instructions.
//!
//! An [`Agent`] couples a model, an instruction template rendered from
//! session state, the tools it may call and an optional output schema.
//! The [`Runner`] drives turns for an agent against a session store.

pub mod catalog;
mod definition;
mod instruction;
mod model;
mod output;
mod runner;
mod tools;

#[cfg(test)]
pub(crate) use model::testing;

pub use definition::Agent;
pub use instruction::InstructionTemplate;
pub use model::{ChatModel, ModelReply, ModelRequest, OpenAiChatModel};
pub use output::{FieldType, OutputField, OutputSchema};
pub use runner::{AgentOutput, Runner, ToolCallRecord, TurnPhase, TurnReport};
pub use tools::{
    invoke_tool, parse_tool_call, tool_definitions, ToolCall, ToolContext, ToolError, ToolKind,
    ToolOutcome, ToolSuccess, REMINDER_TOOLS,
};
