//! Agent definition: model, instruction template, permitted tools and output shape.

use super::instruction::InstructionTemplate;
use super::output::OutputSchema;
use super::tools::{tool_definitions, ToolKind};
use crate::error::Result;
use crate::session::State;
use async_openai::types::{ChatCompletionTool, ResponseFormat};

/// A configured agent.
#[derive(Debug, Clone)]
pub struct Agent {
    pub name: String,
    pub description: String,
    pub model: String,
    pub instruction: InstructionTemplate,
    pub tools: Vec<ToolKind>,
    pub output_schema: Option<OutputSchema>,
    /// State key the validated structured output is written to.
    pub output_key: Option<String>,
}

impl Agent {
    /// Create a new agent with no tools and free-text output.
    pub fn new(name: &str, model: &str, instruction: impl Into<InstructionTemplate>) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            model: model.to_string(),
            instruction: instruction.into(),
            tools: Vec::new(),
            output_schema: None,
            output_key: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn with_tools(mut self, tools: &[ToolKind]) -> Self {
        self.tools = tools.to_vec();
        self
    }

    pub fn with_output_schema(mut self, schema: OutputSchema) -> Self {
        self.output_schema = Some(schema);
        self
    }

    pub fn with_output_key(mut self, key: &str) -> Self {
        self.output_key = Some(key.to_string());
        self
    }

    /// Render the instruction against the current session state.
    pub fn render_instruction(&self, state: &State) -> Result<String> {
        self.instruction.render(state)
    }

    pub fn tool_definitions(&self) -> Vec<ChatCompletionTool> {
        tool_definitions(&self.tools)
    }

    pub fn response_format(&self) -> Option<ResponseFormat> {
        self.output_schema.as_ref().map(OutputSchema::response_format)
    }
}
