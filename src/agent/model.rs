//! Language model collaborator.
//!
//! The runner talks to the model through [`ChatModel`]; [`OpenAiChatModel`]
//! is the production implementation over the chat completions API.

use crate::error::{RecallError, Result};
use crate::openai::OpenAiClient;
use async_openai::types::{
    ChatCompletionMessageToolCall, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionTool, CreateChatCompletionRequestArgs,
    ResponseFormat,
};
use async_trait::async_trait;
use tracing::debug;

/// One model query: the rendered instruction, conversation history and offered tools.
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub instruction: String,
    pub messages: Vec<ChatCompletionRequestMessage>,
    pub tools: Vec<ChatCompletionTool>,
    pub response_format: Option<ResponseFormat>,
}

/// The model's answer: tool call requests, final content, or both.
#[derive(Debug, Clone, Default)]
pub struct ModelReply {
    pub content: Option<String>,
    pub tool_calls: Vec<ChatCompletionMessageToolCall>,
}

impl ModelReply {
    pub fn text(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
            tool_calls: Vec::new(),
        }
    }

    pub fn wants_tools(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

/// Trait for language model backends.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, request: ModelRequest) -> Result<ModelReply>;
}

/// Chat completions backed by the OpenAI API.
pub struct OpenAiChatModel {
    client: OpenAiClient,
}

impl OpenAiChatModel {
    pub fn new(client: OpenAiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn complete(&self, request: ModelRequest) -> Result<ModelReply> {
        let mut messages: Vec<ChatCompletionRequestMessage> =
            Vec::with_capacity(request.messages.len() + 1);
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(request.instruction)
                .build()
                .map_err(|e| RecallError::Model(e.to_string()))?
                .into(),
        );
        messages.extend(request.messages);

        let mut args = CreateChatCompletionRequestArgs::default();
        args.model(&request.model).messages(messages);
        if !request.tools.is_empty() {
            args.tools(request.tools);
        }
        if let Some(format) = request.response_format {
            args.response_format(format);
        }
        let chat_request = args.build().map_err(|e| RecallError::Model(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(chat_request)
            .await
            .map_err(|e| RecallError::OpenAI(format!("Chat API error: {}", e)))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RecallError::Model("No response from model".to_string()))?;

        debug!(
            "Model replied with {} tool call(s)",
            choice.message.tool_calls.as_ref().map_or(0, Vec::len)
        );

        Ok(ModelReply {
            content: choice.message.content,
            tool_calls: choice.message.tool_calls.unwrap_or_default(),
        })
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Scripted model for driving the runner in tests.

    use super::*;
    use async_openai::types::{ChatCompletionToolType, FunctionCall};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub(crate) fn tool_call(
        id: &str,
        name: &str,
        arguments: &str,
    ) -> ChatCompletionMessageToolCall {
        ChatCompletionMessageToolCall {
            id: id.to_string(),
            r#type: ChatCompletionToolType::Function,
            function: FunctionCall {
                name: name.to_string(),
                arguments: arguments.to_string(),
            },
        }
    }

    pub(crate) fn tool_reply(calls: Vec<ChatCompletionMessageToolCall>) -> ModelReply {
        ModelReply {
            content: None,
            tool_calls: calls,
        }
    }

    /// Replays queued replies and records every request it receives.
    #[derive(Default)]
    pub(crate) struct ScriptedModel {
        replies: Mutex<VecDeque<Result<ModelReply>>>,
        requests: Mutex<Vec<ModelRequest>>,
    }

    impl ScriptedModel {
        pub(crate) fn new(replies: Vec<Result<ModelReply>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        pub(crate) fn push(&self, reply: Result<ModelReply>) {
            self.replies.lock().unwrap().push_back(reply);
        }

        pub(crate) fn requests(&self) -> Vec<ModelRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub(crate) fn instructions(&self) -> Vec<String> {
            self.requests().into_iter().map(|r| r.instruction).collect()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, request: ModelRequest) -> Result<ModelReply> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(RecallError::Model("script exhausted".to_string())))
        }
    }
}
