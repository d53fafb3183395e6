//! In-process provider with canned replies.
//!
//! Used to drive the analysis and generation stages without network access.

use crate::llm_provider::*;
use anyhow::anyhow;
use async_trait::async_trait;
use std::sync::Mutex;

#[derive(Debug, Clone)]
enum Reply {
    Content(String),
    ToolCalls(String, Vec<ToolCall>),
    Echo,
    Fail(String),
}

/// A recorded `generate_chat` call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub config: GenerationConfig,
}

pub struct ScriptedProvider {
    reply: Reply,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedProvider {
    /// Always answers with `content`
    pub fn replying(content: impl Into<String>) -> Self {
        Self::new(Reply::Content(content.into()))
    }

    /// Answers with `content` plus the given function calls
    pub fn with_tool_calls(content: impl Into<String>, calls: Vec<ToolCall>) -> Self {
        Self::new(Reply::ToolCalls(content.into(), calls))
    }

    /// Answers with the text of the last message it received
    pub fn echo() -> Self {
        Self::new(Reply::Echo)
    }

    /// Every call fails with `message`
    pub fn failing(message: impl Into<String>) -> Self {
        Self::new(Reply::Fail(message.into()))
    }

    fn new(reply: Reply) -> Self {
        Self {
            reply,
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .map(|calls| calls.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LLMProvider for ScriptedProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(RecordedCall {
                messages: messages.to_vec(),
                config: config.clone(),
            });
        }

        let (content, tool_calls) = match &self.reply {
            Reply::Content(content) => (content.clone(), Vec::new()),
            Reply::ToolCalls(content, calls) => (content.clone(), calls.clone()),
            Reply::Echo => (
                messages.last().map(|m| m.content.clone()).unwrap_or_default(),
                Vec::new(),
            ),
            Reply::Fail(message) => return Err(anyhow!("{}", message)),
        };

        Ok(LLMResponse {
            finish_reason: Some(if tool_calls.is_empty() { "stop" } else { "tool_calls" }.to_string()),
            content,
            model: "scripted".to_string(),
            tool_calls,
            ..Default::default()
        })
    }

    fn provider_name(&self) -> &str {
        "scripted"
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
