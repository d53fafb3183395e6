use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

pub type LLMResult<T> = anyhow::Result<T>;

/// A function the model may call, in the OpenAI `tools` format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    /// JSON schema of the arguments
    pub parameters: Value,
    #[serde(default)]
    pub strict: bool,
}

/// A function call returned by the model. `arguments` is raw JSON text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolCall {
    pub name: String,
    pub arguments: String,
}

/// Sampling settings and extras for one chat request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    pub temperature: f32,
    pub max_tokens: Option<usize>,
    #[serde(default)]
    pub tools: Vec<ToolDefinition>,
    /// Merged into the top level of the request body (Captain's `captain` block)
    #[serde(default)]
    pub extra_body: Option<Value>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: 0.1,
            max_tokens: Some(4096),
            tools: Vec::new(),
            extra_body: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: MessageRole,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    System,
    User,
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let role = match self {
            MessageRole::System => "system",
            MessageRole::User => "user",
        };
        f.write_str(role)
    }
}

/// One chat completion. Token counts are `None` when the upstream omits usage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LLMResponse {
    /// Empty when the model only called tools
    pub content: String,
    pub total_tokens: Option<usize>,
    pub prompt_tokens: Option<usize>,
    pub completion_tokens: Option<usize>,
    /// "stop", "length" or "tool_calls"
    pub finish_reason: Option<String>,
    pub model: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

/// A chat model behind Captain analysis or Morph patching.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse>;

    /// Short name used in logs, e.g. "captain"
    fn provider_name(&self) -> &str;

    fn model_name(&self) -> &str;
}
