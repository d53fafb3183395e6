use crate::llm_provider::*;
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::warn;

/// Endpoint settings for one OpenAI-compatible chat upstream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAICompatibleConfig {
    /// Up to and including the version segment, e.g. "https://api.morphllm.com/v1"
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    /// Extra attempts after the first failure
    pub max_retries: u32,
    pub api_key: Option<String>,
    #[serde(default)]
    pub headers: Vec<(String, String)>,
    /// Used in logs and error messages
    pub provider_name: String,
}

impl Default for OpenAICompatibleConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:1234/v1".to_string(),
            model: "local-model".to_string(),
            timeout_secs: 120,
            max_retries: 2,
            api_key: None,
            headers: Vec::new(),
            provider_name: "openai-compatible".to_string(),
        }
    }
}

impl OpenAICompatibleConfig {
    pub fn custom(base_url: String, model: String, provider_name: String) -> Self {
        Self {
            base_url,
            model,
            provider_name,
            ..Default::default()
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Chat Completions client shared by Captain and Morph.
pub struct OpenAICompatibleProvider {
    config: OpenAICompatibleConfig,
    client: Client,
}

impl OpenAICompatibleProvider {
    pub fn new(config: OpenAICompatibleConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .with_context(|| format!("Failed to build {} HTTP client", config.provider_name))?;

        Ok(Self { config, client })
    }

    /// Up to `max_retries` extra attempts, backing off 1s, 2s, 4s...
    async fn chat_with_retries(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> Result<LLMResponse> {
        let attempts = self.config.max_retries + 1;
        let mut attempt = 0;
        loop {
            match self.chat_once(messages, config).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt + 1 < attempts => {
                    warn!(
                        provider = %self.config.provider_name,
                        attempt = attempt + 1,
                        attempts,
                        "chat request failed: {:#}",
                        e
                    );
                    tokio::time::sleep(Duration::from_secs(1 << attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Request body with `extra_body` keys merged over the standard fields.
    fn build_body(&self, messages: &[Message], config: &GenerationConfig) -> Result<Value> {
        let tools = (!config.tools.is_empty()).then(|| {
            config
                .tools
                .iter()
                .map(|tool| ChatTool {
                    tool_type: "function".to_string(),
                    function: tool.clone(),
                })
                .collect()
        });
        let request = ChatCompletionsRequest {
            model: self.config.model.clone(),
            messages: messages
                .iter()
                .map(|m| ChatMessage {
                    role: m.role.to_string(),
                    content: Some(m.content.clone()),
                    tool_calls: None,
                })
                .collect(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            tools,
        };

        let mut body = serde_json::to_value(&request).context("Failed to encode chat request")?;
        if let (Value::Object(body), Some(Value::Object(extra))) = (&mut body, &config.extra_body) {
            body.extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        Ok(body)
    }

    async fn chat_once(&self, messages: &[Message], config: &GenerationConfig) -> Result<LLMResponse> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let mut request = self
            .client
            .post(&url)
            .json(&self.build_body(messages, config)?);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }
        for (name, value) in &self.config.headers {
            request = request.header(name.as_str(), value.as_str());
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("{} unreachable at {}", self.config.provider_name, url))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "{} returned {}: {}",
                self.config.provider_name,
                status,
                body
            ));
        }

        let completion: ChatCompletionsResponse = response
            .json()
            .await
            .with_context(|| format!("Malformed {} completion", self.config.provider_name))?;
        let usage = completion.usage;
        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("{} completion has no choices", self.config.provider_name))?;

        Ok(LLMResponse {
            content: choice.message.content.unwrap_or_default(),
            total_tokens: usage.as_ref().map(|u| u.total_tokens),
            prompt_tokens: usage.as_ref().map(|u| u.prompt_tokens),
            completion_tokens: usage.as_ref().map(|u| u.completion_tokens),
            finish_reason: choice.finish_reason,
            model: completion.model.unwrap_or_else(|| self.config.model.clone()),
            tool_calls: choice
                .message
                .tool_calls
                .unwrap_or_default()
                .into_iter()
                .map(|call| ToolCall {
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
        })
    }
}

#[async_trait]
impl LLMProvider for OpenAICompatibleProvider {
    async fn generate_chat(
        &self,
        messages: &[Message],
        config: &GenerationConfig,
    ) -> LLMResult<LLMResponse> {
        self.chat_with_retries(messages, config).await
    }

    fn provider_name(&self) -> &str {
        &self.config.provider_name
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Chat Completions wire types

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<ChatTool>>,
}

#[derive(Debug, Serialize)]
struct ChatTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: ToolDefinition,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ChatToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatToolCall {
    function: ChatFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatFunctionCall {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, http::StatusCode, routing::post, Json, Router};
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    type Captured = Arc<Mutex<Vec<(HeaderMap, Value)>>>;

    async fn spawn_fake(status: StatusCode, reply: Value) -> (String, Captured) {
        let captured: Captured = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(
                    move |State(captured): State<Captured>,
                          headers: HeaderMap,
                          Json(body): Json<Value>| {
                        let reply = reply.clone();
                        async move {
                            captured.lock().unwrap().push((headers, body));
                            (status, Json(reply))
                        }
                    },
                ),
            )
            .with_state(captured.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}/v1", addr), captured)
    }

    fn provider(base_url: String, max_retries: u32) -> OpenAICompatibleProvider {
        let config = OpenAICompatibleConfig {
            api_key: Some("secret".to_string()),
            max_retries,
            ..OpenAICompatibleConfig::custom(base_url, "test-model".to_string(), "fake".to_string())
        }
        .with_header("X-Organization-ID", "org-42");
        OpenAICompatibleProvider::new(config).unwrap()
    }

    #[tokio::test]
    async fn sends_tools_headers_and_extra_body() {
        let (url, captured) = spawn_fake(
            StatusCode::OK,
            json!({
                "id": "1",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "c1",
                            "type": "function",
                            "function": {"name": "identify_bottlenecks", "arguments": "{\"bottlenecks\":[]}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 3, "completion_tokens": 4, "total_tokens": 7}
            }),
        )
        .await;

        let config = GenerationConfig {
            tools: vec![ToolDefinition {
                name: "identify_bottlenecks".to_string(),
                description: "find them".to_string(),
                parameters: json!({"type": "object"}),
                strict: true,
            }],
            extra_body: Some(json!({"captain": {"processing_mode": "x"}})),
            ..Default::default()
        };

        let response = provider(url, 0)
            .generate_chat(&[Message::user("hi")], &config)
            .await
            .unwrap();

        assert_eq!(response.content, "");
        assert_eq!(response.finish_reason.as_deref(), Some("tool_calls"));
        assert_eq!(response.total_tokens, Some(7));
        assert_eq!(
            response.tool_calls,
            vec![ToolCall {
                name: "identify_bottlenecks".to_string(),
                arguments: "{\"bottlenecks\":[]}".to_string(),
            }]
        );

        let requests = captured.lock().unwrap();
        let (headers, body) = &requests[0];
        assert_eq!(headers["authorization"], "Bearer secret");
        assert_eq!(headers["x-organization-id"], "org-42");
        assert_eq!(body["model"], "test-model");
        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "identify_bottlenecks");
        assert_eq!(body["captain"]["processing_mode"], "x");
        assert_eq!(body["messages"][0]["role"], "user");
    }

    #[tokio::test]
    async fn surfaces_status_and_body_after_retries() {
        let (url, captured) =
            spawn_fake(StatusCode::INTERNAL_SERVER_ERROR, json!({"error": "down"})).await;

        let err = provider(url, 1)
            .generate_chat(&[Message::user("hi")], &GenerationConfig::default())
            .await
            .unwrap_err();

        let text = err.to_string();
        assert!(text.contains("fake returned 500"));
        assert!(text.contains("down"));
        assert_eq!(captured.lock().unwrap().len(), 2);
    }

    #[test]
    fn omits_tools_when_none_offered() {
        let provider = provider("http://localhost:1".to_string(), 0);
        let body = provider
            .build_body(&[Message::system("s")], &GenerationConfig::default())
            .unwrap();
        assert!(body.get("tools").is_none());
        assert_eq!(body["max_tokens"], 4096);
    }
}
