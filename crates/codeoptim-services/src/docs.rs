//! Documentation scraping and implementation generation via Firecrawl.

use crate::doc_templates::{self, TemplateContext};
use anyhow::{anyhow, Context, Result};
use codeoptim_core::DocsConfig;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{info, warn};

const MAX_IMPLEMENTATIONS: usize = 10;
const EXTRACT_POLL_ATTEMPTS: usize = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiEndpoint {
    #[serde(default = "default_method")]
    pub method: String,
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: Vec<Value>,
}

fn default_method() -> String {
    "POST".to_string()
}

fn default_endpoint() -> String {
    "/api".to_string()
}

fn default_example_language() -> String {
    "javascript".to_string()
}

impl ApiEndpoint {
    fn new(method: &str, endpoint: &str, description: &str, parameters: &[&str]) -> Self {
        Self {
            method: method.to_string(),
            endpoint: endpoint.to_string(),
            description: description.to_string(),
            parameters: parameters.iter().map(|p| Value::from(*p)).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExample {
    #[serde(default = "default_example_language")]
    pub language: String,
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub description: String,
}

/// Structured data extracted from one documentation page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiPattern {
    #[serde(default)]
    pub api_endpoints: Vec<ApiEndpoint>,
    #[serde(default)]
    pub code_examples: Vec<CodeExample>,
    #[serde(default)]
    pub usage_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiPatterns {
    pub api_patterns: Vec<ApiPattern>,
    pub extraction_count: usize,
    pub provider: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedDoc {
    pub url: String,
    pub content: String,
    #[serde(rename = "type")]
    pub doc_type: String,
    #[serde(default)]
    pub word_count: usize,
    /// Endpoints known from the page itself (fallback documentation only)
    #[serde(default)]
    pub api_endpoints: Vec<ApiEndpoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrapedDocumentation {
    pub docs: Vec<ScrapedDoc>,
    pub total_urls: usize,
    pub successful_scrapes: usize,
    pub provider: String,
}

/// One generated client implementation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Implementation {
    pub id: usize,
    pub name: String,
    pub approach: String,
    pub complexity: String,
    pub code: String,
    pub language: String,
    pub description: String,
    pub feature_type: String,
    pub features: Vec<String>,
}

/// Something worth implementing, found in the docs or the requirements.
#[derive(Debug, Clone)]
enum Feature {
    Endpoint(ApiEndpoint),
    Example(CodeExample),
    Pattern(String),
    Streaming,
    Auth,
    Webhook,
}

impl Feature {
    fn kind(&self) -> &'static str {
        match self {
            Feature::Endpoint(_) => "endpoint",
            Feature::Example(_) => "example",
            Feature::Pattern(_) => "pattern",
            Feature::Streaming => "streaming",
            Feature::Auth => "auth",
            Feature::Webhook => "webhook",
        }
    }

    fn name(&self) -> String {
        match self {
            Feature::Endpoint(e) => format!("{} {}", e.method, e.endpoint),
            Feature::Example(e) => format!(
                "Code Example - {}",
                non_empty(&e.description, "Implementation")
            ),
            Feature::Pattern(p) => format!("Usage Pattern - {}", p),
            Feature::Streaming => "Streaming API Implementation".to_string(),
            Feature::Auth => "Authentication Implementation".to_string(),
            Feature::Webhook => "Webhook Handler Implementation".to_string(),
        }
    }

    fn description(&self) -> String {
        match self {
            Feature::Endpoint(e) => non_empty(&e.description, "API endpoint").to_string(),
            Feature::Example(e) => non_empty(&e.description, "Code implementation example").to_string(),
            Feature::Pattern(p) => p.clone(),
            Feature::Streaming => "Implementation for streaming/infinite responses".to_string(),
            Feature::Auth => "Authentication and authorization handling".to_string(),
            Feature::Webhook => "Webhook endpoint and event handling".to_string(),
        }
    }
}

fn non_empty<'a>(value: &'a str, default: &'a str) -> &'a str {
    if value.is_empty() {
        default
    } else {
        value
    }
}

fn variant_features(complexity: &str) -> Vec<String> {
    let features: &[&str] = match complexity {
        "Simple" => &["Basic API calls", "Error handling", "JSON parsing"],
        "Moderate" => &["Wrapper classes", "Helper methods", "Configuration"],
        "Advanced" => &["Async/await", "Retry logic", "Type safety", "Timeout handling"],
        "Enterprise" | "Production" => &["Rate limiting", "Logging", "Monitoring", "Circuit breaker", "Metrics"],
        _ => &["Basic implementation"],
    };
    features.iter().map(|f| f.to_string()).collect()
}

pub struct DocsService {
    config: DocsConfig,
    client: Client,
}

impl DocsService {
    pub fn new(config: DocsConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Scrape each URL (up to `max_urls`) as markdown.
    pub async fn scrape_documentation(&self, urls: &[String]) -> ScrapedDocumentation {
        let Some(api_key) = self.config.api_key.as_deref() else {
            info!("FIRECRAWL_API_KEY not set, using fallback documentation");
            return fallback_documentation(urls);
        };

        info!("Scraping documentation from {} URLs", urls.len());
        let mut docs = Vec::new();
        for url in urls.iter().take(self.config.max_urls) {
            match self.scrape(api_key, url).await {
                Ok(doc) => docs.push(doc),
                Err(e) => warn!("Firecrawl scrape failed for {}: {:#}", url, e),
            }
        }

        ScrapedDocumentation {
            successful_scrapes: docs.len(),
            docs,
            total_urls: urls.len(),
            provider: "Firecrawl".to_string(),
        }
    }

    async fn scrape(&self, api_key: &str, url: &str) -> Result<ScrapedDoc> {
        let response = self
            .client
            .post(self.endpoint("/v1/scrape"))
            .bearer_auth(api_key)
            .json(&json!({
                "url": url,
                "formats": ["markdown"],
                "onlyMainContent": true,
                "waitFor": 2000,
                "timeout": 30000
            }))
            .send()
            .await
            .context("Failed to send Firecrawl scrape request")?;

        let body = checked_json(response, "scrape").await?;
        let content = body["data"]["markdown"]
            .as_str()
            .ok_or_else(|| anyhow!("Firecrawl scrape returned no markdown"))?
            .to_string();

        Ok(ScrapedDoc {
            url: url.to_string(),
            word_count: content.split_whitespace().count(),
            content,
            doc_type: "scraped".to_string(),
            api_endpoints: Vec::new(),
        })
    }

    /// Extract endpoints, examples and usage patterns from scraped docs.
    pub async fn extract_api_patterns(&self, docs: &ScrapedDocumentation) -> ApiPatterns {
        let Some(api_key) = self.config.api_key.as_deref() else {
            return fallback_api_patterns();
        };

        let mut patterns = Vec::new();
        for doc in &docs.docs {
            match self.extract(api_key, &doc.url).await {
                Ok(pattern) => patterns.push(pattern),
                Err(e) => {
                    warn!("API pattern extraction error: {:#}", e);
                    return fallback_api_patterns();
                }
            }
        }

        ApiPatterns {
            extraction_count: patterns.len(),
            api_patterns: patterns,
            provider: "Firecrawl Extract".to_string(),
        }
    }

    async fn extract(&self, api_key: &str, url: &str) -> Result<ApiPattern> {
        let response = self
            .client
            .post(self.endpoint("/v1/extract"))
            .bearer_auth(api_key)
            .json(&json!({
                "urls": [url],
                "prompt": "Extract API endpoints, code examples, function signatures, and usage patterns. Focus on practical implementation details.",
                "systemPrompt": "You are an expert developer extracting API documentation. Focus on actionable code patterns, endpoints, parameters, and examples.",
                "schema": extract_schema()
            }))
            .send()
            .await
            .context("Failed to send Firecrawl extract request")?;

        let mut body = checked_json(response, "extract").await?;

        // Extraction may run as a job that has to be polled.
        if body.get("data").map_or(true, Value::is_null) {
            let id = body["id"]
                .as_str()
                .ok_or_else(|| anyhow!("Firecrawl extract returned neither data nor job id"))?
                .to_string();
            body = self.poll_extract(api_key, &id).await?;
        }

        serde_json::from_value(body["data"].clone()).context("Unexpected extract payload")
    }

    async fn poll_extract(&self, api_key: &str, id: &str) -> Result<Value> {
        for _ in 0..EXTRACT_POLL_ATTEMPTS {
            tokio::time::sleep(Duration::from_secs(1)).await;
            let response = self
                .client
                .get(self.endpoint(&format!("/v1/extract/{}", id)))
                .bearer_auth(api_key)
                .send()
                .await
                .context("Failed to poll Firecrawl extract job")?;
            let body = checked_json(response, "extract status").await?;
            match body["status"].as_str() {
                Some("completed") => return Ok(body),
                Some("failed") | Some("cancelled") => {
                    return Err(anyhow!("Firecrawl extract job {} did not complete", id))
                }
                _ => continue,
            }
        }
        Err(anyhow!("Firecrawl extract job {} timed out", id))
    }
}

async fn checked_json(response: reqwest::Response, operation: &str) -> Result<Value> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(anyhow!("Firecrawl {} error ({}): {}", operation, status, body));
    }
    response
        .json()
        .await
        .with_context(|| format!("Failed to parse Firecrawl {} response", operation))
}

fn extract_schema() -> Value {
    json!({
        "type": "object",
        "properties": {
            "api_endpoints": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "method": {"type": "string"},
                        "endpoint": {"type": "string"},
                        "description": {"type": "string"},
                        "parameters": {"type": "array"}
                    }
                }
            },
            "code_examples": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "language": {"type": "string"},
                        "code": {"type": "string"},
                        "description": {"type": "string"}
                    }
                }
            },
            "usage_patterns": {"type": "array", "items": {"type": "string"}}
        }
    })
}

fn collect_features(patterns: &ApiPatterns, docs: &ScrapedDocumentation, requirements: &str) -> Vec<Feature> {
    let mut features = Vec::new();

    for pattern in &patterns.api_patterns {
        features.extend(pattern.api_endpoints.iter().cloned().map(Feature::Endpoint));
        features.extend(pattern.code_examples.iter().cloned().map(Feature::Example));
        features.extend(pattern.usage_patterns.iter().cloned().map(Feature::Pattern));
    }
    for doc in &docs.docs {
        features.extend(doc.api_endpoints.iter().cloned().map(Feature::Endpoint));
    }

    if features.is_empty() {
        let requirements = requirements.to_lowercase();
        if requirements.contains("stream") || requirements.contains("infinite") {
            features.push(Feature::Streaming);
        }
        if requirements.contains("auth") || requirements.contains("login") {
            features.push(Feature::Auth);
        }
        if requirements.contains("webhook") {
            features.push(Feature::Webhook);
        }
    }

    features
}

fn render_feature(feature: &Feature, ctx: &TemplateContext) -> String {
    match feature {
        Feature::Endpoint(e) => doc_templates::endpoint(ctx, &e.method, &e.endpoint, &feature.description()),
        Feature::Streaming => doc_templates::streaming(ctx),
        Feature::Auth => doc_templates::auth(ctx),
        Feature::Webhook => doc_templates::webhook(ctx),
        Feature::Example(e) => doc_templates::from_example(ctx, &e.code),
        Feature::Pattern(_) => doc_templates::general(ctx),
    }
}

/// Simple, Advanced and Production implementations per feature, at most ten.
///
/// Without any feature three general client strategies are rendered instead.
pub fn generate_implementation_variants(
    patterns: &ApiPatterns,
    docs: &ScrapedDocumentation,
    requirements: &str,
    language: &str,
) -> Vec<Implementation> {
    let mut implementations = Vec::new();

    for feature in collect_features(patterns, docs, requirements) {
        let feature_name = feature.name();
        let description = feature.description();
        for complexity in ["Simple", "Advanced", "Production"] {
            if implementations.len() == MAX_IMPLEMENTATIONS {
                return implementations;
            }
            let id = implementations.len() + 1;
            let name = format!("{} - {}", feature_name, complexity);
            let approach = format!("{} implementation of {}", complexity, description);
            let ctx = TemplateContext {
                name: &name,
                approach: &approach,
                complexity,
                variant_id: id,
                language,
                requirements,
            };
            implementations.push(Implementation {
                id,
                code: render_feature(&feature, &ctx),
                name,
                approach,
                complexity: complexity.to_string(),
                language: language.to_string(),
                description: description.clone(),
                feature_type: feature.kind().to_string(),
                features: variant_features(complexity),
            });
        }
    }

    if implementations.is_empty() {
        let strategies = [
            ("Basic API Client", "Simple HTTP client with basic functionality", "Simple"),
            ("Advanced SDK Wrapper", "Full-featured SDK with error handling and validation", "Advanced"),
            ("Production Client", "Enterprise-ready client with monitoring and resilience", "Enterprise"),
        ];
        for (i, (name, approach, complexity)) in strategies.into_iter().enumerate() {
            let ctx = TemplateContext {
                name,
                approach,
                complexity,
                variant_id: i + 1,
                language,
                requirements,
            };
            implementations.push(Implementation {
                id: i + 1,
                name: name.to_string(),
                approach: approach.to_string(),
                complexity: complexity.to_string(),
                code: doc_templates::general(&ctx),
                language: language.to_string(),
                description: format!("Generated based on: {}", requirements),
                feature_type: "general".to_string(),
                features: variant_features(complexity),
            });
        }
    }

    implementations
}

/// Documentation synthesized from the URL alone.
pub fn fallback_documentation(urls: &[String]) -> ScrapedDocumentation {
    let docs: Vec<ScrapedDoc> = urls.iter().map(|url| fallback_doc(url)).collect();
    ScrapedDocumentation {
        total_urls: urls.len(),
        successful_scrapes: docs.len(),
        docs,
        provider: "Fallback Documentation".to_string(),
    }
}

fn fallback_doc(url: &str) -> ScrapedDoc {
    let (content, doc_type, api_endpoints) = if url.contains("runcaptain.com") {
        if url.contains("infinite-responses") {
            (
                CAPTAIN_STREAMING_DOC.to_string(),
                "captain_infinite_responses",
                streaming_endpoints(),
            )
        } else {
            (
                CAPTAIN_GENERAL_DOC.to_string(),
                "captain_general",
                vec![
                    ApiEndpoint::new("POST", "/analyze", "Analyze code or content", &["content", "type"]),
                    ApiEndpoint::new("POST", "/generate", "Generate content", &["prompt", "type"]),
                ],
            )
        }
    } else if url.contains("docs.") || url.contains("api.") {
        let base = url.split("/docs").next().unwrap_or(url);
        (
            format!(
                "# API Documentation for {}\n\n## Base URL\n{}\n\n## Authentication\n\
                 API key required in Authorization header.\n\n## Common Patterns\n\
                 - REST API with JSON request/response\n- Standard HTTP status codes\n\
                 - Rate limiting applied\n",
                url, base
            ),
            "generic_api_docs",
            vec![
                ApiEndpoint::new("GET", "/api/v1/resource", "Get resource data", &["id", "limit", "offset"]),
                ApiEndpoint::new("POST", "/api/v1/resource", "Create new resource", &["data"]),
            ],
        )
    } else {
        (
            format!("Generic API documentation content for {}", url),
            "generic_api",
            Vec::new(),
        )
    };

    ScrapedDoc {
        url: url.to_string(),
        word_count: content.split_whitespace().count(),
        content,
        doc_type: doc_type.to_string(),
        api_endpoints,
    }
}

fn streaming_endpoints() -> Vec<ApiEndpoint> {
    vec![
        ApiEndpoint::new("POST", "/infinite-responses", "Start streaming infinite responses", &["prompt", "stream", "max_tokens", "temperature"]),
        ApiEndpoint::new("GET", "/infinite-responses/{id}", "Get streaming session status", &["id"]),
        ApiEndpoint::new("DELETE", "/infinite-responses/{id}", "Stop streaming session", &["id"]),
    ]
}

/// Built-in streaming API patterns used when extraction is unavailable.
pub fn fallback_api_patterns() -> ApiPatterns {
    ApiPatterns {
        api_patterns: vec![ApiPattern {
            api_endpoints: streaming_endpoints(),
            code_examples: vec![CodeExample {
                language: "javascript".to_string(),
                code: STREAMING_EXAMPLE.to_string(),
                description: "Stream infinite responses with fetch API".to_string(),
            }],
            usage_patterns: vec![
                "Streaming API responses".to_string(),
                "Real-time content generation".to_string(),
                "WebSocket-like behavior over HTTP".to_string(),
                "Server-sent events pattern".to_string(),
            ],
        }],
        extraction_count: 1,
        provider: "Fallback Pattern Service".to_string(),
    }
}

const CAPTAIN_STREAMING_DOC: &str = r#"# Captain Infinite Responses API

## Overview
The Captain Infinite Responses API streams continuous AI-generated content.

## Endpoints
- POST /infinite-responses - Start an infinite response stream
- GET /infinite-responses/{id} - Get status of a streaming session
- DELETE /infinite-responses/{id} - Stop a streaming session

## Request Format
```json
{"prompt": "Your prompt here", "stream": true, "max_tokens": 1000, "temperature": 0.7}
```

## Response Format
```json
{"type": "chunk", "data": "Generated content chunk"}
{"type": "complete", "data": {"total_tokens": 500}}
```

## Authentication
Authorization: Bearer your-api-key

## Rate Limits
- 100 requests per minute
- 10 concurrent streams per API key
"#;

const CAPTAIN_GENERAL_DOC: &str = r#"# Captain API Documentation

## Base URL
https://api.runcaptain.com

## Authentication
All requests require an API key in the Authorization header.

## Common Endpoints
- POST /analyze - Analyze code or content
- POST /generate - Generate content
- GET /status - Check API status
"#;

const STREAMING_EXAMPLE: &str = r#"const response = await fetch('/api/infinite-responses', {
    method: 'POST',
    headers: {
        'Content-Type': 'application/json',
        'Authorization': 'Bearer your-api-key'
    },
    body: JSON.stringify({ prompt: 'Generate content', stream: true, max_tokens: 1000 })
});

const reader = response.body.getReader();
while (true) {
    const { done, value } = await reader.read();
    if (done) break;
    console.log('Received:', JSON.parse(new TextDecoder().decode(value)));
}"#;
