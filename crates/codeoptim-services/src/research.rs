//! Optimization research through the Exa search API.
//!
//! Without an API key, or when every search fails, findings come from a
//! small built-in knowledge base instead.

use anyhow::{anyhow, Context, Result};
use codeoptim_core::{ResearchConfig, ResearchFindings, ResearchSource};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

pub const FALLBACK_SOURCE: &str = "fallback_knowledge_base";

const BASE_TECHNIQUES: [&str; 3] = [
    "Algorithmic optimization",
    "Data structure improvements",
    "Memory access patterns",
];

const COMMON_PATTERNS: [&str; 6] = [
    "Loop unrolling",
    "Vectorization",
    "Caching strategies",
    "Memory pooling",
    "Branch prediction optimization",
    "Parallel processing",
];

const GENERIC_TECHNIQUES: [&str; 4] = [
    "General algorithmic optimization",
    "Data structure improvements",
    "Memory access pattern optimization",
    "Loop optimization techniques",
];

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SearchRequest<'a> {
    query: &'a str,
    num_results: usize,
    contents: SearchContents,
}

#[derive(Debug, Serialize)]
struct SearchContents {
    summary: bool,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<SearchHit>,
}

#[derive(Debug, Deserialize)]
struct SearchHit {
    #[serde(default)]
    title: Option<String>,
    url: String,
    #[serde(default)]
    score: Option<f64>,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    text: Option<String>,
}

struct QueryOutcome {
    query: String,
    sources: Vec<ResearchSource>,
}

pub struct ResearchService {
    config: ResearchConfig,
    client: Client,
}

impl ResearchService {
    pub fn new(config: ResearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { config, client })
    }

    pub fn is_configured(&self) -> bool {
        self.config.api_key.is_some()
    }

    /// Gather optimization techniques for `language` and `target`.
    pub async fn research_optimizations(
        &self,
        language: &str,
        target: &str,
        patterns: &[String],
    ) -> ResearchFindings {
        let Some(api_key) = self.config.api_key.as_deref() else {
            info!("EXA_API_KEY not set, using fallback research");
            return fallback_research(language, target, patterns);
        };

        let mut outcomes = Vec::new();
        for query in search_queries(language, target, patterns)
            .into_iter()
            .take(self.config.max_queries)
        {
            match self.search(api_key, &query).await {
                Ok(sources) => outcomes.push(QueryOutcome { query, sources }),
                Err(e) => warn!("Exa search failed for query '{}': {:#}", query, e),
            }
        }

        if outcomes.is_empty() {
            warn!("All Exa searches failed, using fallback research");
            return fallback_research(language, target, patterns);
        }

        compile_research(outcomes, language, target)
    }

    async fn search(&self, api_key: &str, query: &str) -> Result<Vec<ResearchSource>> {
        let response = self
            .client
            .post(format!("{}/search", self.config.base_url.trim_end_matches('/')))
            .header("x-api-key", api_key)
            .json(&SearchRequest {
                query,
                num_results: self.config.results_per_query,
                contents: SearchContents { summary: true },
            })
            .send()
            .await
            .context("Failed to send Exa search request")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!("Exa API error ({}): {}", status, body));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .context("Failed to parse Exa search response")?;

        Ok(parsed
            .results
            .into_iter()
            .map(|hit| {
                let summary = hit
                    .summary
                    .or_else(|| hit.text.map(|t| t.chars().take(300).collect()))
                    .unwrap_or_default();
                ResearchSource {
                    title: hit.title.unwrap_or_else(|| hit.url.clone()),
                    url: hit.url,
                    summary,
                    relevance_score: hit.score.unwrap_or(0.0),
                }
            })
            .collect())
    }
}

/// Three base queries plus one per leading pattern (at most two).
pub fn search_queries(language: &str, target: &str, patterns: &[String]) -> Vec<String> {
    let target = target.to_lowercase();
    let mut queries = vec![
        format!("{} {} optimization techniques", language, target),
        format!("fast {} algorithms {}", language, target),
        format!("{} performance improvement best practices", language),
    ];
    for pattern in patterns.iter().take(2) {
        queries.push(format!("{} {} optimization examples", language, pattern));
    }
    queries
}

fn compile_research(outcomes: Vec<QueryOutcome>, language: &str, target: &str) -> ResearchFindings {
    let mut techniques: Vec<String> = Vec::new();
    let mut sources = Vec::new();
    let mut queries = Vec::new();

    for outcome in outcomes {
        let found = outcome
            .sources
            .iter()
            .map(|s| s.title.clone())
            .chain(BASE_TECHNIQUES.iter().map(|t| t.to_string()));
        for technique in found {
            if !techniques.contains(&technique) {
                techniques.push(technique);
            }
        }
        sources.extend(outcome.sources);
        queries.push(outcome.query);
    }

    techniques.truncate(10);
    sources.truncate(5);

    ResearchFindings {
        language: language.to_string(),
        target: target.to_string(),
        optimization_techniques: techniques,
        research_sources: sources,
        patterns_discovered: COMMON_PATTERNS.iter().map(|p| p.to_string()).collect(),
        confidence_score: 0.8,
        source: Some("exa".to_string()),
        search_queries_used: queries,
    }
}

fn knowledge_base(language: &str, target: &str) -> Option<&'static [&'static str]> {
    let target_key = target.to_lowercase().replace(' ', "").replace("usage", "");
    let techniques: &'static [&'static str] = match (language.to_lowercase().as_str(), target_key.as_str()) {
        ("javascript", "performance") => &[
            "Use efficient array methods (map, filter vs for loops)",
            "Implement object pooling for frequent allocations",
            "Use Web Workers for CPU-intensive tasks",
            "Optimize DOM manipulation with batch updates",
            "Use requestAnimationFrame for smooth animations",
        ],
        ("javascript", "memory") => &[
            "Implement proper garbage collection patterns",
            "Use WeakMap and WeakSet for cache management",
            "Avoid memory leaks in closures",
            "Use typed arrays for numerical data",
        ],
        ("python", "performance") => &[
            "Use list comprehensions instead of loops",
            "Implement generators for memory efficiency",
            "Use NumPy for numerical computations",
            "Cache expensive function calls with functools.lru_cache",
            "Use collections.deque for queue operations",
        ],
        ("python", "memory") => &[
            "Use __slots__ to reduce memory overhead",
            "Implement context managers for resource management",
            "Use generators instead of lists when possible",
            "Profile memory usage with memory_profiler",
        ],
        _ => return None,
    };
    Some(techniques)
}

/// Findings from the built-in knowledge base.
pub fn fallback_research(language: &str, target: &str, patterns: &[String]) -> ResearchFindings {
    let techniques = knowledge_base(language, target).unwrap_or(&GENERIC_TECHNIQUES);

    let mut patterns_discovered = patterns.to_vec();
    patterns_discovered.extend(
        ["Caching", "Vectorization", "Parallelization"]
            .iter()
            .map(|p| p.to_string()),
    );

    ResearchFindings {
        language: language.to_string(),
        target: target.to_string(),
        optimization_techniques: techniques.iter().map(|t| t.to_string()).collect(),
        research_sources: Vec::new(),
        patterns_discovered,
        confidence_score: 0.6,
        source: Some(FALLBACK_SOURCE.to_string()),
        search_queries_used: vec![format!("{} {} optimization", language, target)],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{extract::State, http::HeaderMap, routing::post, Json, Router};
    use serde_json::{json, Value};
    use std::sync::{Arc, Mutex};

    async fn spawn_exa(fail_first: bool) -> (String, Arc<Mutex<Vec<Value>>>) {
        let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
        let app = Router::new()
            .route(
                "/search",
                post(
                    move |State(seen): State<Arc<Mutex<Vec<Value>>>>,
                          headers: HeaderMap,
                          Json(body): Json<Value>| async move {
                        assert_eq!(headers["x-api-key"], "exa-key");
                        let count = {
                            let mut seen = seen.lock().unwrap();
                            seen.push(body.clone());
                            seen.len()
                        };
                        if fail_first && count == 1 {
                            return (axum::http::StatusCode::BAD_GATEWAY, Json(json!({})));
                        }
                        let query = body["query"].as_str().unwrap_or_default().to_string();
                        (
                            axum::http::StatusCode::OK,
                            Json(json!({
                                "results": [{
                                    "title": format!("Guide: {}", query),
                                    "url": format!("https://example.org/{}", count),
                                    "score": 0.9,
                                    "summary": "useful"
                                }]
                            })),
                        )
                    },
                ),
            )
            .with_state(seen.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), seen)
    }

    fn service(base_url: String, api_key: Option<&str>) -> ResearchService {
        ResearchService::new(ResearchConfig {
            base_url,
            api_key: api_key.map(str::to_string),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn queries_include_two_patterns_at_most() {
        let patterns = vec!["Caching".to_string(), "Sorting".to_string(), "Greedy".to_string()];
        let queries = search_queries("python", "Performance", &patterns);
        assert_eq!(queries.len(), 5);
        assert_eq!(queries[0], "python performance optimization techniques");
        assert_eq!(queries[4], "python Sorting optimization examples");
    }

    #[test]
    fn fallback_normalizes_target() {
        let findings = fallback_research("Python", "Memory Usage", &["Caching".to_string()]);
        assert_eq!(findings.optimization_techniques[0], "Use __slots__ to reduce memory overhead");
        assert_eq!(findings.patterns_discovered, vec!["Caching", "Caching", "Vectorization", "Parallelization"]);
        assert_eq!(findings.confidence_score, 0.6);
        assert_eq!(findings.source.as_deref(), Some(FALLBACK_SOURCE));
    }

    #[test]
    fn unknown_language_gets_generic_techniques() {
        let findings = fallback_research("cobol", "Security", &[]);
        assert_eq!(findings.optimization_techniques.len(), 4);
        assert_eq!(findings.search_queries_used, vec!["cobol Security optimization"]);
    }

    #[tokio::test]
    async fn no_key_uses_fallback() {
        let findings = service("http://127.0.0.1:1".to_string(), None)
            .research_optimizations("javascript", "Performance", &[])
            .await;
        assert_eq!(findings.source.as_deref(), Some(FALLBACK_SOURCE));
    }

    #[tokio::test]
    async fn failed_queries_are_skipped() {
        let (url, seen) = spawn_exa(true).await;
        let findings = service(url, Some("exa-key"))
            .research_optimizations("python", "Performance", &["Caching".to_string()])
            .await;

        assert_eq!(seen.lock().unwrap().len(), 3);
        assert_eq!(seen.lock().unwrap()[0]["numResults"], 3);
        assert_eq!(findings.search_queries_used.len(), 2);
        assert_eq!(findings.research_sources.len(), 2);
        assert_eq!(findings.confidence_score, 0.8);
        assert_eq!(findings.patterns_discovered.len(), 6);
        assert!(findings
            .optimization_techniques
            .contains(&"Algorithmic optimization".to_string()));
    }

    #[tokio::test]
    async fn unreachable_service_falls_back() {
        let findings = service("http://127.0.0.1:1".to_string(), Some("exa-key"))
            .research_optimizations("python", "Performance", &[])
            .await;
        assert_eq!(findings.source.as_deref(), Some(FALLBACK_SOURCE));
    }
}
