//! Captain-backed code analysis.
//!
//! The analysis model receives the whole code plus a requirements brief in
//! `extra_body.captain.context` and is offered three functions. Function
//! call arguments become the structured part of [`CodeAnalysis`]; the plain
//! text answer feeds keyword extraction whenever a function was not used.

use crate::llm_provider::*;
use chrono::Utc;
use codeoptim_core::{
    BottleneckReport, CaptainConfig, CodeAnalysis, ComplexityReport, StructuredAnalysis,
    SuggestionReport,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const COMPLEXITY_TOOL: &str = "analyze_algorithm_complexity";
pub const BOTTLENECK_TOOL: &str = "identify_bottlenecks";
pub const SUGGESTION_TOOL: &str = "suggest_optimizations";

const DEFAULT_COMPLEXITY: &str = "O(n) - Linear complexity (estimated)";
const TOOL_ONLY_ANALYSIS: &str = "Analysis completed using Captain's tool calling capabilities";

const BOTTLENECK_KEYWORDS: &[&str] = &[
    "bottleneck",
    "slow",
    "inefficient",
    "redundant",
    "unnecessary",
    "costly",
    "expensive",
    "loop",
    "nested",
];

const PATTERN_KEYWORDS: &[&str] = &[
    "caching",
    "memoization",
    "dynamic programming",
    "greedy",
    "divide and conquer",
    "two pointers",
    "sliding window",
    "hash map",
    "binary search",
    "sorting",
    "indexing",
];

const SUGGESTION_KEYWORDS: &[&str] = &[
    "suggest",
    "recommend",
    "improve",
    "optimize",
    "replace",
    "use instead",
    "consider",
    "better approach",
];

/// Holistic analysis of several files at once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodebaseAnalysis {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub codebase_analysis: Option<String>,
    pub files_analyzed: usize,
    pub total_lines: usize,
    pub optimization_target: String,
    pub analysis_timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

pub struct CodeAnalyzer {
    provider: Option<Arc<dyn LLMProvider>>,
    temperature: f32,
    max_tokens: usize,
}

impl CodeAnalyzer {
    pub fn new(provider: Option<Arc<dyn LLMProvider>>, config: &CaptainConfig) -> Self {
        Self {
            provider,
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Analyze one piece of code. Never fails: errors land in `CodeAnalysis::error`.
    pub async fn analyze_code(&self, code: &str, language: &str, target: &str) -> CodeAnalysis {
        let Some(provider) = &self.provider else {
            return CodeAnalysis::failed(language, target, "Captain API key not configured");
        };

        let messages = vec![
            Message::system(
                "You are Captain's advanced code analysis engine with unlimited context processing and tool calling capabilities.\n\n\
                 You MUST use the provided tools to structure your analysis:\n\
                 1. Use analyze_algorithm_complexity for mathematical complexity analysis\n\
                 2. Use identify_bottlenecks to categorize performance issues\n\
                 3. Use suggest_optimizations to provide actionable improvement strategies\n\n\
                 Your analysis drives automated generation of optimized code variants. \
                 Provide precise, quantitative analysis.",
            ),
            Message::user(format!(
                "Analyze this {} code for {} optimization using your unlimited context capabilities.\n\n\
                 Use ALL provided tools to structure your analysis:\n\
                 1. First analyze complexity with mathematical precision\n\
                 2. Then identify specific bottlenecks with severity ratings\n\
                 3. Finally suggest concrete optimizations with speed estimates",
                language,
                target.to_lowercase()
            )),
        ];

        let config = GenerationConfig {
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            tools: analysis_tools(),
            extra_body: Some(json!({
                "captain": {
                    "context": build_analysis_context(code, language, target),
                    "data_lake": {
                        "enabled": true,
                        "context_size": "unlimited",
                        "analysis_depth": "comprehensive"
                    },
                    "processing_mode": "advanced_analysis_with_tools",
                    "optimization_focus": target.to_lowercase(),
                    "tool_calling_enabled": true
                }
            })),
        };

        let response = match provider.generate_chat(&messages, &config).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Captain analysis error: {:#}", e);
                return CodeAnalysis::failed(language, target, format!("{:#}", e));
            }
        };

        let mut tool_results: HashMap<String, Value> = HashMap::new();
        for call in &response.tool_calls {
            match serde_json::from_str::<Value>(&call.arguments) {
                Ok(args) => {
                    debug!("Captain tool called: {}", call.name);
                    tool_results.insert(call.name.clone(), args);
                }
                Err(e) => warn!("Ignoring malformed {} arguments: {}", call.name, e),
            }
        }

        let structured = structured_from_tools(&tool_results);
        let text = if response.content.trim().is_empty() {
            TOOL_ONLY_ANALYSIS.to_string()
        } else {
            response.content
        };

        let mut features_used = vec![
            "unlimited_context_processing".to_string(),
            "advanced_code_analysis".to_string(),
        ];
        if structured.tool_calling_used {
            features_used.push("tool_calling_for_structured_data".to_string());
            features_used.push("mathematical_complexity_analysis".to_string());
        }

        info!(
            language,
            tools = tool_results.len(),
            "Captain analysis completed"
        );

        CodeAnalysis {
            language: language.to_string(),
            target: target.to_string(),
            features_used,
            complexity: extract_complexity(&structured, &text),
            bottlenecks: extract_bottlenecks(&structured, &text),
            patterns: extract_patterns(&text),
            suggestions: extract_suggestions(&structured, &text),
            raw_analysis: text,
            structured_analysis: structured,
            tool_results,
            error: None,
        }
    }

    /// Analyze several files together for system-wide recommendations.
    ///
    /// `files` is a list of `(path, content)` pairs, kept in the given order.
    pub async fn analyze_codebase(
        &self,
        files: &[(String, String)],
        target: &str,
    ) -> CodebaseAnalysis {
        let total_lines: usize = files.iter().map(|(_, content)| line_count(content)).sum();
        let mut result = CodebaseAnalysis {
            codebase_analysis: None,
            files_analyzed: files.len(),
            total_lines,
            optimization_target: target.to_string(),
            analysis_timestamp: Utc::now().to_rfc3339(),
            error: None,
        };

        let Some(provider) = &self.provider else {
            result.error = Some("Captain API key not configured".to_string());
            return result;
        };

        let messages = vec![
            Message::system(
                "You are Captain's enterprise codebase analyzer with unlimited context processing. \
                 Analyze the entire codebase holistically and provide system-wide optimization recommendations.",
            ),
            Message::user(format!(
                "Analyze this complete codebase for {} optimization. Provide comprehensive, system-wide recommendations.",
                target
            )),
        ];

        let config = GenerationConfig {
            temperature: self.temperature,
            max_tokens: Some(self.max_tokens),
            tools: Vec::new(),
            extra_body: Some(json!({
                "captain": {
                    "context": build_codebase_context(files, total_lines, target),
                    "data_lake": {
                        "enabled": true,
                        "context_size": "unlimited",
                        "analysis_depth": "enterprise"
                    },
                    "processing_mode": "codebase_analysis"
                }
            })),
        };

        match provider.generate_chat(&messages, &config).await {
            Ok(response) => result.codebase_analysis = Some(response.content),
            Err(e) => {
                warn!("Captain codebase analysis error: {:#}", e);
                result.error = Some(format!("{:#}", e));
            }
        }

        result
    }
}

fn line_count(content: &str) -> usize {
    content.split('\n').count()
}

/// Function schemas offered to the analysis model.
pub fn analysis_tools() -> Vec<ToolDefinition> {
    vec![
        ToolDefinition {
            name: COMPLEXITY_TOOL.to_string(),
            description: "Analyze algorithmic complexity with mathematical precision".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "time_complexity": {"type": "string", "description": "Big O time complexity"},
                    "space_complexity": {"type": "string", "description": "Big O space complexity"},
                    "worst_case_scenario": {"type": "string", "description": "Worst case input description"},
                    "optimization_potential": {
                        "type": "number", "minimum": 0, "maximum": 100,
                        "description": "Optimization potential percentage"
                    }
                },
                "required": ["time_complexity", "space_complexity", "optimization_potential"]
            }),
            strict: true,
        },
        ToolDefinition {
            name: BOTTLENECK_TOOL.to_string(),
            description: "Identify specific performance bottlenecks in code".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "bottlenecks": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "type": {"type": "string", "enum": ["loop", "memory", "io", "algorithm", "data_structure"]},
                                "description": {"type": "string"},
                                "severity": {"type": "string", "enum": ["critical", "high", "medium", "low"]},
                                "impact_estimate": {"type": "number", "minimum": 0, "maximum": 100}
                            },
                            "required": ["type", "description", "severity", "impact_estimate"]
                        }
                    }
                },
                "required": ["bottlenecks"]
            }),
            strict: true,
        },
        ToolDefinition {
            name: SUGGESTION_TOOL.to_string(),
            description: "Provide specific optimization recommendations with implementation details"
                .to_string(),
            parameters: json!({
                "type": "object",
                "properties": {
                    "optimizations": {
                        "type": "array",
                        "items": {
                            "type": "object",
                            "properties": {
                                "technique": {"type": "string"},
                                "description": {"type": "string"},
                                "complexity_improvement": {"type": "string"},
                                "estimated_speedup": {"type": "number", "minimum": 1},
                                "implementation_difficulty": {"type": "string", "enum": ["easy", "medium", "hard"]},
                                "code_example": {"type": "string"}
                            },
                            "required": ["technique", "description", "estimated_speedup", "implementation_difficulty"]
                        }
                    }
                },
                "required": ["optimizations"]
            }),
            strict: true,
        },
    ]
}

fn build_analysis_context(code: &str, language: &str, target: &str) -> String {
    format!(
        "COMPREHENSIVE CODEBASE ANALYSIS REQUEST\n\
         ======================================\n\n\
         METADATA:\n\
         - Language: {language}\n\
         - Optimization Target: {target}\n\
         - Code Size: {size} characters\n\
         - Analysis Timestamp: {timestamp}\n\n\
         ORIGINAL CODE TO ANALYZE:\n\
         ```{language}\n{code}\n```\n\n\
         DEEP ANALYSIS REQUIREMENTS:\n\n\
         1. ALGORITHMIC COMPLEXITY ANALYSIS\n\
         \x20  - Time complexity (Big O notation) with mathematical proof\n\
         \x20  - Space complexity analysis including auxiliary space\n\
         \x20  - Nested loops, recursive patterns and their impact\n\
         \x20  - Memory access patterns and cache efficiency\n\
         \x20  - Worst-case, average-case and best-case scenarios\n\n\
         2. PERFORMANCE BOTTLENECK DETECTION\n\
         \x20  - CPU-intensive operations and computational hotspots\n\
         \x20  - Memory allocation/deallocation patterns\n\
         \x20  - I/O operations and blocking calls\n\
         \x20  - Inefficient data structure usage\n\
         \x20  - Redundant computations and unnecessary work\n\n\
         3. OPTIMIZATION PATTERN IDENTIFICATION\n\
         \x20  - Dynamic programming and memoization opportunities\n\
         \x20  - Two-pointer and sliding window applications\n\
         \x20  - Hash map vs array trade-offs\n\
         \x20  - Greedy and divide-and-conquer decompositions\n\
         \x20  - Parallel processing potential\n\n\
         4. LANGUAGE-SPECIFIC OPTIMIZATIONS\n\
         \x20  - Built-in function efficiency vs custom implementations\n\
         \x20  - Compiler/interpreter optimization hints\n\
         \x20  - Memory management best practices\n\n\
         5. SECURITY & RELIABILITY ANALYSIS\n\
         \x20  - Memory leaks and unchecked input\n\
         \x20  - Error propagation and exception safety\n\
         \x20  - Race conditions in concurrent scenarios\n\n\
         6. SCALABILITY ASSESSMENT\n\
         \x20  - How performance degrades with input size\n\
         \x20  - Resource usage under load\n\
         \x20  - Bottlenecks that emerge at scale\n\n\
         7. REFACTORING OPPORTUNITIES\n\
         \x20  - Code structure improvements\n\
         \x20  - Design pattern applications\n\
         \x20  - Modularization possibilities\n\n\
         CONTEXT: This analysis drives automatic generation of multiple algorithmic \
         variants. Provide actionable, specific recommendations that can be applied \
         programmatically.\n\n\
         EXPECTED OUTPUT FORMAT:\n\
         - Structured analysis with clear sections\n\
         - Specific optimization recommendations with code examples\n\
         - Quantitative improvement estimates where possible\n\
         - Priority ranking of optimization opportunities\n",
        language = language,
        target = target,
        size = code.chars().count(),
        timestamp = Utc::now().to_rfc3339(),
        code = code,
    )
}

fn build_codebase_context(files: &[(String, String)], total_lines: usize, target: &str) -> String {
    let mut context = format!(
        "FULL CODEBASE ANALYSIS REQUEST\n\
         ============================\n\n\
         CODEBASE METADATA:\n\
         - Total Files: {}\n\
         - Total Lines: {}\n\
         - Optimization Target: {}\n\
         - Analysis Timestamp: {}\n\n\
         COMPLETE CODEBASE STRUCTURE:\n",
        files.len(),
        total_lines,
        target,
        Utc::now().to_rfc3339()
    );

    for (path, content) in files {
        context.push_str(&format!(
            "\nFILE: {}\n{}\n```\n{}\n```\n",
            path,
            "=".repeat(path.len() + 6),
            content
        ));
    }

    context.push_str(&format!(
        "\nCOMPREHENSIVE ANALYSIS REQUIREMENTS:\n\
         1. Cross-file dependency analysis and optimization opportunities\n\
         2. Architecture-level performance bottlenecks\n\
         3. Code duplication and refactoring opportunities\n\
         4. Security vulnerabilities across the entire codebase\n\
         5. Scalability issues that span multiple components\n\
         6. Integration optimization between modules\n\
         7. Overall system performance enhancement strategies\n\n\
         Focus on {} optimization across the entire system.\n",
        target
    ));

    context
}

fn structured_from_tools(tool_results: &HashMap<String, Value>) -> StructuredAnalysis {
    fn parse<T: serde::de::DeserializeOwned>(results: &HashMap<String, Value>, name: &str) -> Option<T> {
        let value = results.get(name)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                warn!("Unexpected {} payload: {}", name, e);
                None
            }
        }
    }

    StructuredAnalysis {
        complexity_analysis: parse::<ComplexityReport>(tool_results, COMPLEXITY_TOOL),
        bottleneck_analysis: parse::<BottleneckReport>(tool_results, BOTTLENECK_TOOL),
        optimization_suggestions: parse::<SuggestionReport>(tool_results, SUGGESTION_TOOL),
        tool_calling_used: !tool_results.is_empty(),
    }
}

/// Complexity summary from tool data, else the first matching text line.
pub fn extract_complexity(structured: &StructuredAnalysis, text: &str) -> String {
    if let Some(report) = &structured.complexity_analysis {
        if !report.time_complexity.is_empty() && !report.space_complexity.is_empty() {
            return format!(
                "Time: {}, Space: {} (Optimization Potential: {}%)",
                report.time_complexity, report.space_complexity, report.optimization_potential
            );
        }
    }

    text.lines()
        .find(|line| line.contains("O(") || line.to_lowercase().contains("complexity"))
        .map(|line| line.trim().to_string())
        .unwrap_or_else(|| DEFAULT_COMPLEXITY.to_string())
}

pub fn extract_bottlenecks(structured: &StructuredAnalysis, text: &str) -> Vec<String> {
    if let Some(report) = &structured.bottleneck_analysis {
        let formatted: Vec<String> = report
            .bottlenecks
            .iter()
            .map(|b| {
                format!(
                    "[{}] {}: {} (Impact: {}%)",
                    b.severity.to_uppercase(),
                    b.kind,
                    b.description,
                    b.impact_estimate
                )
            })
            .collect();
        if !formatted.is_empty() {
            return formatted;
        }
    }

    matching_lines(text, BOTTLENECK_KEYWORDS, 5)
}

/// Known optimization patterns mentioned in the text, title-cased.
pub fn extract_patterns(text: &str) -> Vec<String> {
    let lower = text.to_lowercase();
    PATTERN_KEYWORDS
        .iter()
        .filter(|keyword| lower.contains(*keyword))
        .map(|keyword| title_case(keyword))
        .collect()
}

pub fn extract_suggestions(structured: &StructuredAnalysis, text: &str) -> Vec<String> {
    if let Some(report) = &structured.optimization_suggestions {
        let formatted: Vec<String> = report
            .optimizations
            .iter()
            .map(|o| {
                format!(
                    "[{}] {} (Speedup: {}x, Difficulty: {})",
                    o.technique, o.description, o.estimated_speedup, o.implementation_difficulty
                )
            })
            .collect();
        if !formatted.is_empty() {
            return formatted;
        }
    }

    matching_lines(text, SUGGESTION_KEYWORDS, 10)
}

fn matching_lines(text: &str, keywords: &[&str], limit: usize) -> Vec<String> {
    text.lines()
        .filter(|line| {
            let lower = line.to_lowercase();
            keywords.iter().any(|k| lower.contains(k))
        })
        .map(|line| line.trim().to_string())
        .take(limit)
        .collect()
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock_provider::ScriptedProvider;

    fn analyzer(provider: Option<Arc<dyn LLMProvider>>) -> CodeAnalyzer {
        CodeAnalyzer::new(provider, &CaptainConfig::default())
    }

    #[tokio::test]
    async fn tool_calls_drive_structured_fields() {
        let provider = Arc::new(ScriptedProvider::with_tool_calls(
            "",
            vec![
                ToolCall {
                    name: COMPLEXITY_TOOL.to_string(),
                    arguments: r#"{"time_complexity":"O(n^2)","space_complexity":"O(1)","optimization_potential":70}"#.to_string(),
                },
                ToolCall {
                    name: BOTTLENECK_TOOL.to_string(),
                    arguments: r#"{"bottlenecks":[{"type":"loop","description":"nested scan","severity":"high","impact_estimate":60}]}"#.to_string(),
                },
                ToolCall {
                    name: SUGGESTION_TOOL.to_string(),
                    arguments: r#"{"optimizations":[{"technique":"Hash Map","description":"index values","estimated_speedup":4.5,"implementation_difficulty":"easy"}]}"#.to_string(),
                },
            ],
        ));

        let analysis = analyzer(Some(provider.clone()))
            .analyze_code("for a in xs:\n  for b in xs: pass", "python", "Performance")
            .await;

        assert!(analysis.error.is_none());
        assert_eq!(analysis.complexity, "Time: O(n^2), Space: O(1) (Optimization Potential: 70%)");
        assert_eq!(analysis.bottlenecks, vec!["[HIGH] loop: nested scan (Impact: 60%)"]);
        assert_eq!(
            analysis.suggestions,
            vec!["[Hash Map] index values (Speedup: 4.5x, Difficulty: easy)"]
        );
        assert_eq!(analysis.raw_analysis, TOOL_ONLY_ANALYSIS);
        assert!(analysis.structured_analysis.tool_calling_used);
        assert_eq!(analysis.tool_results.len(), 3);

        let call = &provider.calls()[0];
        assert_eq!(call.config.tools.len(), 3);
        assert_eq!(call.config.max_tokens, Some(6000));
        let captain = &call.config.extra_body.as_ref().unwrap()["captain"];
        assert_eq!(captain["optimization_focus"], "performance");
        assert_eq!(captain["processing_mode"], "advanced_analysis_with_tools");
        assert!(captain["context"].as_str().unwrap().contains("for b in xs"));
    }

    #[tokio::test]
    async fn text_answer_falls_back_to_keyword_extraction() {
        let text = "Overall the time complexity is quadratic.\n\
                    The nested loop is the main bottleneck.\n\
                    Consider a hash map for lookups.\n\
                    Memoization and caching would help; caching again.";
        let provider = Arc::new(ScriptedProvider::replying(text));

        let analysis = analyzer(Some(provider)).analyze_code("x", "python", "Performance").await;

        assert_eq!(analysis.complexity, "Overall the time complexity is quadratic.");
        assert_eq!(analysis.bottlenecks, vec!["The nested loop is the main bottleneck."]);
        assert_eq!(analysis.suggestions, vec!["Consider a hash map for lookups."]);
        assert_eq!(analysis.patterns, vec!["Caching", "Memoization", "Hash Map"]);
        assert!(!analysis.structured_analysis.tool_calling_used);
    }

    #[tokio::test]
    async fn provider_failure_yields_error_analysis() {
        let provider = Arc::new(ScriptedProvider::failing("captain unreachable"));
        let analysis = analyzer(Some(provider)).analyze_code("x", "javascript", "Memory Usage").await;
        assert!(analysis.error.unwrap().contains("captain unreachable"));
        assert_eq!(analysis.language, "javascript");
        assert!(analysis.patterns.is_empty());
    }

    #[tokio::test]
    async fn missing_provider_yields_error_analysis() {
        let analysis = analyzer(None).analyze_code("x", "python", "Performance").await;
        assert!(analysis.error.is_some());
    }

    #[test]
    fn complexity_defaults_when_nothing_matches() {
        let structured = StructuredAnalysis::default();
        assert_eq!(extract_complexity(&structured, "all good"), DEFAULT_COMPLEXITY);
        assert_eq!(extract_complexity(&structured, "runs in O(n log n)"), "runs in O(n log n)");
    }

    #[test]
    fn bottleneck_lines_are_capped_at_five() {
        let text = (0..8).map(|i| format!("slow part {}", i)).collect::<Vec<_>>().join("\n");
        assert_eq!(extract_bottlenecks(&StructuredAnalysis::default(), &text).len(), 5);
    }

    #[tokio::test]
    async fn codebase_analysis_counts_files_and_lines() {
        let provider = Arc::new(ScriptedProvider::replying("split the module"));
        let files = vec![
            ("a.py".to_string(), "x = 1\ny = 2".to_string()),
            ("b.py".to_string(), "z = 3".to_string()),
        ];
        let result = analyzer(Some(provider.clone())).analyze_codebase(&files, "performance").await;
        assert_eq!(result.files_analyzed, 2);
        assert_eq!(result.total_lines, 3);
        assert_eq!(result.codebase_analysis.as_deref(), Some("split the module"));

        let context = provider.calls()[0].config.extra_body.clone().unwrap();
        assert!(context["captain"]["context"].as_str().unwrap().contains("FILE: b.py"));

        let failed = analyzer(None).analyze_codebase(&files, "performance").await;
        assert!(failed.error.is_some());
        assert_eq!(failed.files_analyzed, 2);
    }
}
