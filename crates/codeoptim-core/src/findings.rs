//! Structured outputs of the analysis and research stages.
//!
//! These travel between crates (the analyzer fills them, the variant
//! generator and the pipeline read them) so they live in core.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Arguments of the `analyze_algorithm_complexity` tool call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplexityReport {
    #[serde(default)]
    pub time_complexity: String,
    #[serde(default)]
    pub space_complexity: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub worst_case_scenario: Option<String>,
    #[serde(default)]
    pub optimization_potential: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bottleneck {
    #[serde(rename = "type", default = "default_bottleneck_type")]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_unknown")]
    pub severity: String,
    #[serde(default)]
    pub impact_estimate: f64,
}

/// Arguments of the `identify_bottlenecks` tool call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BottleneckReport {
    #[serde(default)]
    pub bottlenecks: Vec<Bottleneck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptimizationSuggestion {
    #[serde(default = "default_technique")]
    pub technique: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_improvement: Option<String>,
    #[serde(default = "default_speedup")]
    pub estimated_speedup: f64,
    #[serde(default = "default_unknown")]
    pub implementation_difficulty: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_example: Option<String>,
}

/// Arguments of the `suggest_optimizations` tool call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SuggestionReport {
    #[serde(default)]
    pub optimizations: Vec<OptimizationSuggestion>,
}

fn default_bottleneck_type() -> String {
    "general".to_string()
}

fn default_unknown() -> String {
    "unknown".to_string()
}

fn default_technique() -> String {
    "Unknown".to_string()
}

fn default_speedup() -> f64 {
    1.0
}

/// Tool-call payloads returned by the analysis model, when it used tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructuredAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub complexity_analysis: Option<ComplexityReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bottleneck_analysis: Option<BottleneckReport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub optimization_suggestions: Option<SuggestionReport>,
    #[serde(default)]
    pub tool_calling_used: bool,
}

/// Result of analysing one piece of code.
///
/// A failed analysis still produces a value: `error` is set and the list
/// fields are empty, so later stages can keep going.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodeAnalysis {
    pub language: String,
    pub target: String,
    #[serde(default)]
    pub features_used: Vec<String>,
    #[serde(default)]
    pub structured_analysis: StructuredAnalysis,
    #[serde(default)]
    pub complexity: String,
    #[serde(default)]
    pub bottlenecks: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
    #[serde(default)]
    pub raw_analysis: String,
    #[serde(default)]
    pub tool_results: HashMap<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CodeAnalysis {
    pub fn failed(language: &str, target: &str, error: impl Into<String>) -> Self {
        Self {
            language: language.to_string(),
            target: target.to_string(),
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

/// One search hit backing a research finding.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchSource {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub relevance_score: f64,
}

/// Optimization knowledge gathered for a language/target pair.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchFindings {
    pub language: String,
    pub target: String,
    #[serde(default)]
    pub optimization_techniques: Vec<String>,
    #[serde(default)]
    pub research_sources: Vec<ResearchSource>,
    #[serde(default)]
    pub patterns_discovered: Vec<String>,
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(default)]
    pub search_queries_used: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bottleneck_report_tolerates_missing_fields() {
        let report: BottleneckReport = serde_json::from_str(
            r#"{"bottlenecks": [{"type": "loop", "description": "nested scan"}]}"#,
        )
        .unwrap();
        assert_eq!(report.bottlenecks.len(), 1);
        assert_eq!(report.bottlenecks[0].kind, "loop");
        assert_eq!(report.bottlenecks[0].severity, "unknown");
        assert_eq!(report.bottlenecks[0].impact_estimate, 0.0);
    }

    #[test]
    fn failed_analysis_keeps_context() {
        let analysis = CodeAnalysis::failed("python", "Performance", "boom");
        assert_eq!(analysis.language, "python");
        assert_eq!(analysis.error.as_deref(), Some("boom"));
        assert!(analysis.patterns.is_empty());
        assert!(analysis.suggestions.is_empty());
    }
}
