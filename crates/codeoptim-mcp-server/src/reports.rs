//! Markdown rendering of tool results.

use codeoptim_ai::CodebaseAnalysis;
use codeoptim_core::{CodeAnalysis, PerformanceMetrics, Variant};
use codeoptim_services::{Implementation, RepositoryAnalysis, ScrapedDocumentation};
use std::fmt::Write;

const LISTED_IMPLEMENTATIONS: usize = 5;
const LISTED_FINDINGS: usize = 5;
const LISTED_RECOMMENDATIONS: usize = 3;

fn improvement(performance: Option<&PerformanceMetrics>) -> String {
    performance
        .map(|p| format!("{}%", p.improvement_percent))
        .unwrap_or_else(|| "N/A".to_string())
}

fn title_case(snake: &str) -> String {
    snake
        .split('_')
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

/// `measured` holds the sandbox result for the first variant.
pub fn optimization_report(
    language: &str,
    target: &str,
    analysis: &CodeAnalysis,
    variants: &[Variant],
    measured: Option<&PerformanceMetrics>,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Code Optimization Complete\n");
    let _ = writeln!(out, "**Original Code Analysis:**");
    let _ = writeln!(out, "- Language: {}", language);
    let _ = writeln!(out, "- Target: {}", target);
    let _ = writeln!(out, "- Complexity: {}", analysis.complexity);
    if !analysis.features_used.is_empty() {
        let _ = writeln!(out, "- Captain features: {}", analysis.features_used.join(", "));
    }
    if let Some(error) = &analysis.error {
        let _ = writeln!(out, "- Analysis fallback: {}", error);
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "**Optimization Results:**");
    let _ = writeln!(out, "- Generated {} optimized variants", variants.len());
    let _ = writeln!(out, "- Measured improvement (variant 1): {}", improvement(measured));
    if let Some(note) = measured.and_then(|m| m.note.as_deref()) {
        let _ = writeln!(out, "- Note: {}", note);
    }
    let _ = writeln!(out, "\n**Optimized Variants:**");

    for (i, variant) in variants.iter().enumerate() {
        let performance = if i == 0 { measured } else { None };
        let _ = writeln!(out, "\n### Variant {}: {}", variant.number, variant.name);
        let _ = writeln!(out, "**Technique:** {}", variant.technique);
        let _ = writeln!(out, "**Description:** {}", variant.description);
        let _ = writeln!(out, "**Performance:** {} improvement\n", improvement(performance));
        let _ = writeln!(out, "```{}\n{}\n```\n\n---", language, variant.code);
    }

    out
}

pub fn documentation_report(
    docs: &ScrapedDocumentation,
    implementations: &[Implementation],
    requirements: &str,
    target_language: &str,
    style: &str,
) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# Documentation to Code Generation Complete\n");
    let _ = writeln!(out, "**Analysis Summary:**");
    let _ = writeln!(out, "- Documentation URLs: {}", docs.total_urls);
    let _ = writeln!(out, "- Pages processed: {} ({})", docs.successful_scrapes, docs.provider);
    let _ = writeln!(out, "- Target Language: {}", target_language);
    let _ = writeln!(out, "- Implementation Style: {}", style);
    let _ = writeln!(out, "- Requirements: {}", requirements);
    let _ = writeln!(out, "\n**Documentation Processed:**");
    for doc in &docs.docs {
        let _ = writeln!(out, "- {}", doc.url);
    }

    let _ = writeln!(out, "\n**Generated Implementations:**");
    let fence = target_language.to_lowercase();
    for implementation in implementations.iter().take(LISTED_IMPLEMENTATIONS) {
        let _ = writeln!(out, "\n### Implementation {}: {}", implementation.id, implementation.name);
        let _ = writeln!(out, "**Approach:** {}", implementation.approach);
        let _ = writeln!(out, "**Complexity:** {}", implementation.complexity);
        let _ = writeln!(out, "**Description:** {}\n", implementation.description);
        let _ = writeln!(out, "```{}\n{}\n```\n\n---", fence, implementation.code);
    }
    if implementations.len() > LISTED_IMPLEMENTATIONS {
        let _ = writeln!(
            out,
            "\n_{} more implementations not shown._",
            implementations.len() - LISTED_IMPLEMENTATIONS
        );
    }

    out
}

pub fn repository_report(
    analysis: &RepositoryAnalysis,
    depth: &str,
    focus_areas: &[String],
    codebase: Option<&CodebaseAnalysis>,
) -> String {
    let mut out = String::new();
    let name = analysis
        .repository
        .as_ref()
        .map(|r| r.full_name.as_str())
        .unwrap_or("Unknown");
    let languages = analysis
        .overview
        .as_ref()
        .map(|o| o.languages_detected.join(", "))
        .unwrap_or_default();

    let _ = writeln!(out, "# GitHub Repository Analysis\n");
    let _ = writeln!(out, "**Repository:** {}", name);
    let _ = writeln!(out, "**Analysis Depth:** {}", depth);
    let _ = writeln!(out, "**Focus Areas:** {}\n", focus_areas.join(", "));

    let Some(report) = &analysis.optimization_report else {
        let _ = writeln!(out, "No optimization report was produced.");
        return out;
    };

    let summary = &report.analysis_summary;
    let _ = writeln!(out, "**Analysis Summary:**");
    let _ = writeln!(out, "- Files Analyzed: {}", analysis.files_analyzed);
    let _ = writeln!(out, "- Languages Detected: {}", languages);
    let _ = writeln!(out, "- Algorithms Found: {}", summary.algorithms_detected);
    let _ = writeln!(out, "- Optimization Opportunities: {}", summary.optimization_opportunities);
    let _ = writeln!(out, "- Performance Hotspots: {}", summary.performance_hotspots);

    let _ = writeln!(out, "\n**Top Algorithms Detected:**");
    for algorithm in report.top_algorithms.iter().take(LISTED_FINDINGS) {
        let _ = writeln!(
            out,
            "- {}: {} optimization potential ({})",
            title_case(&algorithm.item.algorithm),
            algorithm.item.optimization_potential,
            algorithm.file
        );
    }

    let _ = writeln!(out, "\n**Top Optimization Opportunities:**");
    for opportunity in report.optimization_opportunities.iter().take(LISTED_FINDINGS) {
        let _ = writeln!(
            out,
            "- {}: {} severity ({})",
            opportunity.item.issue, opportunity.item.severity, opportunity.file
        );
    }

    let _ = writeln!(out, "\n**Performance Hotspots:**");
    for hotspot in report.performance_hotspots.iter().take(LISTED_FINDINGS) {
        let _ = writeln!(out, "- {}: Complexity {}/10", hotspot.file, hotspot.complexity);
    }

    let _ = writeln!(out, "\n**Optimization Recommendations:**");
    for recommendation in report.recommendations.iter().take(LISTED_RECOMMENDATIONS) {
        let _ = writeln!(out, "\n### {}", recommendation.title);
        let _ = writeln!(out, "**Priority:** {}", recommendation.priority);
        let _ = writeln!(out, "**Impact:** {}", recommendation.impact);
        let _ = writeln!(out, "**Description:** {}", recommendation.description);
        let _ = writeln!(out, "**Files Affected:** {}", recommendation.files_affected.len());
    }

    let estimated = &report.estimated_improvements;
    let _ = writeln!(out, "\n**Estimated Improvements:**");
    let _ = writeln!(out, "- Performance: {}", estimated.performance_gain);
    let _ = writeln!(out, "- Memory: {}", estimated.memory_reduction);
    let _ = writeln!(out, "- Code Quality: {}", estimated.code_quality);

    if let Some(codebase) = codebase {
        let _ = writeln!(
            out,
            "\n**Holistic Codebase Analysis** ({} files, {} lines):\n",
            codebase.files_analyzed, codebase.total_lines
        );
        match (&codebase.codebase_analysis, &codebase.error) {
            (Some(text), _) => {
                let _ = writeln!(out, "{}", text);
            }
            (None, Some(error)) => {
                let _ = writeln!(out, "Unavailable: {}", error);
            }
            (None, None) => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use codeoptim_services::docs::{fallback_api_patterns, fallback_documentation};
    use codeoptim_services::generate_implementation_variants;

    fn variant(number: usize) -> Variant {
        Variant {
            number,
            name: format!("Variant {}", number),
            code: "x = 1".to_string(),
            description: "desc".to_string(),
            optimization_type: "performance".to_string(),
            technique: "Loop Optimization".to_string(),
            instruction: None,
            error: None,
        }
    }

    #[test]
    fn only_the_first_variant_reports_a_measurement() {
        let metrics = PerformanceMetrics {
            execution_time_ms: 0.5,
            total_execution_time_ms: 5.0,
            memory_usage_mb: 2.0,
            improvement_percent: 12.5,
            iterations: 10,
            measured: false,
            note: Some("Simulated".to_string()),
        };
        let analysis = CodeAnalysis {
            complexity: "O(n)".to_string(),
            ..Default::default()
        };
        let report = optimization_report("python", "performance", &analysis, &[variant(1), variant(2)], Some(&metrics));

        assert!(report.contains("- Complexity: O(n)"));
        assert!(report.contains("- Measured improvement (variant 1): 12.5%"));
        assert!(report.contains("- Note: Simulated"));
        assert_eq!(report.matches("**Performance:** 12.5% improvement").count(), 1);
        assert_eq!(report.matches("**Performance:** N/A improvement").count(), 1);
        assert!(report.contains("```python\nx = 1\n```"));
    }

    #[test]
    fn documentation_report_lists_five_implementations() {
        let docs = fallback_documentation(&["https://docs.runcaptain.com/infinite-responses".to_string()]);
        let implementations = generate_implementation_variants(&fallback_api_patterns(), &docs, "stream", "JavaScript");
        let report = documentation_report(&docs, &implementations, "stream", "JavaScript", "production");

        assert!(report.contains("- https://docs.runcaptain.com/infinite-responses"));
        assert_eq!(report.matches("### Implementation").count(), 5);
        assert!(report.contains("_5 more implementations not shown._"));
        assert!(report.contains("```javascript\n"));
    }

    #[test]
    fn failed_repository_analysis_has_no_sections() {
        let report = repository_report(&RepositoryAnalysis::default(), "quick", &["performance".to_string()], None);
        assert!(report.contains("**Repository:** Unknown"));
        assert!(report.contains("No optimization report was produced."));
    }

    #[test]
    fn snake_case_names_are_titled() {
        assert_eq!(title_case("bubble_sort"), "Bubble Sort");
        assert_eq!(title_case("linear_search"), "Linear Search");
    }
}
