//! Variant generation through Morph Fast Apply.
//!
//! Each variant number deterministically selects a strategy, an update
//! skeleton, a name and a technique label, so a run with N variants
//! always explores the same spread of optimizations.

use crate::llm_provider::*;
use crate::update_patterns::update_pattern;
use codeoptim_core::{CodeAnalysis, ResearchFindings, Variant};
use std::sync::Arc;
use tracing::{debug, warn};

const STRATEGIES: [&str; 15] = [
    "I am converting nested loop algorithms to use sorting-based approaches to reduce time complexity from O(n²) to O(n log n)",
    "I am replacing brute force array scanning with two pointers technique to reduce complexity from O(n²) to O(n)",
    "I am adding memoization to recursive functions to eliminate redundant calculations and reduce exponential time complexity",
    "I am replacing array.indexOf() and linear searches with hash map lookups to reduce complexity from O(n) to O(1)",
    "I am converting nested loops that process subarrays into sliding window approach to reduce complexity from O(n²) to O(n)",
    "I am replacing inefficient array operations with appropriate data structures like Set, Map, or specialized collections",
    "I am optimizing string concatenation and manipulation using StringBuilder pattern or efficient string methods",
    "I am replacing arithmetic operations with efficient bit manipulation techniques where applicable",
    "I am adding object pooling to reduce garbage collection pressure and memory allocation overhead",
    "I am reorganizing data access to improve cache locality and reduce memory bandwidth usage",
    "I am replacing expensive mathematical operations (division, modulo, power) with bit shifts and mathematical identities",
    "I am precomputing expensive calculations and storing results in lookup tables for O(1) access",
    "I am unrolling tight loops to reduce loop overhead and enable better compiler optimizations",
    "I am converting scalar operations to vectorized operations that can utilize SIMD instructions",
    "I am adding early exit conditions to avoid unnecessary computation when results are already determined",
];

/// Sixteen strategies in total, the last one interpolates the language.
const STRATEGY_COUNT: usize = STRATEGIES.len() + 1;

const TECHNIQUES: [&str; 10] = [
    "Algorithmic Complexity Reduction",
    "Data Structure Optimization",
    "Loop Optimization",
    "Caching & Memoization",
    "Memory Access Optimization",
    "Branch Prediction",
    "Parallel Processing",
    "Mathematical Optimization",
    "Redundancy Elimination",
    "Early Termination",
];

/// `(n - 1) % 10` without underflow at `n == 0`.
fn cycle10(n: usize) -> usize {
    (n + 9) % 10
}

pub fn strategy_instruction(language: &str, n: usize) -> String {
    let index = n % STRATEGY_COUNT;
    match STRATEGIES.get(index) {
        Some(strategy) => strategy.to_string(),
        None => format!(
            "I am applying {}-specific optimization techniques like efficient built-in methods and language idioms",
            language
        ),
    }
}

/// Full instruction: strategy, target focus and algorithmic guidance.
pub fn optimization_instruction(language: &str, target: &str, n: usize) -> String {
    let mut instruction = format!("{}. ", strategy_instruction(language, n));

    let target = target.to_lowercase();
    if target == "performance" {
        instruction.push_str("Focus on reducing time complexity and improving execution speed. ");
    } else if target.contains("memory") {
        instruction
            .push_str("Focus on reducing memory footprint and improving memory access patterns. ");
    } else if target.contains("readability") {
        instruction
            .push_str("Focus on maintaining readability while applying performance improvements. ");
    }

    instruction.push_str(match n % 4 {
        0 => "Use divide-and-conquer approach where applicable. ",
        1 => "Apply greedy algorithm principles for optimization. ",
        2 => "Use recursive optimization with proper base cases. ",
        _ => "Apply iterative optimization techniques. ",
    });

    instruction
}

pub fn variant_name(target: &str, n: usize) -> String {
    match cycle10(n) {
        0 => format!("Optimized {} v{}", target, n),
        1 => format!("Fast {} Algorithm", target),
        2 => format!("Efficient {} Implementation", target),
        3 => "High-Performance Variant".to_string(),
        4 => format!("Streamlined {} Code", target),
        5 => format!("Advanced {} Optimization", target),
        6 => format!("Parallel {} Version", target),
        7 => "Cache-Optimized Variant".to_string(),
        8 => "Memory-Efficient Implementation".to_string(),
        _ => format!("Vectorized {} Code", target),
    }
}

pub fn variant_technique(n: usize) -> &'static str {
    TECHNIQUES[cycle10(n)]
}

/// "Optimization: " plus the first 100 characters of the instruction.
pub fn variant_description(instruction: &str) -> String {
    let mut chars = instruction.chars();
    let head: String = chars.by_ref().take(100).collect();
    let ellipsis = if chars.next().is_some() { "..." } else { "" };
    format!("Optimization: {}{}", head, ellipsis)
}

/// Local transformation used when Morph is unavailable.
pub fn fallback_code(original: &str, n: usize) -> String {
    let trailer = match n % 3 {
        0 => "// Added caching optimization",
        1 => "// Added loop optimization",
        _ => "// Added algorithmic optimization",
    };
    format!("// Optimization Variant {}\n{}\n{}", n, original, trailer)
}

pub struct VariantGenerator {
    provider: Option<Arc<dyn LLMProvider>>,
}

impl VariantGenerator {
    pub fn new(provider: Option<Arc<dyn LLMProvider>>) -> Self {
        Self { provider }
    }

    pub fn is_configured(&self) -> bool {
        self.provider.is_some()
    }

    /// Produce variant `n` (1-based). Never fails: falls back to a local variant.
    pub async fn generate_variant(
        &self,
        original: &str,
        analysis: &CodeAnalysis,
        _research: &ResearchFindings,
        n: usize,
    ) -> Variant {
        let target = if analysis.target.is_empty() {
            "Performance"
        } else {
            analysis.target.as_str()
        };
        let language = if analysis.language.is_empty() {
            "javascript"
        } else {
            analysis.language.as_str()
        };

        let instruction = optimization_instruction(language, target, n);
        let update = update_pattern(cycle10(n) + 1, language);

        match self.apply(original, &instruction, update).await {
            Ok(code) => {
                debug!(variant = n, "Morph produced variant");
                Variant {
                    number: n,
                    name: variant_name(target, n),
                    code,
                    description: variant_description(&instruction),
                    optimization_type: target.to_string(),
                    technique: variant_technique(n).to_string(),
                    instruction: Some(instruction),
                    error: None,
                }
            }
            Err(e) => {
                warn!("Morph variant generation error: {:#}", e);
                Variant {
                    number: n,
                    name: format!("Variant {}", n),
                    code: fallback_code(original, n),
                    description: format!("Fallback optimization variant {}", n),
                    optimization_type: target.to_string(),
                    technique: "Basic optimization".to_string(),
                    instruction: None,
                    error: Some(format!("{:#}", e)),
                }
            }
        }
    }

    async fn apply(&self, original: &str, instruction: &str, update: &str) -> LLMResult<String> {
        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Morph API key not configured"))?;

        let messages = vec![Message::user(format!(
            "<instruction>{}</instruction>\n<code>{}</code>\n<update>{}</update>",
            instruction, original, update
        ))];

        let response = provider
            .generate_chat(&messages, &GenerationConfig::default())
            .await?;

        if response.content.trim().is_empty() {
            return Err(anyhow::anyhow!("Morph returned an empty variant"));
        }
        Ok(response.content)
    }
}
