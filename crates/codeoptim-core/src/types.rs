use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

pub type ExperimentId = Uuid;

fn default_variants() -> usize {
    50
}

fn default_iterations() -> u32 {
    1000
}

/// Body of `POST /api/experiment/start`.
///
/// `target` is free text coming from the frontend ("Performance",
/// "Memory Usage", "Code Readability", "Security").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentRequest {
    pub code: String,
    pub language: String,
    pub target: String,
    #[serde(default = "default_variants")]
    pub variants: usize,
    #[serde(default = "default_iterations")]
    pub iterations: u32,
    #[serde(default)]
    pub settings: HashMap<String, Value>,
}

/// Lifecycle of an experiment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    Initializing,
    Analyzing,
    Researching,
    Generating,
    Completed,
    Failed,
}

impl ExperimentStatus {
    /// Completed and failed experiments never change again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ExperimentStatus::Completed | ExperimentStatus::Failed)
    }
}

impl fmt::Display for ExperimentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExperimentStatus::Initializing => write!(f, "initializing"),
            ExperimentStatus::Analyzing => write!(f, "analyzing"),
            ExperimentStatus::Researching => write!(f, "researching"),
            ExperimentStatus::Generating => write!(f, "generating"),
            ExperimentStatus::Completed => write!(f, "completed"),
            ExperimentStatus::Failed => write!(f, "failed"),
        }
    }
}

/// Timing and memory numbers for one piece of code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PerformanceMetrics {
    /// Average time of a single iteration
    pub execution_time_ms: f64,
    /// Total wall time across all iterations
    #[serde(default)]
    pub total_execution_time_ms: f64,
    pub memory_usage_mb: f64,
    /// Improvement against the baseline, positive is faster
    pub improvement_percent: f64,
    pub iterations: u32,
    /// `true` when the numbers come from a real execution
    #[serde(default)]
    pub measured: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// A code variant as produced by the patch model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Variant {
    pub number: usize,
    pub name: String,
    pub code: String,
    pub description: String,
    pub optimization_type: String,
    pub technique: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instruction: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A generated variant together with its measured performance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VariantResult {
    pub id: usize,
    pub name: String,
    pub code: String,
    pub description: String,
    pub technique: String,
    pub performance: PerformanceMetrics,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResults {
    pub best_variant: VariantResult,
    pub total_variants: usize,
    pub avg_improvement: f64,
    pub completed_at: DateTime<Utc>,
}

impl ExperimentResults {
    /// Aggregate finished variants. Returns `None` for an empty slice.
    pub fn from_variants(variants: &[VariantResult]) -> Option<Self> {
        // Ties keep the earliest variant.
        let mut iter = variants.iter();
        let mut best = iter.next()?;
        for candidate in iter {
            if candidate.performance.improvement_percent > best.performance.improvement_percent {
                best = candidate;
            }
        }

        let total: f64 = variants
            .iter()
            .map(|v| v.performance.improvement_percent)
            .sum();

        Some(Self {
            best_variant: best.clone(),
            total_variants: variants.len(),
            avg_improvement: total / variants.len() as f64,
            completed_at: Utc::now(),
        })
    }
}
