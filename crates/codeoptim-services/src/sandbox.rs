//! Measures code by running it in a local interpreter.
//!
//! The code is wrapped in a small harness that times repeated calls and
//! prints one `CODEOPTIM_RESULT: {json}` line. Anything that prevents a
//! measurement degrades to [`simulate_performance`].

use crate::simulate::{improvement_over, simulate_performance};
use anyhow::{anyhow, Context, Result};
use codeoptim_core::{PerformanceMetrics, SandboxConfig, Variant};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, warn};

pub const RESULT_MARKER: &str = "CODEOPTIM_RESULT:";
pub const NO_DATA_NOTE: &str = "Executed but no performance data captured";

const PYTHON_HARNESS: &str = r#"import json as __co_json
import time as __co_time
import tracemalloc as __co_tracemalloc

__CODE__

def __co_measure(iterations):
    __co_tracemalloc.start()
    start_memory = __co_tracemalloc.get_traced_memory()[0]
    start = __co_time.perf_counter()
    target = globals().get("sort") or globals().get("Sort")
    entry = globals().get("main")
    completed = 0
    for i in range(iterations):
        try:
            if callable(target):
                target([3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5])
            elif callable(entry):
                entry()
        except Exception as e:
            if i == 0:
                print("Execution error:", e)
            break
        completed += 1
    total = (__co_time.perf_counter() - start) * 1000
    end_memory = __co_tracemalloc.get_traced_memory()[0]
    __co_tracemalloc.stop()
    print("CODEOPTIM_RESULT:", __co_json.dumps({
        "total_execution_time_ms": total,
        "avg_time_per_iteration_ms": total / max(iterations, 1),
        "memory_usage_mb": max((end_memory - start_memory) / 1024 / 1024, 0.1),
        "iterations_completed": completed,
    }))

__co_measure(__ITERATIONS__)
"#;

const JAVASCRIPT_HARNESS: &str = r#"__CODE__

(function () {
    const iterations = __ITERATIONS__;
    const memBefore = process.memoryUsage().heapUsed;
    const start = performance.now();
    let completed = 0;
    for (let i = 0; i < iterations; i++) {
        try {
            if (typeof sort === 'function') {
                sort([3, 1, 4, 1, 5, 9, 2, 6, 5, 3, 5]);
            } else if (typeof main === 'function') {
                main();
            }
        } catch (e) {
            if (i === 0) console.log('Execution error:', e.message);
            break;
        }
        completed++;
    }
    const total = performance.now() - start;
    const memAfter = process.memoryUsage().heapUsed;
    console.log('CODEOPTIM_RESULT:', JSON.stringify({
        total_execution_time_ms: total,
        avg_time_per_iteration_ms: total / Math.max(iterations, 1),
        memory_usage_mb: Math.max((memAfter - memBefore) / 1024 / 1024, 0.1),
        iterations_completed: completed
    }));
})();
"#;

#[derive(Debug, Deserialize)]
struct HarnessResult {
    total_execution_time_ms: f64,
    avg_time_per_iteration_ms: f64,
    memory_usage_mb: f64,
    iterations_completed: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Runtime {
    Python,
    JavaScript,
}

impl Runtime {
    fn for_language(language: &str) -> Option<Self> {
        match language.to_lowercase().as_str() {
            "python" | "py" => Some(Runtime::Python),
            "javascript" | "js" | "node" => Some(Runtime::JavaScript),
            _ => None,
        }
    }

    fn suffix(self) -> &'static str {
        match self {
            Runtime::Python => ".py",
            Runtime::JavaScript => ".js",
        }
    }

    fn harness(self) -> &'static str {
        match self {
            Runtime::Python => PYTHON_HARNESS,
            Runtime::JavaScript => JAVASCRIPT_HARNESS,
        }
    }
}

/// Measurement of one variant against the baseline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkEntry {
    pub id: usize,
    pub name: String,
    pub performance: PerformanceMetrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub baseline: PerformanceMetrics,
    pub variants: Vec<BenchmarkEntry>,
    /// Id of the variant with the largest improvement
    pub best_variant: Option<usize>,
}

pub struct SandboxRunner {
    config: SandboxConfig,
}

impl SandboxRunner {
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Measure `code`, or simulate it when it cannot be run.
    pub async fn execute(&self, code: &str, language: &str, iterations: u32) -> PerformanceMetrics {
        if !self.config.enabled {
            return simulate_performance(code, iterations);
        }
        let Some(runtime) = Runtime::for_language(language) else {
            debug!("No sandbox runtime for {}, simulating", language);
            return simulate_performance(code, iterations);
        };

        match self.run(runtime, code, iterations).await {
            Ok(output) => parse_output(&output, iterations),
            Err(e) => {
                warn!("Sandbox execution failed: {:#}", e);
                simulate_performance(code, iterations)
            }
        }
    }

    /// Measure a variant; real measurements are compared with `baseline`.
    /// A variant that falls back to simulation keeps its simulated improvement
    /// even against a measured baseline, and still competes for `best_variant`.
    pub async fn measure_variant(
        &self,
        baseline: Option<&PerformanceMetrics>,
        code: &str,
        language: &str,
        iterations: u32,
    ) -> PerformanceMetrics {
        let mut metrics = self.execute(code, language, iterations).await;
        if let Some(baseline) = baseline.filter(|b| b.measured) {
            if metrics.measured {
                metrics.improvement_percent =
                    improvement_over(baseline.execution_time_ms, metrics.execution_time_ms);
            }
        }
        metrics
    }

    /// Measure the original once, then every variant against it.
    pub async fn benchmark(
        &self,
        original: &str,
        variants: &[Variant],
        language: &str,
        iterations: u32,
    ) -> BenchmarkReport {
        let baseline = self.execute(original, language, iterations).await;

        let mut entries = Vec::with_capacity(variants.len());
        for variant in variants {
            let performance = self
                .measure_variant(Some(&baseline), &variant.code, language, iterations)
                .await;
            entries.push(BenchmarkEntry {
                id: variant.number,
                name: variant.name.clone(),
                performance,
            });
        }

        let mut best: Option<&BenchmarkEntry> = None;
        for entry in &entries {
            if best.map_or(true, |b| entry.performance.improvement_percent > b.performance.improvement_percent) {
                best = Some(entry);
            }
        }

        BenchmarkReport {
            best_variant: best.map(|b| b.id),
            baseline,
            variants: entries,
        }
    }

    async fn run(&self, runtime: Runtime, code: &str, iterations: u32) -> Result<String> {
        let script = runtime
            .harness()
            .replace("__CODE__", code)
            .replace("__ITERATIONS__", &iterations.to_string());

        let mut file = tempfile::Builder::new()
            .prefix("codeoptim-")
            .suffix(runtime.suffix())
            .tempfile()
            .context("Failed to create sandbox script")?;
        file.write_all(script.as_bytes())
            .context("Failed to write sandbox script")?;

        let program = match runtime {
            Runtime::Python => &self.config.python_bin,
            Runtime::JavaScript => &self.config.node_bin,
        };

        let child = Command::new(program)
            .arg(file.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start {}", program))?;

        let timeout = Duration::from_secs(self.config.timeout_secs);
        let output = tokio::time::timeout(timeout, child.wait_with_output())
            .await
            .map_err(|_| anyhow!("Sandbox timed out after {}s", self.config.timeout_secs))?
            .context("Failed to collect sandbox output")?;

        let mut combined = String::from_utf8_lossy(&output.stdout).into_owned();
        combined.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(combined)
    }
}

/// Metrics from harness output; defaults with a note when no marker line exists.
pub fn parse_output(output: &str, iterations: u32) -> PerformanceMetrics {
    let parsed = output
        .lines()
        .find_map(|line| line.split_once(RESULT_MARKER).map(|(_, json)| json.trim()))
        .map(serde_json::from_str::<HarnessResult>);

    match parsed {
        Some(Ok(result)) => PerformanceMetrics {
            execution_time_ms: result.avg_time_per_iteration_ms,
            total_execution_time_ms: result.total_execution_time_ms,
            memory_usage_mb: result.memory_usage_mb,
            improvement_percent: 0.0,
            iterations: result.iterations_completed,
            measured: true,
            note: None,
        },
        Some(Err(e)) => {
            warn!("Unreadable sandbox result: {}", e);
            no_data(iterations)
        }
        None => no_data(iterations),
    }
}

fn no_data(iterations: u32) -> PerformanceMetrics {
    PerformanceMetrics {
        execution_time_ms: 0.01,
        total_execution_time_ms: 10.0,
        memory_usage_mb: 2.0,
        improvement_percent: 0.0,
        iterations,
        measured: false,
        note: Some(NO_DATA_NOTE.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulate::{improvement_over, SIMULATED_NOTE};

    fn python_available() -> bool {
        std::process::Command::new("python3")
            .arg("--version")
            .output()
            .is_ok()
    }

    fn runner(timeout_secs: u64) -> SandboxRunner {
        SandboxRunner::new(SandboxConfig {
            enabled: true,
            timeout_secs,
            ..Default::default()
        })
    }

    fn variant(number: usize, code: &str) -> Variant {
        Variant {
            number,
            name: format!("Variant {}", number),
            code: code.to_string(),
            description: String::new(),
            optimization_type: "Performance".to_string(),
            technique: String::new(),
            instruction: None,
            error: None,
        }
    }

    #[test]
    fn marker_line_is_parsed() {
        let output = "noise\nCODEOPTIM_RESULT: {\"total_execution_time_ms\": 12.5, \"avg_time_per_iteration_ms\": 0.0125, \"memory_usage_mb\": 0.1, \"iterations_completed\": 1000}\n";
        let metrics = parse_output(output, 1000);
        assert!(metrics.measured);
        assert_eq!(metrics.execution_time_ms, 0.0125);
        assert_eq!(metrics.total_execution_time_ms, 12.5);
        assert_eq!(metrics.iterations, 1000);
    }

    #[test]
    fn missing_marker_gives_defaults() {
        let metrics = parse_output("Traceback (most recent call last)", 50);
        assert!(!metrics.measured);
        assert_eq!(metrics.note.as_deref(), Some(NO_DATA_NOTE));
        assert_eq!(metrics.iterations, 50);
    }

    #[tokio::test]
    async fn disabled_sandbox_simulates() {
        let metrics = SandboxRunner::new(SandboxConfig::default())
            .execute("print(1)", "python", 10)
            .await;
        assert_eq!(metrics.note.as_deref(), Some(SIMULATED_NOTE));
    }

    #[tokio::test]
    async fn unsupported_language_simulates() {
        let metrics = runner(5).execute("fn main() {}", "rust", 10).await;
        assert!(!metrics.measured);
        assert_eq!(metrics.note.as_deref(), Some(SIMULATED_NOTE));
    }

    #[tokio::test]
    async fn missing_interpreter_simulates() {
        let runner = SandboxRunner::new(SandboxConfig {
            enabled: true,
            python_bin: "codeoptim-no-such-python".to_string(),
            ..Default::default()
        });
        let metrics = runner.execute("x = 1", "python", 10).await;
        assert_eq!(metrics.note.as_deref(), Some(SIMULATED_NOTE));
    }

    #[tokio::test]
    async fn python_code_is_measured() {
        if !python_available() {
            return;
        }
        let metrics = runner(30)
            .execute("def sort(a):\n    return sorted(a)", "python", 200)
            .await;
        assert!(metrics.measured);
        assert_eq!(metrics.iterations, 200);
        assert!(metrics.memory_usage_mb >= 0.1);
    }

    #[tokio::test]
    async fn early_exit_leaves_no_data() {
        if !python_available() {
            return;
        }
        let metrics = runner(30).execute("import sys\nsys.exit(0)", "python", 10).await;
        assert_eq!(metrics.note.as_deref(), Some(NO_DATA_NOTE));
    }

    #[tokio::test]
    async fn runaway_code_times_out() {
        if !python_available() {
            return;
        }
        let metrics = runner(1).execute("while True:\n    pass", "python", 10).await;
        assert_eq!(metrics.note.as_deref(), Some(SIMULATED_NOTE));
    }

    fn baseline(measured: bool) -> PerformanceMetrics {
        PerformanceMetrics {
            execution_time_ms: 1000.0,
            total_execution_time_ms: 10_000.0,
            memory_usage_mb: 1.0,
            improvement_percent: 0.0,
            iterations: 10,
            measured,
            note: None,
        }
    }

    #[tokio::test]
    async fn measured_baseline_recomputes_improvement() {
        if !python_available() {
            return;
        }
        let baseline = baseline(true);
        let metrics = runner(30)
            .measure_variant(Some(&baseline), "def add(a, b):\n    return a + b", "python", 10)
            .await;

        assert!(metrics.measured);
        assert_eq!(
            metrics.improvement_percent,
            improvement_over(baseline.execution_time_ms, metrics.execution_time_ms)
        );
        assert!(metrics.improvement_percent > 90.0);
    }

    #[tokio::test]
    async fn unmeasured_baseline_keeps_variant_improvement() {
        if !python_available() {
            return;
        }
        let metrics = runner(30)
            .measure_variant(Some(&baseline(false)), "def add(a, b):\n    return a + b", "python", 10)
            .await;

        assert!(metrics.measured);
        assert_eq!(metrics.improvement_percent, 0.0);
    }

    #[tokio::test]
    async fn benchmark_picks_largest_improvement() {
        let runner = SandboxRunner::new(SandboxConfig::default());
        let variants = vec![variant(1, "a"), variant(2, "bb"), variant(3, "ccc")];
        let report = runner.benchmark("original", &variants, "python", 10).await;

        assert_eq!(report.variants.len(), 3);
        let best = report
            .variants
            .iter()
            .max_by(|a, b| a.performance.improvement_percent.total_cmp(&b.performance.improvement_percent))
            .unwrap();
        assert_eq!(
            report.variants.iter().find(|v| Some(v.id) == report.best_variant).unwrap().performance.improvement_percent,
            best.performance.improvement_percent
        );
    }
}
