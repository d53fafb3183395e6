//! Randomized stand-in for real measurements.

use codeoptim_core::PerformanceMetrics;
use rand::Rng;

pub const SIMULATED_NOTE: &str = "Simulated performance (sandbox unavailable)";

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Plausible metrics derived from code length.
///
/// The per-iteration time scales with `code.len()`; memory and improvement
/// are drawn uniformly from `[1, 50)` MB and `[-20, 80)` percent.
pub fn simulate_performance(code: &str, iterations: u32) -> PerformanceMetrics {
    let mut rng = rand::rng();
    let base_time = code.len() as f64 * 0.001;
    let execution_time = base_time * rng.random_range(0.5..2.0);

    PerformanceMetrics {
        execution_time_ms: round_to(execution_time, 3),
        total_execution_time_ms: round_to(execution_time * iterations as f64, 3),
        memory_usage_mb: round_to(rng.random_range(1.0..50.0), 2),
        improvement_percent: round_to(rng.random_range(-20.0..80.0), 1),
        iterations,
        measured: false,
        note: Some(SIMULATED_NOTE.to_string()),
    }
}

/// Improvement of `time` over `baseline` in percent, one decimal.
pub fn improvement_over(baseline: f64, time: f64) -> f64 {
    if baseline > 0.0 {
        round_to((baseline - time) / baseline * 100.0, 1)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_values_stay_in_range() {
        let code = "x".repeat(1000);
        for _ in 0..50 {
            let metrics = simulate_performance(&code, 100);
            assert!(metrics.execution_time_ms >= 0.5 && metrics.execution_time_ms <= 2.0);
            assert!(metrics.memory_usage_mb >= 1.0 && metrics.memory_usage_mb <= 50.0);
            assert!(metrics.improvement_percent >= -20.0 && metrics.improvement_percent <= 80.0);
            assert_eq!(metrics.iterations, 100);
            assert!(!metrics.measured);
        }
    }

    #[test]
    fn empty_code_takes_no_time() {
        let metrics = simulate_performance("", 10);
        assert_eq!(metrics.execution_time_ms, 0.0);
    }

    #[test]
    fn improvement_is_relative_to_baseline() {
        assert_eq!(improvement_over(10.0, 7.5), 25.0);
        assert_eq!(improvement_over(3.0, 4.0), -33.3);
        assert_eq!(improvement_over(0.0, 4.0), 0.0);
    }
}
