//! Runs one experiment from analysis to results.
//!
//! Stages are written to the store as they start, so progress streams and
//! the results endpoint observe them while the pipeline is still running.

use crate::AppState;
use chrono::Utc;
use codeoptim_core::{
    CodeOptimError, ExperimentId, ExperimentResults, ExperimentStatus, Result, VariantResult,
};
use std::time::Duration;
use tracing::{error, info};

/// Drive experiment `id` to completion. Failures end in `failed` with the message stored.
pub async fn run_experiment(state: AppState, id: ExperimentId) {
    if let Err(e) = execute(&state, id).await {
        error!(experiment_id = %id, "Experiment failed: {}", e);
        state.store.update(&id, |record| {
            record.status = ExperimentStatus::Failed;
            record.error = Some(e.to_string());
        });
    }
}

fn set_status(state: &AppState, id: &ExperimentId, status: ExperimentStatus) -> Result<()> {
    if state.store.update(id, |record| record.status = status) {
        info!(experiment_id = %id, "Experiment {}", status);
        Ok(())
    } else {
        Err(CodeOptimError::NotFound(id.to_string()))
    }
}

async fn execute(state: &AppState, id: ExperimentId) -> Result<()> {
    let request = state
        .store
        .get(&id)
        .ok_or_else(|| CodeOptimError::NotFound(id.to_string()))?
        .request;
    let language = request.language.as_str();
    let delay = Duration::from_millis(state.experiment_settings().variant_delay_ms);

    set_status(state, &id, ExperimentStatus::Analyzing)?;
    let analysis = state
        .analyzer
        .analyze_code(&request.code, language, &request.target)
        .await;
    state.store.update(&id, |record| record.analysis = Some(analysis.clone()));

    set_status(state, &id, ExperimentStatus::Researching)?;
    let research = state
        .research
        .research_optimizations(language, &request.target, &analysis.patterns)
        .await;
    state.store.update(&id, |record| record.research = Some(research.clone()));

    set_status(state, &id, ExperimentStatus::Generating)?;
    let baseline = if state.sandbox.is_enabled() {
        let baseline = state
            .sandbox
            .execute(&request.code, language, request.iterations)
            .await;
        state.store.update(&id, |record| record.baseline = Some(baseline.clone()));
        Some(baseline)
    } else {
        None
    };

    let total = request.variants;
    let mut variants = Vec::with_capacity(total);
    for i in 0..total {
        let progress = (i * 100 / total) as u8;
        state.store.update(&id, |record| record.progress = progress);

        let variant = state
            .generator
            .generate_variant(&request.code, &analysis, &research, i + 1)
            .await;
        let performance = state
            .sandbox
            .measure_variant(baseline.as_ref(), &variant.code, language, request.iterations)
            .await;

        let result = VariantResult {
            id: variant.number,
            name: variant.name,
            code: variant.code,
            description: variant.description,
            technique: variant.technique,
            performance,
            timestamp: Utc::now(),
        };
        state.store.update(&id, |record| record.variants.push(result.clone()));
        variants.push(result);

        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    let results = ExperimentResults::from_variants(&variants)
        .ok_or_else(|| CodeOptimError::Execution("No variants were generated".to_string()))?;
    info!(
        experiment_id = %id,
        best = %results.best_variant.name,
        avg_improvement = results.avg_improvement,
        "Experiment completed"
    );

    state.store.update(&id, |record| {
        record.results = Some(results);
        record.status = ExperimentStatus::Completed;
        record.progress = 100;
    });
    Ok(())
}
