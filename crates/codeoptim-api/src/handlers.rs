use crate::{pipeline, store::ExperimentRecord, store::ExperimentSummary, ApiError, ApiResult, AppState};
use axum::{
    extract::{Path, State},
    Json,
};
use codeoptim_core::{ExperimentId, ExperimentRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

#[derive(Serialize, Deserialize)]
pub struct RootResponse {
    pub message: String,
    pub status: String,
}

#[derive(Serialize, Deserialize)]
pub struct ServiceStatus {
    pub captain: bool,
    pub morph: bool,
    pub research: bool,
    pub sandbox: bool,
}

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub active_experiments: usize,
    pub total_experiments: usize,
    pub uptime_seconds: u64,
    pub services: ServiceStatus,
}

#[derive(Serialize, Deserialize)]
pub struct StartExperimentResponse {
    pub experiment_id: ExperimentId,
    pub status: String,
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "CodeOptim Platform API".to_string(),
        status: "running".to_string(),
    })
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        active_experiments: state.store.running(),
        total_experiments: state.store.len(),
        uptime_seconds: state.started_at.elapsed().as_secs(),
        services: ServiceStatus {
            captain: state.analyzer.is_configured(),
            morph: state.generator.is_configured(),
            research: state.research.is_configured(),
            sandbox: state.sandbox.is_enabled(),
        },
    })
}

fn validate(request: &ExperimentRequest, max_variants: usize) -> ApiResult<()> {
    if request.code.trim().is_empty() {
        return Err(ApiError::Validation("code must not be empty".to_string()));
    }
    if request.variants == 0 || request.variants > max_variants {
        return Err(ApiError::Validation(format!(
            "variants must be between 1 and {}",
            max_variants
        )));
    }
    if request.iterations == 0 {
        return Err(ApiError::Validation("iterations must be at least 1".to_string()));
    }
    Ok(())
}

pub async fn start_experiment(
    State(state): State<AppState>,
    Json(request): Json<ExperimentRequest>,
) -> ApiResult<Json<StartExperimentResponse>> {
    validate(&request, state.experiment_settings().max_variants)?;

    let id = state.store.create(request);
    info!(experiment_id = %id, "Experiment started");
    tokio::spawn(pipeline::run_experiment(state.clone(), id));

    Ok(Json(StartExperimentResponse {
        experiment_id: id,
        status: "started".to_string(),
    }))
}

pub(crate) fn parse_id(id: &str) -> ApiResult<ExperimentId> {
    id.parse()
        .map_err(|_| ApiError::NotFound(format!("Experiment {} not found", id)))
}

pub async fn get_results(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Json<ExperimentRecord>> {
    let experiment_id = parse_id(&id)?;
    state
        .store
        .get(&experiment_id)
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("Experiment {} not found", id)))
}

pub async fn list_experiments(State(state): State<AppState>) -> Json<Value> {
    let experiments: Vec<ExperimentSummary> = state.store.list();
    Json(json!({
        "total": experiments.len(),
        "experiments": experiments,
    }))
}
