use axum_test::TestServer;
use codeoptim_ai::{mock_provider::ScriptedProvider, LLMProvider};
use codeoptim_api::{create_router, AppState};
use codeoptim_core::{CodeOptimConfig, ConfigManager};
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

fn test_config() -> Arc<ConfigManager> {
    let mut config = CodeOptimConfig::default();
    config.experiment.variant_delay_ms = 0;
    config.experiment.stream_poll_interval_ms = 20;
    config.experiment.max_variants = 20;
    Arc::new(ConfigManager::from_config(config).expect("valid config"))
}

fn offline_state() -> AppState {
    AppState::with_providers(test_config(), None, None).expect("app state")
}

fn test_server(state: AppState) -> TestServer {
    TestServer::new(create_router(state)).unwrap()
}

fn experiment(variants: usize) -> Value {
    json!({
        "code": "def sort(a):\n    for i in range(len(a)):\n        pass\n    return sorted(a)",
        "language": "python",
        "target": "Performance",
        "variants": variants,
        "iterations": 10
    })
}

async fn wait_for_terminal(server: &TestServer, id: &str) -> Value {
    for _ in 0..200 {
        let body: Value = server
            .get(&format!("/api/experiment/{}/results", id))
            .await
            .json();
        if body["status"] == "completed" || body["status"] == "failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("experiment {} did not finish", id);
}

#[tokio::test]
async fn root_reports_running() {
    let server = test_server(offline_state());
    let resp = server.get("/").await;
    assert_eq!(resp.status_code(), 200);
    let body: Value = resp.json();
    assert_eq!(body["message"], "CodeOptim Platform API");
    assert_eq!(body["status"], "running");
}

#[tokio::test]
async fn health_endpoint_returns_ok() {
    let server = test_server(offline_state());
    let resp = server.get("/health").await;
    assert_eq!(resp.status_code(), 200);
    let body: Value = resp.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["active_experiments"], 0);
    assert_eq!(body["services"]["captain"], false);
    assert_eq!(body["services"]["sandbox"], false);
}

#[tokio::test]
async fn invalid_experiments_are_rejected() {
    let server = test_server(offline_state());

    let mut empty = experiment(3);
    empty["code"] = json!("   ");
    let resp = server.post("/api/experiment/start").json(&empty).await;
    assert_eq!(resp.status_code(), 400);
    let body: Value = resp.json();
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("code must not be empty"));

    let resp = server.post("/api/experiment/start").json(&experiment(0)).await;
    assert_eq!(resp.status_code(), 400);

    let resp = server.post("/api/experiment/start").json(&experiment(21)).await;
    assert_eq!(resp.status_code(), 400);

    let mut no_iterations = experiment(3);
    no_iterations["iterations"] = json!(0);
    let resp = server.post("/api/experiment/start").json(&no_iterations).await;
    assert_eq!(resp.status_code(), 400);
}

#[tokio::test]
async fn unknown_experiment_is_not_found() {
    let server = test_server(offline_state());

    let resp = server
        .get("/api/experiment/67e55044-10b1-426f-9247-bb680e5fe0c8/results")
        .await;
    assert_eq!(resp.status_code(), 404);

    let resp = server.get("/api/experiment/not-an-id/results").await;
    assert_eq!(resp.status_code(), 404);
    let body: Value = resp.json();
    assert_eq!(body["status"], 404);
}

#[tokio::test]
async fn experiment_runs_to_completion() {
    let server = test_server(offline_state());

    let resp = server.post("/api/experiment/start").json(&experiment(5)).await;
    assert_eq!(resp.status_code(), 200);
    let body: Value = resp.json();
    assert_eq!(body["status"], "started");
    let id = body["experiment_id"].as_str().unwrap().to_string();

    let record = wait_for_terminal(&server, &id).await;
    assert_eq!(record["status"], "completed");
    assert_eq!(record["progress"], 100);
    assert_eq!(record["variants"].as_array().unwrap().len(), 5);
    assert_eq!(record["results"]["total_variants"], 5);
    assert_eq!(record["research"]["source"], "fallback_knowledge_base");
    assert!(record["analysis"]["error"].is_string());

    let list: Value = server.get("/api/experiments").await.json();
    assert_eq!(list["total"], 1);
    assert_eq!(list["experiments"][0]["id"], id.as_str());
    assert_eq!(list["experiments"][0]["variants_count"], 5);
}

#[tokio::test]
async fn scripted_models_drive_the_pipeline() {
    let captain: Arc<dyn LLMProvider> = Arc::new(ScriptedProvider::replying(
        "Time complexity is O(n^2) because of nested loops.\nConsider memoization and a hash map.",
    ));
    let morph: Arc<dyn LLMProvider> =
        Arc::new(ScriptedProvider::replying("def sort(a):\n    return sorted(a)"));
    let state = AppState::with_providers(test_config(), Some(captain), Some(morph)).unwrap();
    let server = test_server(state);

    let body: Value = server
        .post("/api/experiment/start")
        .json(&experiment(3))
        .await
        .json();
    let id = body["experiment_id"].as_str().unwrap().to_string();

    let record = wait_for_terminal(&server, &id).await;
    assert_eq!(record["status"], "completed");
    assert_eq!(record["analysis"]["patterns"], json!(["Memoization", "Hash Map"]));
    assert_eq!(record["variants"][0]["name"], "Optimized Performance v1");
    assert_eq!(record["variants"][0]["code"], "def sort(a):\n    return sorted(a)");
}

async fn spawn_app(state: AppState) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, create_router(state)).await.unwrap();
    });
    format!("ws://{}", addr)
}

async fn next_json<S>(stream: &mut S) -> Option<Value>
where
    S: StreamExt<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match tokio::time::timeout(Duration::from_secs(10), stream.next()).await {
            Ok(Some(Ok(Message::Text(text)))) => return Some(serde_json::from_str(&text).unwrap()),
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) => return None,
            Ok(Some(Ok(_))) => continue,
            Ok(Some(Err(_))) => return None,
            Err(_) => panic!("timed out waiting for a stream message"),
        }
    }
}

#[tokio::test]
async fn stream_reports_progress_then_completion() {
    let state = offline_state();
    let id = state.store.create(serde_json::from_value(experiment(4)).unwrap());
    let base = spawn_app(state.clone()).await;

    let (socket, _) = connect_async(format!("{}/api/experiment/stream/{}", base, id))
        .await
        .unwrap();
    let (mut write, mut read) = socket.split();

    let first = next_json(&mut read).await.unwrap();
    assert_eq!(first["type"], "progress");
    assert_eq!(first["status"], "initializing");
    assert_eq!(first["experiment_id"], id.to_string());

    tokio::spawn(codeoptim_api::pipeline::run_experiment(state.clone(), id));

    let mut complete = None;
    while let Some(message) = next_json(&mut read).await {
        if message["type"] == "complete" {
            complete = Some(message);
            break;
        }
        assert_eq!(message["type"], "progress");
    }

    let complete = complete.expect("complete message");
    assert_eq!(complete["status"], "completed");
    assert_eq!(complete["results"]["total_variants"], 4);
    assert!(complete["error"].is_null());

    let _ = write.send(Message::Close(None)).await;
}

#[tokio::test]
async fn stream_of_finished_experiment_sends_final_progress() {
    let state = offline_state();
    let id = state.store.create(serde_json::from_value(experiment(2)).unwrap());
    state.store.update(&id, |record| {
        record.status = codeoptim_core::ExperimentStatus::Completed;
        record.progress = 100;
    });
    let base = spawn_app(state).await;

    let (socket, _) = connect_async(format!("{}/api/experiment/stream/{}", base, id))
        .await
        .unwrap();
    let (_, mut read) = socket.split();

    let mut messages = Vec::new();
    while let Some(message) = next_json(&mut read).await {
        messages.push(message);
    }

    let kinds: Vec<&str> = messages.iter().map(|m| m["type"].as_str().unwrap()).collect();
    assert_eq!(kinds, vec!["progress", "complete"]);
    assert_eq!(messages[0]["status"], "completed");
    assert_eq!(messages[0]["progress"], 100);
    assert_eq!(messages[1]["status"], "completed");
}

#[tokio::test]
async fn stream_for_unknown_experiment_errors() {
    let base = spawn_app(offline_state()).await;

    let (socket, _) = connect_async(format!(
        "{}/api/experiment/stream/67e55044-10b1-426f-9247-bb680e5fe0c8",
        base
    ))
    .await
    .unwrap();
    let (_, mut read) = socket.split();

    let message = next_json(&mut read).await.unwrap();
    assert_eq!(message, json!({"type": "error", "message": "Experiment not found"}));
    assert!(next_json(&mut read).await.is_none());
}
