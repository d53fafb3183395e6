//! Experiment progress over WebSocket.

use crate::{handlers::parse_id, AppState};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, State,
    },
    response::Response,
};
use chrono::{DateTime, Utc};
use codeoptim_core::{ExperimentId, ExperimentResults, ExperimentStatus};
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StreamMessage {
    Progress {
        experiment_id: ExperimentId,
        status: ExperimentStatus,
        progress: u8,
        variants_count: usize,
        timestamp: DateTime<Utc>,
    },
    Complete {
        experiment_id: ExperimentId,
        status: ExperimentStatus,
        results: Option<ExperimentResults>,
        error: Option<String>,
    },
    Error {
        message: String,
    },
}

pub async fn stream_experiment(
    ws: WebSocketUpgrade,
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Response {
    let experiment_id = parse_id(&id).ok();
    ws.on_upgrade(move |socket| handle_stream(socket, state, experiment_id))
}

async fn send(sender: &mut futures::stream::SplitSink<WebSocket, Message>, message: &StreamMessage) -> bool {
    let text = serde_json::to_string(message).unwrap_or_default();
    sender.send(Message::Text(text.into())).await.is_ok()
}

/// Poll the store until the experiment ends or the client goes away.
async fn handle_stream(socket: WebSocket, state: AppState, id: Option<ExperimentId>) {
    let (mut sender, mut receiver) = socket.split();
    let poll = Duration::from_millis(state.experiment_settings().stream_poll_interval_ms);
    let mut ticker = interval(poll);
    let mut last_seen: Option<(ExperimentStatus, u8)> = None;

    info!("Progress stream opened");

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let Some(record) = id.and_then(|id| state.store.get(&id)) else {
                    let message = StreamMessage::Error { message: "Experiment not found".to_string() };
                    send(&mut sender, &message).await;
                    break;
                };

                // Final progress precedes completion.
                let current = (record.status, record.progress);
                if last_seen != Some(current) {
                    last_seen = Some(current);
                    let message = StreamMessage::Progress {
                        experiment_id: record.id,
                        status: record.status,
                        progress: record.progress,
                        variants_count: record.variants.len(),
                        timestamp: Utc::now(),
                    };
                    if !send(&mut sender, &message).await {
                        break;
                    }
                }

                if record.status.is_terminal() {
                    let message = StreamMessage::Complete {
                        experiment_id: record.id,
                        status: record.status,
                        results: record.results,
                        error: record.error,
                    };
                    send(&mut sender, &message).await;
                    break;
                }
            }

            msg = receiver.next() => {
                match msg {
                    None | Some(Err(_)) | Some(Ok(Message::Close(_))) => {
                        debug!("Client closed progress stream");
                        break;
                    }
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;
    info!("Progress stream closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn messages_are_tagged_by_type() {
        let progress = serde_json::to_value(StreamMessage::Progress {
            experiment_id: Uuid::nil(),
            status: ExperimentStatus::Generating,
            progress: 40,
            variants_count: 2,
            timestamp: Utc::now(),
        })
        .unwrap();
        assert_eq!(progress["type"], "progress");
        assert_eq!(progress["status"], "generating");
        assert_eq!(progress["progress"], 40);

        let error = serde_json::to_value(StreamMessage::Error {
            message: "Experiment not found".to_string(),
        })
        .unwrap();
        assert_eq!(error, serde_json::json!({"type": "error", "message": "Experiment not found"}));
    }
}
