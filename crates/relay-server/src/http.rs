//! The thin HTTP surface: `POST /events/stateful` expands a list of
//! events into N concurrent `submit()` calls and demultiplexes the
//! per-item indexer results back into one JSON response, keyed by
//! submission order. Routing, JSON (de)serialization, and auth are the
//! only concerns here — everything else is delegated to `relay-client`.

use std::collections::HashMap;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use relay_client::{ProducerClient, SubmitError};
use relay_core::ItemOutcome;
use serde::{Deserialize, Serialize};

/// Per-request deadline each individual `submit()` call races against.
/// Comfortably inside the 30s request-level timeout so a producer always
/// observes its own `Timeout` before the request layer cuts it off.
const SUBMIT_DEADLINE: Duration = Duration::from_secs(20);

/// Whole-request timeout enforced around the handler.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    pub client: ProducerClient,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events/stateful", post(post_stateful_events))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct StatefulEventsRequest {
    events: Vec<serde_json::Value>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "status")]
enum EventResult {
    #[serde(rename = "success")]
    Success { http_status: u16 },
    #[serde(rename = "error")]
    Error { http_status: u16, reason: String },
}

impl From<ItemOutcome> for EventResult {
    fn from(outcome: ItemOutcome) -> Self {
        match outcome {
            ItemOutcome::Success { status } => EventResult::Success { http_status: status },
            ItemOutcome::Failure { status, reason } => EventResult::Error {
                http_status: status,
                reason,
            },
        }
    }
}

async fn post_stateful_events(
    State(state): State<AppState>,
    Json(request): Json<StatefulEventsRequest>,
) -> Response {
    match tokio::time::timeout(REQUEST_TIMEOUT, handle(state, request)).await {
        Ok(response) => response,
        Err(_) => submit_error_response(SubmitError::Timeout),
    }
}

async fn handle(state: AppState, request: StatefulEventsRequest) -> Response {
    let submissions = request
        .events
        .into_iter()
        .map(|event| {
            let client = state.client.clone();
            tokio::spawn(async move { client.submit(event, SUBMIT_DEADLINE).await })
        })
        .collect::<Vec<_>>();

    let mut results = HashMap::with_capacity(submissions.len());
    for (index, task) in submissions.into_iter().enumerate() {
        let outcome = match task.await {
            Ok(Ok(outcome)) => EventResult::from(outcome),
            // Per-item indexer failures demux into the keyed response
            // alongside any successes, never collapsing the whole
            // request — only a producer-level error (timeout, shutdown,
            // validation) aborts the request early.
            Ok(Err(SubmitError::IndexerItemFailure { status, reason })) => {
                EventResult::Error { http_status: status, reason }
            }
            Ok(Err(SubmitError::IndexerBulkFailure { reason })) => {
                EventResult::Error { http_status: 502, reason }
            }
            Ok(Err(e)) => return submit_error_response(e),
            Err(e) => {
                tracing::error!(error = %e, "submission task panicked");
                return (StatusCode::INTERNAL_SERVER_ERROR, "internal error").into_response();
            }
        };
        results.insert(index.to_string(), outcome);
    }

    Json(results).into_response()
}

fn submit_error_response(err: SubmitError) -> Response {
    let status = match &err {
        SubmitError::Validation(_) => StatusCode::BAD_REQUEST,
        SubmitError::Timeout => StatusCode::GATEWAY_TIMEOUT,
        SubmitError::ShuttingDown => StatusCode::SERVICE_UNAVAILABLE,
        SubmitError::IndexerBulkFailure { .. } | SubmitError::IndexerItemFailure { .. } => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, err.to_string()).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use relay_core::{Batcher, BatcherConfig, IndexerError, MuxDemuxQueue};
    use std::sync::Arc;
    use tower::ServiceExt;

    struct EchoIndexer;

    impl relay_core::IndexerAdaptor for EchoIndexer {
        async fn bulk(
            &self,
            items: Vec<relay_core::message::BulkItem>,
        ) -> Result<Vec<ItemOutcome>, IndexerError> {
            Ok(items
                .into_iter()
                .map(|_| ItemOutcome::Success { status: 201 })
                .collect())
        }
    }

    fn test_app() -> Router {
        let queue = Arc::new(MuxDemuxQueue::new(64));
        let config = BatcherConfig::new(100, 1_000_000, 60.0).unwrap();
        let batcher = Batcher::new(Arc::clone(&queue), config, Arc::new(EchoIndexer));
        let (_handle, _shutdown_tx) = batcher.spawn();
        let client = ProducerClient::new(queue);
        router(AppState { client })
    }

    #[tokio::test]
    async fn posts_two_events_and_gets_keyed_results() {
        let app = test_app();
        let body = serde_json::json!({ "events": [{"a": 1}, {"a": 2}] });
        let response = app
            .oneshot(
                Request::post("/events/stateful")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert!(parsed.get("0").is_some());
        assert!(parsed.get("1").is_some());
    }

    struct PartialFailureIndexer;

    impl relay_core::IndexerAdaptor for PartialFailureIndexer {
        async fn bulk(
            &self,
            items: Vec<relay_core::message::BulkItem>,
        ) -> Result<Vec<ItemOutcome>, IndexerError> {
            Ok(items
                .into_iter()
                .enumerate()
                .map(|(i, _)| {
                    if i == 0 {
                        ItemOutcome::Success { status: 201 }
                    } else {
                        ItemOutcome::Failure {
                            status: 400,
                            reason: "bad".to_string(),
                        }
                    }
                })
                .collect())
        }
    }

    #[tokio::test]
    async fn partial_item_failure_is_demuxed_into_keyed_response_with_200() {
        let queue = Arc::new(MuxDemuxQueue::new(64));
        let config = BatcherConfig::new(2, 1_000_000, 60.0).unwrap();
        let batcher = Batcher::new(Arc::clone(&queue), config, Arc::new(PartialFailureIndexer));
        let (_handle, _shutdown_tx) = batcher.spawn();
        let client = ProducerClient::new(queue);
        let app = router(AppState { client });

        let body = serde_json::json!({ "events": [{"a": 1}, {"a": 2}] });
        let response = app
            .oneshot(
                Request::post("/events/stateful")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let parsed: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        let statuses: std::collections::BTreeSet<&str> = ["0", "1"]
            .into_iter()
            .map(|key| parsed[key]["status"].as_str().unwrap())
            .collect();
        assert_eq!(
            statuses,
            std::collections::BTreeSet::from(["success", "error"])
        );
    }

    #[tokio::test]
    async fn rejects_null_event_with_400() {
        let app = test_app();
        let body = serde_json::json!({ "events": [serde_json::Value::Null] });
        let response = app
            .oneshot(
                Request::post("/events/stateful")
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
