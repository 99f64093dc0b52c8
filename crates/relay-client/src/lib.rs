//! Producer-side client: submit one event, await its demuxed response.
//!
//! A thin wrapper over [`relay_core::MuxDemuxQueue`] that owns the
//! subscribe → send → await lifecycle for a single submission and
//! guarantees slot cleanup on every exit path.

use std::sync::Arc;
use std::time::Duration;

use relay_core::{ItemOutcome, Message, MuxDemuxQueue, Payload, QueueError, Uid};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The payload was rejected before it ever reached the queue.
    #[error("validation error: {0}")]
    Validation(String),
    /// No response arrived before the caller's deadline.
    #[error("timed out waiting for a response")]
    Timeout,
    /// The relay is shutting down and refuses new submissions.
    #[error("relay is shutting down")]
    ShuttingDown,
    /// A whole-batch failure was synthesized by the batcher for this item.
    #[error("indexer bulk failure: {reason}")]
    IndexerBulkFailure { reason: String },
    /// A per-item failure reported inside an otherwise successful bulk call.
    #[error("indexer item failure (status {status}): {reason}")]
    IndexerItemFailure { status: u16, reason: String },
}

impl From<QueueError> for SubmitError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::Timeout => Self::Timeout,
            QueueError::ShuttingDown => Self::ShuttingDown,
            QueueError::DuplicateUid => {
                unreachable!("uid is freshly generated per submission")
            }
        }
    }
}

/// Handle producers use to submit one event and await its outcome.
///
/// Cheap to clone: internally an `Arc` around the shared queue.
#[derive(Clone)]
pub struct ProducerClient {
    queue: Arc<MuxDemuxQueue>,
}

impl ProducerClient {
    pub fn new(queue: Arc<MuxDemuxQueue>) -> Self {
        Self { queue }
    }

    /// Validates, submits, and waits for the demuxed result of a single
    /// document. The slot is removed on every exit path: success, timeout,
    /// or shutdown.
    pub async fn submit(
        &self,
        payload: serde_json::Value,
        deadline: Duration,
    ) -> Result<ItemOutcome, SubmitError> {
        validate(&payload)?;

        let uid = Uid::new_v4();
        let rx = self.queue.subscribe(uid)?;
        self.queue.send_to_mux(Message::document(uid, payload)).await?;
        let response = self.queue.await_response(uid, rx, deadline).await?;

        match response.payload {
            Payload::Outcome(outcome) => to_result(outcome),
            Payload::Document(_) => {
                unreachable!("demux slots only ever receive Outcome payloads")
            }
        }
    }
}

fn to_result(outcome: ItemOutcome) -> Result<ItemOutcome, SubmitError> {
    match &outcome {
        ItemOutcome::Success { .. } => Ok(outcome),
        ItemOutcome::Failure { status, reason } if *status == 502 => {
            Err(SubmitError::IndexerBulkFailure {
                reason: reason.clone(),
            })
        }
        ItemOutcome::Failure { status, reason } => Err(SubmitError::IndexerItemFailure {
            status: *status,
            reason: reason.clone(),
        }),
    }
}

fn validate(payload: &serde_json::Value) -> Result<(), SubmitError> {
    match payload {
        serde_json::Value::Null => Err(SubmitError::Validation("event payload is null".into())),
        serde_json::Value::Object(map) if map.is_empty() => {
            Err(SubmitError::Validation("event payload is an empty object".into()))
        }
        _ => Ok(()),
    }
}
