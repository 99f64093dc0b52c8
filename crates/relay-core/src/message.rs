use thiserror::Error;
use uuid::Uuid;

/// Correlation identifier tagging a submitted event and its eventual
/// response. 128-bit random is sufficient to make collisions practically
/// impossible across the lifetime of a process.
pub type Uid = Uuid;

/// The envelope that flows through the mux/demux queue in both directions.
#[derive(Debug, Clone)]
pub struct Message {
    pub uid: Uid,
    pub payload: Payload,
}

impl Message {
    pub fn document(uid: Uid, doc: serde_json::Value) -> Self {
        Self {
            uid,
            payload: Payload::Document(doc),
        }
    }

    pub fn outcome(uid: Uid, outcome: ItemOutcome) -> Self {
        Self {
            uid,
            payload: Payload::Outcome(outcome),
        }
    }

    /// Byte-size used for the buffer's size-based flush trigger. Only
    /// meaningful for [`Payload::Document`] — response messages never pass
    /// through the buffer.
    pub fn size(&self) -> usize {
        match &self.payload {
            Payload::Document(v) => serde_json::to_vec(v).map(|b| b.len()).unwrap_or(0),
            Payload::Outcome(_) => 0,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Payload {
    /// A producer-submitted document destined for the indexer.
    Document(serde_json::Value),
    /// A per-item result demuxed back to the originating producer.
    Outcome(ItemOutcome),
}

/// One item in a batch handed to the [`crate::IndexerAdaptor`].
#[derive(Debug, Clone)]
pub struct BulkItem {
    pub uid: Uid,
    pub doc: serde_json::Value,
}

/// Result of a single document's bulk create operation.
#[derive(Debug, Clone)]
pub enum ItemOutcome {
    Success { status: u16 },
    Failure { status: u16, reason: String },
}

/// Whole-batch failure from the Indexer Adaptor, after its own retries and
/// circuit-breaking are exhausted.
#[derive(Debug, Error, Clone)]
pub enum IndexerError {
    #[error("bulk request failed: {reason}")]
    BulkFailure { reason: String },
    #[error("bulk response item count mismatch: expected {expected}, got {got}")]
    CountMismatch { expected: usize, got: usize },
}
