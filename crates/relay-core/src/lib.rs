//! Core of the batching mux/demux relay: the message envelope, the bounded
//! buffer, the restartable deadline timer, the mux/demux queue, and the
//! batcher that ties them together.
//!
//! Uses native async fn in traits (Rust 2024 edition idiom) for the
//! [`IndexerAdaptor`] contract instead of `#[async_trait]`; a boxed sibling
//! trait is provided for object-safe dynamic dispatch.

pub mod batcher;
pub mod buffer;
pub mod config;
pub mod message;
pub mod queue;
pub mod timer;

pub use batcher::Batcher;
pub use buffer::Buffer;
pub use config::{BatcherConfig, ConfigError};
pub use message::{IndexerError, ItemOutcome, Message, Payload, Uid};
pub use queue::{MuxDemuxQueue, QueueError};
pub use timer::TimerManager;

use std::future::Future;
use std::pin::Pin;

/// Contract between the Batcher and the bulk-indexing backend: an ordered
/// batch of documents in, an ordered batch of per-item results out.
///
/// Implementors own any transport-level resilience (retry, circuit
/// breaking) — the Batcher itself never retries a failed bulk call.
pub trait IndexerAdaptor: Send + Sync {
    fn bulk(
        &self,
        items: Vec<message::BulkItem>,
    ) -> impl Future<Output = Result<Vec<ItemOutcome>, IndexerError>> + Send;
}

/// Object-safe version of [`IndexerAdaptor`] for `Arc<dyn ...>` storage.
pub trait IndexerAdaptorBoxed: Send + Sync {
    fn bulk_boxed(
        &self,
        items: Vec<message::BulkItem>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ItemOutcome>, IndexerError>> + Send + '_>>;
}

impl<T: IndexerAdaptor> IndexerAdaptorBoxed for T {
    fn bulk_boxed(
        &self,
        items: Vec<message::BulkItem>,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ItemOutcome>, IndexerError>> + Send + '_>> {
        Box::pin(self.bulk(items))
    }
}
