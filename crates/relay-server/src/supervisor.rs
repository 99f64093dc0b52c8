//! Runtime Supervisor: owns the mux/demux queue and the batcher worker,
//! hands out a client handle to the HTTP surface via explicit dependency
//! injection, and drives graceful teardown.

use std::sync::Arc;

use relay_client::ProducerClient;
use relay_core::{Batcher, BatcherConfig, IndexerAdaptorBoxed, MuxDemuxQueue};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Bound inbound channel capacity for the mux side. Producers block on
/// `send_to_mux` if this is saturated; sized generously relative to
/// typical batch sizes so it only matters under sustained overload.
const MUX_CHANNEL_CAPACITY: usize = 4096;

pub struct RuntimeSupervisor {
    queue: Arc<MuxDemuxQueue>,
    batcher_handle: Option<JoinHandle<()>>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl RuntimeSupervisor {
    /// Constructs the queue, starts the batcher worker against `indexer`,
    /// and returns the supervisor plus the producer client handle that
    /// the HTTP surface hands to each request.
    pub fn start<A: IndexerAdaptorBoxed + 'static>(
        config: BatcherConfig,
        indexer: Arc<A>,
    ) -> (Self, ProducerClient) {
        let queue = Arc::new(MuxDemuxQueue::new(MUX_CHANNEL_CAPACITY));
        let batcher = Batcher::new(Arc::clone(&queue), config, indexer);
        let (batcher_handle, shutdown_tx) = batcher.spawn();
        let client = ProducerClient::new(Arc::clone(&queue));

        (
            Self {
                queue,
                batcher_handle: Some(batcher_handle),
                shutdown_tx: Some(shutdown_tx),
            },
            client,
        )
    }

    /// Signals the batcher to stop, waits for its final flush and any
    /// in-flight flush tasks to drain, then closes the queue so later
    /// `submit` calls are rejected with `ShuttingDown`.
    pub async fn shutdown(mut self) {
        self.queue.close();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.batcher_handle.take() {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "batcher task panicked during shutdown");
            }
        }
    }
}
