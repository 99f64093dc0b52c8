use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};

use crate::buffer::Buffer;
use crate::config::BatcherConfig;
use crate::message::{ItemOutcome, Message, Payload, Uid};
use crate::queue::MuxDemuxQueue;
use crate::timer::TimerManager;
use crate::IndexerAdaptorBoxed;

/// Consumes the mux side of a [`MuxDemuxQueue`], accumulates messages into
/// a [`Buffer`] under count/size/time limits, and hands completed batches to
/// an [`IndexerAdaptorBoxed`], demuxing per-item results back through the
/// queue. Exactly one `Batcher` drives a given queue's mux channel.
pub struct Batcher<A: IndexerAdaptorBoxed + 'static> {
    queue: Arc<MuxDemuxQueue>,
    config: BatcherConfig,
    indexer: Arc<A>,
}

impl<A: IndexerAdaptorBoxed + 'static> Batcher<A> {
    pub fn new(queue: Arc<MuxDemuxQueue>, config: BatcherConfig, indexer: Arc<A>) -> Self {
        Self {
            queue,
            config,
            indexer,
        }
    }

    /// Spawns the batcher's main loop as its own task and returns a handle
    /// to join plus a one-shot sender that requests graceful shutdown.
    pub fn spawn(self) -> (JoinHandle<()>, oneshot::Sender<()>) {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let handle = tokio::spawn(self.run(shutdown_rx));
        (handle, shutdown_tx)
    }

    async fn run(self, mut shutdown_rx: oneshot::Receiver<()>) {
        let mut inbound = self.queue.take_receiver();
        let mut buffer = Buffer::new(
            self.config.max_elements as usize,
            self.config.max_size as usize,
        );
        let mut timer = TimerManager::new(self.config.max_time_seconds);
        let mut flush_tasks: JoinSet<()> = JoinSet::new();

        loop {
            tokio::select! {
                biased;

                _ = &mut shutdown_rx => {
                    tracing::info!("batcher received shutdown signal, draining");
                    break;
                }

                msg = inbound.recv() => {
                    match msg {
                        Some(msg) => self.ingest(&mut buffer, &mut timer, &mut flush_tasks, msg),
                        None => {
                            tracing::info!("batcher inbound channel closed, shutting down");
                            break;
                        }
                    }
                }

                () = timer.wait_timeout() => {
                    self.trigger_flush(&mut buffer, &mut timer, &mut flush_tasks);
                }

                Some(result) = flush_tasks.join_next(), if !flush_tasks.is_empty() => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "flush task panicked");
                    }
                }
            }
        }

        // Drain whatever is already sitting in the channel, then flush the
        // final (possibly partial) batch synchronously before exit.
        while let Ok(msg) = inbound.try_recv() {
            buffer.add(msg);
        }
        self.trigger_flush(&mut buffer, &mut timer, &mut flush_tasks);

        while let Some(result) = flush_tasks.join_next().await {
            if let Err(e) = result {
                tracing::error!(error = %e, "flush task panicked during shutdown drain");
            }
        }
        tracing::info!("batcher shutdown complete");
    }

    fn ingest(
        &self,
        buffer: &mut Buffer,
        timer: &mut TimerManager,
        flush_tasks: &mut JoinSet<()>,
        msg: Message,
    ) {
        if buffer.is_empty() {
            timer.arm();
        }
        buffer.add(msg);
        if buffer.count_limit_reached() || buffer.size_limit_reached() {
            self.trigger_flush(buffer, timer, flush_tasks);
        }
    }

    fn trigger_flush(&self, buffer: &mut Buffer, timer: &mut TimerManager, flush_tasks: &mut JoinSet<()>) {
        timer.reset();
        let snapshot = buffer.snapshot_and_reset();
        if snapshot.is_empty() {
            return;
        }
        let queue = Arc::clone(&self.queue);
        let indexer = Arc::clone(&self.indexer);
        flush_tasks.spawn(async move {
            Self::flush(queue, indexer, snapshot).await;
        });
    }

    async fn flush(queue: Arc<MuxDemuxQueue>, indexer: Arc<A>, snapshot: Vec<Message>) {
        let uids: Vec<Uid> = snapshot.iter().map(|m| m.uid).collect();
        let items = snapshot
            .into_iter()
            .map(|m| {
                let Message { uid, payload } = m;
                let doc = match payload {
                    Payload::Document(doc) => doc,
                    Payload::Outcome(_) => serde_json::Value::Null,
                };
                crate::message::BulkItem { uid, doc }
            })
            .collect();

        match indexer.bulk_boxed(items).await {
            Ok(outcomes) if outcomes.len() == uids.len() => {
                for (uid, outcome) in uids.into_iter().zip(outcomes) {
                    queue.send_to_demux(Message::outcome(uid, outcome));
                }
            }
            Ok(outcomes) => {
                tracing::error!(
                    expected = uids.len(),
                    got = outcomes.len(),
                    "bulk response item count did not match the batch size"
                );
                for uid in uids {
                    queue.send_to_demux(Message::outcome(
                        uid,
                        ItemOutcome::Failure {
                            status: 500,
                            reason: "indexer returned a mismatched number of results".to_string(),
                        },
                    ));
                }
            }
            Err(e) => {
                tracing::error!(error = %e, "bulk write failed, synthesizing per-item failures");
                for uid in uids {
                    queue.send_to_demux(Message::outcome(
                        uid,
                        ItemOutcome::Failure {
                            status: 502,
                            reason: e.to_string(),
                        },
                    ));
                }
            }
        }
    }
}
