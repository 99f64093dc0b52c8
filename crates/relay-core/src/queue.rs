use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::message::{Message, Uid};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("duplicate correlation id")]
    DuplicateUid,
    #[error("response not received before deadline")]
    Timeout,
    #[error("queue is shutting down")]
    ShuttingDown,
}

/// Two-directional routing fabric: a single shared mux channel from many
/// producers to the one batcher consumer, and a per-`uid` demux slot
/// table routing each response back to its originating producer.
///
/// The mux receiver is taken out exactly once by the batcher; the demux
/// table is a plain `Mutex<HashMap<..>>` since its critical sections are
/// O(1) hash operations never held across an `.await`.
pub struct MuxDemuxQueue {
    inbound_tx: mpsc::Sender<Message>,
    inbound_rx: Mutex<Option<mpsc::Receiver<Message>>>,
    slots: Mutex<HashMap<Uid, oneshot::Sender<Message>>>,
    closed: AtomicBool,
}

impl MuxDemuxQueue {
    pub fn new(inbound_capacity: usize) -> Self {
        let (inbound_tx, inbound_rx) = mpsc::channel(inbound_capacity);
        Self {
            inbound_tx,
            inbound_rx: Mutex::new(Some(inbound_rx)),
            slots: Mutex::new(HashMap::new()),
            closed: AtomicBool::new(false),
        }
    }

    /// Taken exactly once by the batcher worker at startup.
    pub fn take_receiver(&self) -> mpsc::Receiver<Message> {
        self.inbound_rx
            .lock()
            .unwrap()
            .take()
            .expect("mux receiver already taken")
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Producer-side: register a fresh single-slot rendezvous for `uid`.
    pub fn subscribe(&self, uid: Uid) -> Result<oneshot::Receiver<Message>, QueueError> {
        if self.is_closed() {
            return Err(QueueError::ShuttingDown);
        }
        let (tx, rx) = oneshot::channel();
        let mut slots = self.slots.lock().unwrap();
        if slots.contains_key(&uid) {
            return Err(QueueError::DuplicateUid);
        }
        slots.insert(uid, tx);
        Ok(rx)
    }

    /// Producer-side: enqueue a message on the shared inbound channel.
    pub async fn send_to_mux(&self, msg: Message) -> Result<(), QueueError> {
        if self.is_closed() {
            return Err(QueueError::ShuttingDown);
        }
        self.inbound_tx
            .send(msg)
            .await
            .map_err(|_| QueueError::ShuttingDown)
    }

    /// Producer-side: block until the response for `uid` is deposited, or
    /// the deadline elapses. The slot is removed on every exit path.
    pub async fn await_response(
        &self,
        uid: Uid,
        rx: oneshot::Receiver<Message>,
        deadline: Duration,
    ) -> Result<Message, QueueError> {
        let result = tokio::time::timeout(deadline, rx).await;
        self.slots.lock().unwrap().remove(&uid);
        match result {
            Ok(Ok(msg)) => Ok(msg),
            Ok(Err(_)) => Err(QueueError::ShuttingDown),
            Err(_) => Err(QueueError::Timeout),
        }
    }

    /// Batcher-side: deposit a response into its originating slot. Drops
    /// and logs a warning if the uid is unknown (producer already timed
    /// out, or this is a programming error).
    pub fn send_to_demux(&self, msg: Message) {
        let sender = self.slots.lock().unwrap().remove(&msg.uid);
        match sender {
            Some(tx) => {
                let _ = tx.send(msg);
            }
            None => {
                tracing::warn!(uid = %msg.uid, "dropping response for unknown or expired uid");
            }
        }
    }
}
