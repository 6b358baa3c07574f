use crate::StreamError;
use crossbeam_channel::{Receiver, SendTimeoutError, Sender};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tessera_bake::ChunkArtifacts;
use tessera_common::WorldChunkCoord;

/// A chunk ready to be baked, tagged with its sector's residency epoch.
#[derive(Debug, Clone)]
pub struct BakeRequest {
    pub artifacts: ChunkArtifacts,
    pub epoch: u64,
}

/// A chunk whose baked resources should be released.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DestroyRequest {
    pub coord: WorldChunkCoord,
    pub epoch: u64,
}

/// Shared stop flag for the streaming worker and anything it blocks on.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Producer half of the bake and destroy queues, held by the streamer.
#[derive(Debug, Clone)]
pub struct QueueProducer {
    bakes: Sender<BakeRequest>,
    destroys: Sender<DestroyRequest>,
    poll: Duration,
}

/// Consumer half, drained on the thread that owns the baker.
#[derive(Debug)]
pub struct QueueConsumer {
    pub(crate) bakes: Receiver<BakeRequest>,
    pub(crate) destroys: Receiver<DestroyRequest>,
}

/// Bounded FIFO bake and destroy queues of the given capacity each.
pub fn work_queues(capacity: usize, poll: Duration) -> (QueueProducer, QueueConsumer) {
    let (bake_tx, bake_rx) = crossbeam_channel::bounded(capacity);
    let (destroy_tx, destroy_rx) = crossbeam_channel::bounded(capacity);
    (
        QueueProducer {
            bakes: bake_tx,
            destroys: destroy_tx,
            poll,
        },
        QueueConsumer {
            bakes: bake_rx,
            destroys: destroy_rx,
        },
    )
}

impl QueueProducer {
    /// Blocks while the queue is full. Returns `Cancelled` if the token fires
    /// while waiting.
    pub fn queue_bake(&self, request: BakeRequest, cancel: &CancelToken) -> Result<(), StreamError> {
        send_blocking(&self.bakes, request, cancel, self.poll, "bake")
    }

    pub fn queue_destroy(
        &self,
        request: DestroyRequest,
        cancel: &CancelToken,
    ) -> Result<(), StreamError> {
        send_blocking(&self.destroys, request, cancel, self.poll, "destroy")
    }
}

impl QueueConsumer {
    pub fn pending_bakes(&self) -> usize {
        self.bakes.len()
    }

    pub fn pending_destroys(&self) -> usize {
        self.destroys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bakes.is_empty() && self.destroys.is_empty()
    }
}

fn send_blocking<T>(
    tx: &Sender<T>,
    mut item: T,
    cancel: &CancelToken,
    poll: Duration,
    queue: &'static str,
) -> Result<(), StreamError> {
    let mut waited = false;
    loop {
        if cancel.is_cancelled() {
            return Err(StreamError::Cancelled);
        }
        match tx.send_timeout(item, poll) {
            Ok(()) => return Ok(()),
            Err(SendTimeoutError::Timeout(back)) => {
                if !waited {
                    tracing::debug!(queue, "queue full; waiting for the frame baker");
                    waited = true;
                }
                item = back;
            }
            Err(SendTimeoutError::Disconnected(_)) => {
                return Err(StreamError::QueueClosed(queue));
            }
        }
    }
}
