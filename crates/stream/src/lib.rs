//! Streaming: keeps the sectors around a tracked entity resident and baked.
//!
//! # Invariants
//! - After settling, the resident set is exactly the target set around the
//!   tracked sector; only resident sectors are ever evicted.
//! - Evicted sectors are saved before their chunks are destroyed.
//! - Bake and destroy queues are bounded FIFOs; a full queue blocks the
//!   producer and never drops work.
//! - Work tagged with an old residency epoch never touches a newer residency.
//!
//! # Workaround
//! Bakes are drained by [`FrameBaker::tick`] on the caller's thread under a
//! fixed per-tick budget instead of a time-sliced scheduler.

mod config;
mod frame;
mod manager;
mod plan;
mod queue;
mod streamer;
mod tracker;

pub use config::StreamConfig;
pub use frame::{FrameBaker, FrameStats, TickHistory};
pub use manager::StreamingManager;
pub use plan::{StreamPlan, plan, target_set};
pub use queue::{
    BakeRequest, CancelToken, DestroyRequest, QueueConsumer, QueueProducer, work_queues,
};
pub use streamer::{StreamStats, Streamer};
pub use tracker::{SectorState, SectorTracker};

use tessera_persist::PersistError;
use tessera_worldgen::GeneratorError;

#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    #[error("persistence error: {0}")]
    Persist(#[from] PersistError),
    #[error("generator error: {0}")]
    Generator(#[from] GeneratorError),
    #[error("invalid stream config: {0}")]
    InvalidConfig(String),
    #[error("config parse error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("streaming cancelled")]
    Cancelled,
    #[error("{0} queue closed")]
    QueueClosed(&'static str),
    #[error("streaming worker stopped")]
    WorkerStopped,
    #[error("streaming worker panicked")]
    WorkerPanicked,
}
