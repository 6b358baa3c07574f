use crate::StreamError;
use crate::config::StreamConfig;
use crate::frame::FrameBaker;
use crate::queue::{CancelToken, QueueConsumer, work_queues};
use crate::streamer::{StreamStats, Streamer};
use crate::tracker::SectorTracker;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use glam::DVec2;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;
use tessera_bake::{Baker, PhysicsWorld, RenderDevice};
use tessera_common::WorldChunkCoord;
use tessera_kernel::{BlockTypeDictionary, EventPublisher, Terrain};
use tessera_persist::SectorStore;
use tessera_worldgen::TerrainGenerator;

#[derive(Debug, Clone, Copy)]
enum Command {
    EntityMoved(DVec2),
    Rebake(WorldChunkCoord),
    Flush,
}

/// Runs a [`Streamer`] on a dedicated background thread.
///
/// The game loop reports movement and rebake requests through this handle and
/// drains the resulting work with a [`FrameBaker`] on its own thread.
pub struct StreamingManager {
    commands: Option<Sender<Command>>,
    cancel: CancelToken,
    worker: Option<JoinHandle<StreamStats>>,
    terrain: Arc<Terrain>,
    tracker: Arc<SectorTracker>,
    config: StreamConfig,
}

impl StreamingManager {
    /// Spawn the streaming thread. Returns the manager and the consumer end of
    /// the bake and destroy queues.
    pub fn start(
        config: StreamConfig,
        terrain: Arc<Terrain>,
        generator: Arc<TerrainGenerator>,
        dictionary: Arc<BlockTypeDictionary>,
        events: EventPublisher,
    ) -> Result<(Self, QueueConsumer), StreamError> {
        config.validate()?;
        let store = config.save_dir.as_ref().map(SectorStore::open).transpose()?;
        let (producer, consumer) = work_queues(config.queue_capacity, config.poll_interval());
        let (command_tx, command_rx) = crossbeam_channel::unbounded();
        let tracker = Arc::new(SectorTracker::new());
        let cancel = CancelToken::new();

        let streamer = Streamer::new(
            config.clone(),
            Arc::clone(&terrain),
            store,
            generator,
            dictionary,
            Arc::clone(&tracker),
            producer,
            events,
            cancel.clone(),
        );
        let worker = std::thread::Builder::new()
            .name("tessera-stream".into())
            .spawn({
                let cancel = cancel.clone();
                let poll = config.poll_interval();
                move || run(streamer, command_rx, cancel, poll)
            })?;
        tracing::info!(
            view_radius = config.view_radius,
            persistent = config.save_dir.is_some(),
            "streaming started"
        );

        Ok((
            Self {
                commands: Some(command_tx),
                cancel,
                worker: Some(worker),
                terrain,
                tracker,
                config,
            },
            consumer,
        ))
    }

    /// Build the main-thread consumer for this manager's queues.
    pub fn frame_baker<R: RenderDevice, P: PhysicsWorld>(
        &self,
        baker: Baker<R, P>,
        consumer: QueueConsumer,
        events: EventPublisher,
    ) -> FrameBaker<R, P> {
        FrameBaker::new(
            baker,
            consumer,
            Arc::clone(&self.terrain),
            Arc::clone(&self.tracker),
            events,
            &self.config,
        )
    }

    pub fn on_entity_moved(&self, position: DVec2) -> Result<(), StreamError> {
        self.send(Command::EntityMoved(position))
    }

    /// Ask for a chunk to be recomputed and baked again after an edit.
    pub fn request_rebake(&self, coord: WorldChunkCoord) -> Result<(), StreamError> {
        self.send(Command::Rebake(coord))
    }

    /// Ask the worker to save every resident sector.
    pub fn flush(&self) -> Result<(), StreamError> {
        self.send(Command::Flush)
    }

    fn send(&self, command: Command) -> Result<(), StreamError> {
        let tx = self.commands.as_ref().ok_or(StreamError::WorkerStopped)?;
        tx.send(command).map_err(|_| StreamError::WorkerStopped)
    }

    pub fn terrain(&self) -> &Arc<Terrain> {
        &self.terrain
    }

    pub fn tracker(&self) -> &Arc<SectorTracker> {
        &self.tracker
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn is_running(&self) -> bool {
        self.worker.as_ref().is_some_and(|w| !w.is_finished())
    }

    /// Stop the worker, wait for it, and return its final statistics.
    pub fn shutdown(mut self) -> Result<StreamStats, StreamError> {
        self.stop().ok_or(StreamError::WorkerStopped)?
    }

    fn stop(&mut self) -> Option<Result<StreamStats, StreamError>> {
        let worker = self.worker.take()?;
        self.cancel.cancel();
        self.commands = None;
        Some(worker.join().map_err(|_| StreamError::WorkerPanicked))
    }
}

impl Drop for StreamingManager {
    fn drop(&mut self) {
        if let Some(Err(e)) = self.stop() {
            tracing::error!(error = %e, "streaming worker did not stop cleanly");
        }
    }
}

fn run(
    mut streamer: Streamer,
    commands: Receiver<Command>,
    cancel: CancelToken,
    poll: Duration,
) -> StreamStats {
    let _span = tracing::info_span!("stream_worker").entered();
    while !cancel.is_cancelled() {
        let first = match commands.recv_timeout(poll) {
            Ok(command) => command,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        };
        let batch = std::iter::once(first).chain(commands.try_iter());
        match apply(&mut streamer, batch) {
            Ok(()) => {}
            Err(StreamError::Cancelled) => break,
            Err(e) => {
                tracing::error!(error = %e, "streaming worker stopping");
                break;
            }
        }
    }

    if streamer.config().save_on_shutdown {
        streamer.flush();
    }
    tracing::info!(stats = ?streamer.stats(), "streaming stopped");
    streamer.stats().clone()
}

/// Apply a batch of commands. Moves only update the target, so a burst of
/// movement costs a single refresh.
fn apply(
    streamer: &mut Streamer,
    batch: impl Iterator<Item = Command>,
) -> Result<(), StreamError> {
    let mut rebakes = Vec::new();
    let mut flush = false;
    for command in batch {
        match command {
            Command::EntityMoved(position) => {
                streamer.on_entity_moved(position);
            }
            Command::Rebake(coord) => rebakes.push(coord),
            Command::Flush => flush = true,
        }
    }
    streamer.tick()?;
    for coord in rebakes {
        streamer.rebake_chunk(coord)?;
    }
    if flush {
        streamer.flush();
    }
    Ok(())
}
