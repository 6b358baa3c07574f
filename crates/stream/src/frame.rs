use crate::config::StreamConfig;
use crate::queue::QueueConsumer;
use crate::tracker::SectorTracker;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tessera_bake::{Baker, PhysicsWorld, RenderDevice};
use tessera_kernel::{EventPublisher, Terrain, TerrainEvent};

/// Per-tick baking statistics for instrumentation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub bakes: usize,
    pub destroys: usize,
    pub stale_bakes: usize,
    pub stale_destroys: usize,
    /// Requests still queued after the tick.
    pub pending: usize,
    pub elapsed: Duration,
}

/// Main-thread end of the streaming pipeline.
///
/// Each [`tick`](Self::tick) drains at most the configured number of bakes,
/// then at most the configured number of destroys, creating and releasing
/// render and physics objects through the owned [`Baker`].
pub struct FrameBaker<R: RenderDevice, P: PhysicsWorld> {
    baker: Baker<R, P>,
    consumer: QueueConsumer,
    terrain: Arc<Terrain>,
    tracker: Arc<SectorTracker>,
    events: EventPublisher,
    bakes_per_tick: usize,
    destroys_per_tick: usize,
    history: TickHistory,
}

impl<R: RenderDevice, P: PhysicsWorld> FrameBaker<R, P> {
    pub fn new(
        baker: Baker<R, P>,
        consumer: QueueConsumer,
        terrain: Arc<Terrain>,
        tracker: Arc<SectorTracker>,
        events: EventPublisher,
        config: &StreamConfig,
    ) -> Self {
        Self {
            baker,
            consumer,
            terrain,
            tracker,
            events,
            bakes_per_tick: config.bakes_per_tick,
            destroys_per_tick: config.destroys_per_tick,
            history: TickHistory::new(120),
        }
    }

    pub fn tick(&mut self) -> FrameStats {
        let _span = tracing::trace_span!("frame_bake").entered();
        let start = Instant::now();
        let mut stats = FrameStats::default();

        for request in self.consumer.bakes.try_iter().take(self.bakes_per_tick) {
            let coord = request.artifacts.coord;
            let sector = coord.sector();
            if self.terrain.epoch_of(sector) != Some(request.epoch) {
                stats.stale_bakes += 1;
                continue;
            }
            let replaced = self.baker.bake_chunk(request.artifacts, request.epoch);
            // A rebake within the same residency is not new progress.
            if replaced != Some(request.epoch) {
                self.tracker.chunk_baked(sector, request.epoch);
            }
            self.events.publish(TerrainEvent::ChunkBaked { coord });
            stats.bakes += 1;
        }

        for request in self.consumer.destroys.try_iter().take(self.destroys_per_tick) {
            if self.baker.destroy_chunk(request.coord, request.epoch) {
                self.events
                    .publish(TerrainEvent::ChunkDestroyed { coord: request.coord });
                stats.destroys += 1;
            } else {
                stats.stale_destroys += 1;
            }
        }

        stats.pending = self.consumer.pending_bakes() + self.consumer.pending_destroys();
        stats.elapsed = start.elapsed();
        self.history.record(&stats);
        if stats.bakes + stats.destroys > 0 {
            tracing::trace!(
                bakes = stats.bakes,
                destroys = stats.destroys,
                pending = stats.pending,
                "frame bake complete"
            );
        }
        stats
    }

    /// Tick until both queues are empty. Returns the accumulated totals.
    pub fn drain_all(&mut self) -> FrameStats {
        let mut total = FrameStats::default();
        loop {
            let stats = self.tick();
            total.bakes += stats.bakes;
            total.destroys += stats.destroys;
            total.stale_bakes += stats.stale_bakes;
            total.stale_destroys += stats.stale_destroys;
            total.elapsed += stats.elapsed;
            if stats.pending == 0 {
                return total;
            }
        }
    }

    pub fn draw(&mut self) -> usize {
        self.baker.draw()
    }

    pub fn baker(&self) -> &Baker<R, P> {
        &self.baker
    }

    pub fn baker_mut(&mut self) -> &mut Baker<R, P> {
        &mut self.baker
    }

    pub fn history(&self) -> &TickHistory {
        &self.history
    }
}

/// Rolling window of recent ticks: how long each took and how much it applied.
#[derive(Debug)]
pub struct TickHistory {
    samples: VecDeque<TickSample>,
    window: usize,
}

#[derive(Debug, Clone, Copy)]
struct TickSample {
    elapsed: Duration,
    bakes: usize,
    destroys: usize,
}

impl TickHistory {
    pub fn new(window: usize) -> Self {
        let window = window.max(1);
        Self {
            samples: VecDeque::with_capacity(window),
            window,
        }
    }

    pub fn record(&mut self, stats: &FrameStats) {
        if self.samples.len() == self.window {
            self.samples.pop_front();
        }
        self.samples.push_back(TickSample {
            elapsed: stats.elapsed,
            bakes: stats.bakes,
            destroys: stats.destroys,
        });
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn average(&self) -> Duration {
        if self.samples.is_empty() {
            return Duration::ZERO;
        }
        self.total_time() / self.samples.len() as u32
    }

    pub fn max(&self) -> Duration {
        self.samples
            .iter()
            .map(|s| s.elapsed)
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Ticks in the window that baked or destroyed anything.
    pub fn busy_ticks(&self) -> usize {
        self.samples
            .iter()
            .filter(|s| s.bakes + s.destroys > 0)
            .count()
    }

    pub fn bakes(&self) -> usize {
        self.samples.iter().map(|s| s.bakes).sum()
    }

    pub fn destroys(&self) -> usize {
        self.samples.iter().map(|s| s.destroys).sum()
    }

    /// Chunks baked per second of tick time across the window.
    pub fn bake_rate(&self) -> f64 {
        let time = self.total_time();
        if time.is_zero() {
            return 0.0;
        }
        self.bakes() as f64 / time.as_secs_f64()
    }

    fn total_time(&self) -> Duration {
        self.samples.iter().map(|s| s.elapsed).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{BakeRequest, CancelToken, DestroyRequest, QueueProducer, work_queues};
    use crate::streamer::Streamer;
    use crate::tracker::SectorState;
    use std::cell::Cell;
    use std::rc::Rc;
    use tessera_bake::{ChunkArtifacts, HeadlessPhysics, HeadlessRenderer};
    use tessera_common::{CHUNKS_PER_SECTOR, WorldChunkCoord, WorldSectorCoord};
    use tessera_kernel::{BlockTypeDictionary, Chunk, EventBus, Sector};
    use tessera_worldgen::{Seed, TerrainGenerator};

    type Headless = FrameBaker<HeadlessRenderer, HeadlessPhysics>;

    fn pipeline(config: StreamConfig) -> (Streamer, Headless, EventBus) {
        let (producer, consumer) = work_queues(config.queue_capacity, config.poll_interval());
        let terrain = Arc::new(Terrain::new());
        let tracker = Arc::new(SectorTracker::new());
        let bus = EventBus::new();
        let frame = FrameBaker::new(
            Baker::new(HeadlessRenderer::new(), HeadlessPhysics::new()),
            consumer,
            Arc::clone(&terrain),
            Arc::clone(&tracker),
            bus.publisher(),
            &config,
        );
        let streamer = Streamer::new(
            config,
            terrain,
            None,
            Arc::new(TerrainGenerator::with_seed(Seed::default())),
            Arc::new(BlockTypeDictionary::default_catalog()),
            tracker,
            producer,
            bus.publisher(),
            CancelToken::new(),
        );
        (streamer, frame, bus)
    }

    fn manual_pipeline() -> (QueueProducer, Headless, Arc<Terrain>, Arc<SectorTracker>) {
        let config = StreamConfig::default();
        let (producer, consumer) = work_queues(16, config.poll_interval());
        let terrain = Arc::new(Terrain::new());
        let tracker = Arc::new(SectorTracker::new());
        let frame = FrameBaker::new(
            Baker::new(HeadlessRenderer::new(), HeadlessPhysics::new()),
            consumer,
            Arc::clone(&terrain),
            Arc::clone(&tracker),
            EventPublisher::detached(),
            &config,
        );
        (producer, frame, terrain, tracker)
    }

    fn empty_artifacts(coord: WorldChunkCoord) -> ChunkArtifacts {
        let chunk = Chunk::new(coord.parse().1);
        ChunkArtifacts::compute(coord, &chunk, &BlockTypeDictionary::default_catalog())
    }

    #[test]
    fn tick_respects_bake_budget() {
        let config = StreamConfig {
            bakes_per_tick: 10,
            ..StreamConfig::default()
        };
        let (mut streamer, mut frame, _bus) = pipeline(config);
        streamer.set_target(WorldSectorCoord::ORIGIN);
        streamer.tick().unwrap();

        let stats = frame.tick();
        assert_eq!(stats.bakes, 10);
        assert_eq!(stats.pending, 9 * CHUNKS_PER_SECTOR - 10);
        assert_eq!(frame.baker().baked_chunk_count(), 10);
    }

    #[test]
    fn settled_world_is_fully_baked() {
        let (mut streamer, mut frame, mut bus) = pipeline(StreamConfig::default());
        let baked_events = Rc::new(Cell::new(0));
        let counter = Rc::clone(&baked_events);
        bus.subscribe(move |e| {
            if matches!(e, TerrainEvent::ChunkBaked { .. }) {
                counter.set(counter.get() + 1);
            }
        });
        streamer.set_target(WorldSectorCoord::ORIGIN);
        streamer.tick().unwrap();
        let totals = frame.drain_all();

        assert_eq!(totals.bakes, 9 * CHUNKS_PER_SECTOR);
        assert_eq!(streamer.tracker().count(SectorState::ResidentBaked), 9);
        assert_eq!(frame.baker().baked_chunk_count(), 9 * CHUNKS_PER_SECTOR);
        bus.dispatch();
        assert_eq!(baked_events.get(), 9 * CHUNKS_PER_SECTOR);
    }

    #[test]
    fn moving_keeps_baked_set_matching_resident_set() {
        let (mut streamer, mut frame, _bus) = pipeline(StreamConfig::default());
        streamer.set_target(WorldSectorCoord::ORIGIN);
        streamer.tick().unwrap();
        frame.drain_all();

        streamer.set_target(WorldSectorCoord::new(1, 0));
        streamer.tick().unwrap();
        let totals = frame.drain_all();
        assert_eq!(totals.bakes, 3 * CHUNKS_PER_SECTOR);
        assert_eq!(totals.destroys, 3 * CHUNKS_PER_SECTOR);
        assert_eq!(frame.baker().baked_chunk_count(), 9 * CHUNKS_PER_SECTOR);
        assert!(!frame.baker().is_baked(WorldChunkCoord::new(-1, 0)));
        assert!(frame.baker().is_baked(WorldChunkCoord::new(32, 0)));
    }

    #[test]
    fn reentering_sector_before_drain_keeps_new_bakes() {
        let (mut streamer, mut frame, _bus) = pipeline(StreamConfig::default());
        streamer.set_target(WorldSectorCoord::ORIGIN);
        streamer.tick().unwrap();
        frame.drain_all();

        // Leave and come straight back without letting the frame baker run.
        streamer.set_target(WorldSectorCoord::new(1, 0));
        streamer.tick().unwrap();
        streamer.set_target(WorldSectorCoord::ORIGIN);
        streamer.tick().unwrap();
        frame.drain_all();

        assert_eq!(frame.baker().baked_chunk_count(), 9 * CHUNKS_PER_SECTOR);
        let left = WorldSectorCoord::new(-1, 0);
        assert_eq!(
            frame.baker().baked_epoch(left.chunk(tessera_common::ChunkCoord::new(0, 0))),
            streamer.terrain().epoch_of(left)
        );
        assert_eq!(streamer.tracker().count(SectorState::ResidentBaked), 9);
    }

    #[test]
    fn bake_for_evicted_residency_is_skipped() {
        let (producer, mut frame, terrain, _tracker) = manual_pipeline();
        let cancel = CancelToken::new();
        let coord = WorldChunkCoord::new(0, 0);
        producer
            .queue_bake(
                BakeRequest {
                    artifacts: empty_artifacts(coord),
                    epoch: 1,
                },
                &cancel,
            )
            .unwrap();
        assert!(terrain.is_empty());
        let stats = frame.tick();
        assert_eq!(stats.stale_bakes, 1);
        assert!(!frame.baker().is_baked(coord));
    }

    #[test]
    fn rebake_does_not_double_count_progress() {
        let (producer, mut frame, terrain, tracker) = manual_pipeline();
        let cancel = CancelToken::new();
        let sector = WorldSectorCoord::ORIGIN;
        let epoch = terrain.insert(Sector::new(sector));
        tracker.mark_resident(sector, epoch);
        let coord = sector.chunk(tessera_common::ChunkCoord::new(2, 2));
        for _ in 0..2 {
            producer
                .queue_bake(
                    BakeRequest {
                        artifacts: empty_artifacts(coord),
                        epoch,
                    },
                    &cancel,
                )
                .unwrap();
        }
        assert_eq!(frame.tick().bakes, 2);
        assert_eq!(tracker.baked_chunks(sector), 1);
    }

    #[test]
    fn stale_destroy_leaves_newer_bake() {
        let (producer, mut frame, terrain, _tracker) = manual_pipeline();
        let cancel = CancelToken::new();
        let sector = WorldSectorCoord::ORIGIN;
        let epoch = terrain.insert(Sector::new(sector));
        let coord = sector.chunk(tessera_common::ChunkCoord::new(0, 0));
        producer
            .queue_bake(
                BakeRequest {
                    artifacts: empty_artifacts(coord),
                    epoch,
                },
                &cancel,
            )
            .unwrap();
        producer
            .queue_destroy(
                DestroyRequest {
                    coord,
                    epoch: epoch - 1,
                },
                &cancel,
            )
            .unwrap();
        let stats = frame.tick();
        assert_eq!((stats.bakes, stats.stale_destroys), (1, 1));
        assert!(frame.baker().is_baked(coord));
    }

    fn tick_stats(millis: u64, bakes: usize, destroys: usize) -> FrameStats {
        FrameStats {
            bakes,
            destroys,
            elapsed: Duration::from_millis(millis),
            ..FrameStats::default()
        }
    }

    #[test]
    fn history_separates_busy_and_idle_ticks() {
        let mut history = TickHistory::new(8);
        history.record(&tick_stats(4, 64, 0));
        history.record(&tick_stats(1, 0, 0));
        history.record(&tick_stats(3, 0, 128));

        assert_eq!(history.len(), 3);
        assert_eq!(history.busy_ticks(), 2);
        assert_eq!((history.bakes(), history.destroys()), (64, 128));
        assert_eq!(history.max(), Duration::from_millis(4));
        assert_eq!(history.bake_rate(), 8000.0);
    }

    #[test]
    fn history_window_drops_oldest_tick() {
        let mut history = TickHistory::new(2);
        history.record(&tick_stats(10, 5, 0));
        history.record(&tick_stats(20, 0, 0));
        history.record(&tick_stats(30, 1, 0));

        assert_eq!(history.len(), 2);
        assert_eq!(history.bakes(), 1);
        assert_eq!(history.average(), Duration::from_millis(25));
    }

    #[test]
    fn empty_history_reports_zero() {
        let history = TickHistory::new(0);
        assert!(history.is_empty());
        assert_eq!(history.average(), Duration::ZERO);
        assert_eq!(history.bake_rate(), 0.0);
    }

    #[test]
    fn every_tick_lands_in_history() {
        let config = StreamConfig {
            bakes_per_tick: 100,
            ..StreamConfig::default()
        };
        let (mut streamer, mut frame, _bus) = pipeline(config);
        streamer.set_target(WorldSectorCoord::ORIGIN);
        streamer.tick().unwrap();
        let totals = frame.drain_all();

        assert_eq!(frame.history().bakes(), totals.bakes);
        assert_eq!(frame.history().len(), totals.bakes.div_ceil(100));
        assert_eq!(frame.history().busy_ticks(), frame.history().len());
    }
}
