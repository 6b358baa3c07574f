use crate::config::StreamConfig;
use crate::plan::plan;
use crate::queue::{BakeRequest, CancelToken, DestroyRequest, QueueProducer};
use crate::tracker::SectorTracker;
use crate::StreamError;
use glam::DVec2;
use rayon::prelude::*;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tessera_bake::ChunkArtifacts;
use tessera_common::{ChunkCoord, WorldBlockCoord, WorldChunkCoord, WorldSectorCoord};
use tessera_kernel::{
    BlockTypeDictionary, EventPublisher, Sector, SectorSource, Terrain, TerrainEvent,
};
use tessera_persist::SectorStore;
use tessera_worldgen::TerrainGenerator;

/// Cumulative streaming statistics for instrumentation.
#[derive(Debug, Clone, Default)]
pub struct StreamStats {
    pub loaded: usize,
    pub generated: usize,
    pub evicted: usize,
    pub total_resident: usize,
    pub save_failures: usize,
    pub refresh_time: Duration,
}

/// Synchronous streaming state machine.
///
/// Moves the resident set toward the target set around the tracked sector.
/// Runs on whichever thread calls it; [`crate::StreamingManager`] drives one
/// on a background thread.
pub struct Streamer {
    config: StreamConfig,
    terrain: Arc<Terrain>,
    store: Option<SectorStore>,
    generator: Arc<TerrainGenerator>,
    dictionary: Arc<BlockTypeDictionary>,
    tracker: Arc<SectorTracker>,
    queues: QueueProducer,
    events: EventPublisher,
    cancel: CancelToken,
    target: Option<WorldSectorCoord>,
    center: Option<WorldSectorCoord>,
    stats: StreamStats,
}

impl Streamer {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: StreamConfig,
        terrain: Arc<Terrain>,
        store: Option<SectorStore>,
        generator: Arc<TerrainGenerator>,
        dictionary: Arc<BlockTypeDictionary>,
        tracker: Arc<SectorTracker>,
        queues: QueueProducer,
        events: EventPublisher,
        cancel: CancelToken,
    ) -> Self {
        Self {
            config,
            terrain,
            store,
            generator,
            dictionary,
            tracker,
            queues,
            events,
            cancel,
            target: None,
            center: None,
            stats: StreamStats::default(),
        }
    }

    /// Record the tracked entity's position. Returns whether it entered a
    /// different sector, in which case the next [`tick`](Self::tick) refreshes.
    pub fn on_entity_moved(&mut self, position: DVec2) -> bool {
        self.set_target(WorldBlockCoord::containing(position).sector())
    }

    pub fn set_target(&mut self, sector: WorldSectorCoord) -> bool {
        if self.target == Some(sector) {
            return false;
        }
        tracing::debug!(%sector, "tracked entity entered sector");
        self.target = Some(sector);
        true
    }

    /// Apply a pending target change. Returns whether a refresh ran.
    pub fn tick(&mut self) -> Result<bool, StreamError> {
        match self.target {
            Some(target) if self.center != Some(target) => {
                self.refresh(target)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Load and evict until the resident set is the target set around `center`.
    pub fn refresh(&mut self, center: WorldSectorCoord) -> Result<(), StreamError> {
        let _span = tracing::info_span!("stream_refresh", %center).entered();
        let start = Instant::now();
        let plan = plan(center, self.config.view_radius, self.terrain.resident_coords());

        for &coord in &plan.to_load {
            self.tracker.mark_loading(coord);
        }
        let loaded: Vec<(Sector, SectorSource)> = plan
            .to_load
            .par_iter()
            .map(|&coord| self.load_or_generate(coord))
            .collect();

        let mut loaded = loaded.into_iter();
        while let Some((sector, source)) = loaded.next() {
            if let Err(e) = self.make_resident(sector, source) {
                for (pending, _) in loaded {
                    self.tracker.mark_absent(pending.coord);
                }
                return Err(e);
            }
        }
        for &coord in &plan.to_evict {
            self.evict(coord)?;
        }

        self.center = Some(center);
        self.stats.total_resident = self.terrain.len();
        self.stats.refresh_time = start.elapsed();
        tracing::debug!(
            loaded = plan.to_load.len(),
            evicted = plan.to_evict.len(),
            resident = self.stats.total_resident,
            elapsed = ?self.stats.refresh_time,
            "stream refresh complete"
        );
        Ok(())
    }

    fn load_or_generate(&self, coord: WorldSectorCoord) -> (Sector, SectorSource) {
        if let Some(store) = &self.store {
            match store.load(coord) {
                Ok(Some(sector)) => return (sector, SectorSource::Loaded),
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%coord, error = %e, "unreadable sector file; regenerating");
                }
            }
        }
        (self.generator.generate_sector(coord), SectorSource::Generated)
    }

    fn make_resident(&mut self, sector: Sector, source: SectorSource) -> Result<(), StreamError> {
        let coord = sector.coord;
        let epoch = self.terrain.insert(sector);
        self.tracker.mark_resident(coord, epoch);
        match source {
            SectorSource::Loaded => self.stats.loaded += 1,
            SectorSource::Generated => self.stats.generated += 1,
        }
        tracing::debug!(%coord, ?source, epoch, "sector resident");
        self.events.publish(TerrainEvent::SectorLoaded {
            coord,
            source,
            epoch,
        });

        for artifacts in self.sector_artifacts(coord) {
            self.queues
                .queue_bake(BakeRequest { artifacts, epoch }, &self.cancel)?;
        }
        Ok(())
    }

    /// Mesh and fixture data for every chunk of a resident sector, in chunk
    /// index order.
    fn sector_artifacts(&self, coord: WorldSectorCoord) -> Vec<ChunkArtifacts> {
        let Some(resident) = self.terrain.get(coord) else {
            return Vec::new();
        };
        let Some(guard) = resident.read() else {
            return Vec::new();
        };
        let sector: &Sector = &guard;
        let dictionary = self.dictionary.as_ref();
        ChunkCoord::all()
            .collect::<Vec<_>>()
            .into_par_iter()
            .map(|c| ChunkArtifacts::compute(coord.chunk(c), sector.chunk(c), dictionary))
            .collect()
    }

    fn evict(&mut self, coord: WorldSectorCoord) -> Result<(), StreamError> {
        self.tracker.mark_evicting(coord);
        let Some(evicted) = self.terrain.remove(coord) else {
            self.tracker.mark_absent(coord);
            return Ok(());
        };
        self.save(&evicted.sector);

        let queued = coord.chunks().try_for_each(|chunk| {
            self.queues.queue_destroy(
                DestroyRequest {
                    coord: chunk,
                    epoch: evicted.epoch,
                },
                &self.cancel,
            )
        });
        self.tracker.mark_absent(coord);
        queued?;
        self.stats.evicted += 1;
        tracing::debug!(%coord, epoch = evicted.epoch, "sector evicted");
        self.events.publish(TerrainEvent::SectorEvicted {
            coord,
            epoch: evicted.epoch,
        });
        Ok(())
    }

    /// Save a sector, reporting failure as an event. Returns whether it was written.
    fn save(&mut self, sector: &Sector) -> bool {
        let Some(store) = &self.store else {
            return false;
        };
        match store.save(sector) {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(coord = %sector.coord, error = %e, "failed to save sector");
                self.stats.save_failures += 1;
                self.events.publish(TerrainEvent::SaveFailed {
                    coord: sector.coord,
                    reason: e.to_string(),
                });
                false
            }
        }
    }

    /// Recompute a resident chunk and queue it for baking under the sector's
    /// current epoch. Returns `false` when the sector is not resident.
    pub fn rebake_chunk(&mut self, coord: WorldChunkCoord) -> Result<bool, StreamError> {
        let sector = coord.sector();
        let Some(epoch) = self.terrain.epoch_of(sector) else {
            tracing::debug!(%coord, "rebake of non-resident chunk ignored");
            return Ok(false);
        };
        let dictionary = self.dictionary.as_ref();
        let Some(artifacts) = self
            .terrain
            .with_chunk(coord, |chunk| ChunkArtifacts::compute(coord, chunk, dictionary))
        else {
            return Ok(false);
        };
        self.queues
            .queue_bake(BakeRequest { artifacts, epoch }, &self.cancel)?;
        Ok(true)
    }

    /// Save every resident sector. Returns how many were written.
    pub fn flush(&mut self) -> usize {
        if self.store.is_none() {
            return 0;
        }
        let _span = tracing::info_span!("stream_flush").entered();
        let mut saved = 0;
        for coord in self.terrain.resident_coords() {
            let Some(sector) = self
                .terrain
                .get(coord)
                .and_then(|resident| resident.read().map(|guard| Sector::clone(&guard)))
            else {
                continue;
            };
            if self.save(&sector) {
                saved += 1;
            }
        }
        tracing::info!(saved, "flushed resident sectors");
        saved
    }

    pub fn center(&self) -> Option<WorldSectorCoord> {
        self.center
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn terrain(&self) -> &Arc<Terrain> {
        &self.terrain
    }

    pub fn tracker(&self) -> &Arc<SectorTracker> {
        &self.tracker
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queue::{QueueConsumer, work_queues};
    use crate::tracker::SectorState;
    use tessera_kernel::{Block, EventBus};
    use tessera_worldgen::Seed;

    struct Fixture {
        streamer: Streamer,
        consumer: QueueConsumer,
        bus: EventBus,
        cancel: CancelToken,
    }

    fn fixture(store: Option<SectorStore>) -> Fixture {
        let config = StreamConfig::default();
        let (producer, consumer) = work_queues(config.queue_capacity, config.poll_interval());
        let bus = EventBus::new();
        let cancel = CancelToken::new();
        let streamer = Streamer::new(
            config,
            Arc::new(Terrain::new()),
            store,
            Arc::new(TerrainGenerator::with_seed(Seed::default())),
            Arc::new(BlockTypeDictionary::default_catalog()),
            Arc::new(SectorTracker::new()),
            producer,
            bus.publisher(),
            cancel.clone(),
        );
        Fixture {
            streamer,
            consumer,
            bus,
            cancel,
        }
    }

    fn drain(consumer: &QueueConsumer) -> (usize, usize) {
        (
            consumer.bakes.try_iter().count(),
            consumer.destroys.try_iter().count(),
        )
    }

    #[test]
    fn first_move_loads_three_by_three() {
        let mut f = fixture(None);
        assert!(f.streamer.on_entity_moved(DVec2::new(3.0, 3.0)));
        assert!(f.streamer.tick().unwrap());
        let mut expected = crate::plan::target_set(WorldSectorCoord::ORIGIN, 1);
        expected.sort();
        assert_eq!(f.streamer.terrain().resident_coords(), expected);
        assert_eq!(drain(&f.consumer), (9 * 256, 0));
        assert_eq!(f.streamer.stats().generated, 9);
        assert_eq!(
            f.streamer.tracker().count(SectorState::ResidentUnbaked),
            9
        );
    }

    #[test]
    fn moving_within_a_sector_does_nothing() {
        let mut f = fixture(None);
        f.streamer.on_entity_moved(DVec2::new(1.0, 1.0));
        f.streamer.tick().unwrap();
        drain(&f.consumer);
        assert!(!f.streamer.on_entity_moved(DVec2::new(200.0, 100.0)));
        assert!(!f.streamer.tick().unwrap());
        assert_eq!(drain(&f.consumer), (0, 0));
    }

    #[test]
    fn crossing_a_border_swaps_one_column() {
        let mut f = fixture(None);
        f.streamer.on_entity_moved(DVec2::ZERO);
        f.streamer.tick().unwrap();
        drain(&f.consumer);
        f.bus.drain();

        f.streamer.on_entity_moved(DVec2::new(256.0, 0.0));
        f.streamer.tick().unwrap();
        assert_eq!(drain(&f.consumer), (3 * 256, 3 * 256));
        assert_eq!(f.streamer.terrain().len(), 9);
        assert!(!f.streamer.terrain().contains(WorldSectorCoord::new(-1, 0)));
        assert!(f.streamer.terrain().contains(WorldSectorCoord::new(2, 0)));
        let evicted = f
            .bus
            .drain()
            .into_iter()
            .filter(|e| matches!(e, TerrainEvent::SectorEvicted { .. }))
            .count();
        assert_eq!(evicted, 3);
    }

    #[test]
    fn edit_survives_evict_and_reload() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SectorStore::open(tmp.path()).unwrap();
        let mut f = fixture(Some(store));
        let at = WorldBlockCoord::new(17, 33);

        f.streamer.set_target(WorldSectorCoord::ORIGIN);
        f.streamer.tick().unwrap();
        f.streamer.terrain().set_block(at, Block::new("test2"));
        drain(&f.consumer);

        f.streamer.set_target(WorldSectorCoord::new(50, 50));
        f.streamer.tick().unwrap();
        assert!(f.streamer.terrain().get_block(at).is_none());
        drain(&f.consumer);

        f.streamer.set_target(WorldSectorCoord::ORIGIN);
        f.streamer.tick().unwrap();
        assert_eq!(
            f.streamer.terrain().get_block(at).unwrap().kind.as_str(),
            "test2"
        );
        assert_eq!(f.streamer.stats().loaded, 9);
    }

    #[test]
    fn corrupt_file_is_regenerated() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SectorStore::open(tmp.path()).unwrap();
        std::fs::write(store.path_for(WorldSectorCoord::ORIGIN), b"not a sector").unwrap();
        let mut f = fixture(Some(store));
        f.streamer.set_target(WorldSectorCoord::ORIGIN);
        f.streamer.tick().unwrap();
        assert!(f.streamer.terrain().contains(WorldSectorCoord::ORIGIN));
        assert_eq!(f.streamer.stats().generated, 9);
    }

    #[test]
    fn rebake_uses_current_epoch() {
        let mut f = fixture(None);
        f.streamer.set_target(WorldSectorCoord::ORIGIN);
        f.streamer.tick().unwrap();
        drain(&f.consumer);

        let chunk = WorldChunkCoord::new(1, 2);
        assert!(f.streamer.rebake_chunk(chunk).unwrap());
        let req = f.consumer.bakes.try_recv().unwrap();
        assert_eq!(req.artifacts.coord, chunk);
        assert_eq!(
            Some(req.epoch),
            f.streamer.terrain().epoch_of(WorldSectorCoord::ORIGIN)
        );
        assert!(!f.streamer.rebake_chunk(WorldChunkCoord::new(500, 0)).unwrap());
    }

    #[test]
    fn flush_saves_all_resident() {
        let tmp = tempfile::tempdir().unwrap();
        let store = SectorStore::open(tmp.path()).unwrap();
        let mut f = fixture(Some(store.clone()));
        f.streamer.set_target(WorldSectorCoord::new(-3, 4));
        f.streamer.tick().unwrap();
        assert_eq!(f.streamer.flush(), 9);
        assert_eq!(store.list().unwrap().len(), 9);
    }

    #[test]
    fn flush_without_store_is_noop() {
        let mut f = fixture(None);
        f.streamer.set_target(WorldSectorCoord::ORIGIN);
        f.streamer.tick().unwrap();
        assert_eq!(f.streamer.flush(), 0);
    }

    #[test]
    fn cancelled_refresh_leaves_nothing_loading() {
        let mut f = fixture(None);
        f.cancel.cancel();
        f.streamer.set_target(WorldSectorCoord::ORIGIN);
        assert!(matches!(f.streamer.tick(), Err(StreamError::Cancelled)));

        let tracker = f.streamer.tracker();
        assert_eq!(tracker.count(SectorState::Loading), 0);
        // Only the sector that was mid-insert when the bake send failed is resident.
        assert_eq!(tracker.count(SectorState::ResidentUnbaked), 1);
        assert_eq!(f.streamer.terrain().len(), 1);
        for coord in crate::plan::target_set(WorldSectorCoord::ORIGIN, 1) {
            let expected = if f.streamer.terrain().contains(coord) {
                SectorState::ResidentUnbaked
            } else {
                SectorState::Absent
            };
            assert_eq!(tracker.state(coord), expected);
        }
        assert_eq!(drain(&f.consumer), (0, 0));
    }

    #[test]
    fn cancelled_eviction_still_marks_absent() {
        let mut f = fixture(None);
        f.streamer.set_target(WorldSectorCoord::ORIGIN);
        f.streamer.tick().unwrap();
        drain(&f.consumer);

        let gone = WorldSectorCoord::new(-1, 0);
        f.cancel.cancel();
        f.streamer.evict(gone).unwrap_err();
        assert_eq!(f.streamer.tracker().state(gone), SectorState::Absent);
        assert!(!f.streamer.terrain().contains(gone));
    }
}
