use dashmap::DashMap;
use tessera_common::{CHUNKS_PER_SECTOR, WorldSectorCoord};

/// Lifecycle of a sector as seen by the streaming system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectorState {
    Absent,
    Loading,
    ResidentUnbaked,
    ResidentBaked,
    Evicting,
}

#[derive(Debug, Clone, Copy)]
struct Status {
    state: SectorState,
    epoch: u64,
    baked: usize,
}

/// Shared view of every sector's lifecycle state.
///
/// Written by the streamer (load and evict transitions) and by the frame baker
/// (bake progress). Sectors with no entry are `Absent`.
#[derive(Debug, Default)]
pub struct SectorTracker {
    states: DashMap<WorldSectorCoord, Status>,
}

impl SectorTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, coord: WorldSectorCoord) -> SectorState {
        self.states
            .get(&coord)
            .map_or(SectorState::Absent, |s| s.state)
    }

    pub fn baked_chunks(&self, coord: WorldSectorCoord) -> usize {
        self.states.get(&coord).map_or(0, |s| s.baked)
    }

    pub(crate) fn mark_loading(&self, coord: WorldSectorCoord) {
        self.states.insert(
            coord,
            Status {
                state: SectorState::Loading,
                epoch: 0,
                baked: 0,
            },
        );
    }

    pub(crate) fn mark_resident(&self, coord: WorldSectorCoord, epoch: u64) {
        self.states.insert(
            coord,
            Status {
                state: SectorState::ResidentUnbaked,
                epoch,
                baked: 0,
            },
        );
    }

    /// Count one newly baked chunk of the given residency. Bakes for any other
    /// epoch are ignored.
    pub(crate) fn chunk_baked(&self, coord: WorldSectorCoord, epoch: u64) -> SectorState {
        let Some(mut status) = self.states.get_mut(&coord) else {
            return SectorState::Absent;
        };
        if status.epoch == epoch && status.state == SectorState::ResidentUnbaked {
            status.baked += 1;
            if status.baked >= CHUNKS_PER_SECTOR {
                status.state = SectorState::ResidentBaked;
                tracing::debug!(%coord, epoch, "sector fully baked");
            }
        }
        status.state
    }

    pub(crate) fn mark_evicting(&self, coord: WorldSectorCoord) {
        if let Some(mut status) = self.states.get_mut(&coord) {
            status.state = SectorState::Evicting;
        }
    }

    pub(crate) fn mark_absent(&self, coord: WorldSectorCoord) {
        self.states.remove(&coord);
    }

    pub fn count(&self, state: SectorState) -> usize {
        self.states.iter().filter(|s| s.state == state).count()
    }

    /// Every tracked sector and its state, sorted by coordinate.
    pub fn snapshot(&self) -> Vec<(WorldSectorCoord, SectorState)> {
        let mut all: Vec<_> = self.states.iter().map(|e| (*e.key(), e.state)).collect();
        all.sort_by_key(|(c, _)| *c);
        all
    }
}
