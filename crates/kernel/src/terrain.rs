use crate::block::Block;
use crate::chunk::{Chunk, Sector};
use crate::storage::BlockStorage;
use dashmap::DashMap;
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tessera_common::{WorldBlockCoord, WorldChunkCoord, WorldSectorCoord};

/// A sector resident in memory, tagged with the epoch of its residency.
///
/// Every insertion gets a fresh epoch, so work queued for an earlier residency
/// of the same coordinate can be recognised as stale. Removal takes the sector
/// out under the write lock, after which handles still held elsewhere read and
/// write nothing.
#[derive(Debug)]
pub struct ResidentSector {
    epoch: u64,
    sector: RwLock<Option<Sector>>,
}

impl ResidentSector {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Shared access, or `None` once the sector has been evicted.
    pub fn read(&self) -> Option<MappedRwLockReadGuard<'_, Sector>> {
        RwLockReadGuard::try_map(self.sector.read(), Option::as_ref).ok()
    }

    /// Exclusive access, or `None` once the sector has been evicted.
    pub fn write(&self) -> Option<MappedRwLockWriteGuard<'_, Sector>> {
        RwLockWriteGuard::try_map(self.sector.write(), Option::as_mut).ok()
    }

    pub fn is_evicted(&self) -> bool {
        self.sector.read().is_none()
    }

    fn take(&self) -> Option<Sector> {
        self.sector.write().take()
    }
}

/// A sector removed from the terrain, with the epoch it was resident under.
#[derive(Debug)]
pub struct EvictedSector {
    pub epoch: u64,
    pub sector: Sector,
}

/// Sparse concurrent map of resident sectors.
///
/// Readers on any thread may query blocks while the streaming thread inserts
/// and removes sectors. Absent sectors read as `None`, never as void.
#[derive(Debug, Default)]
pub struct Terrain {
    sectors: DashMap<WorldSectorCoord, Arc<ResidentSector>>,
    next_epoch: AtomicU64,
}

impl Terrain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a sector resident, replacing any previous residency. Returns the new epoch.
    pub fn insert(&self, sector: Sector) -> u64 {
        let epoch = self.next_epoch.fetch_add(1, Ordering::Relaxed) + 1;
        let coord = sector.coord;
        let resident = Arc::new(ResidentSector {
            epoch,
            sector: RwLock::new(Some(sector)),
        });
        if let Some(previous) = self.sectors.insert(coord, resident) {
            previous.take();
            tracing::warn!(%coord, "sector inserted over an existing residency");
        }
        epoch
    }

    pub fn remove(&self, coord: WorldSectorCoord) -> Option<EvictedSector> {
        let (_, resident) = self.sectors.remove(&coord)?;
        let sector = resident.take()?;
        Some(EvictedSector {
            epoch: resident.epoch,
            sector,
        })
    }

    pub fn get(&self, coord: WorldSectorCoord) -> Option<Arc<ResidentSector>> {
        self.sectors.get(&coord).map(|r| Arc::clone(r.value()))
    }

    pub fn contains(&self, coord: WorldSectorCoord) -> bool {
        self.sectors.contains_key(&coord)
    }

    pub fn epoch_of(&self, coord: WorldSectorCoord) -> Option<u64> {
        self.sectors.get(&coord).map(|r| r.epoch)
    }

    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// Resident coordinates in sorted order.
    pub fn resident_coords(&self) -> Vec<WorldSectorCoord> {
        let mut coords: Vec<_> = self.sectors.iter().map(|r| *r.key()).collect();
        coords.sort();
        coords
    }

    /// The block at `coord`, or `None` when its sector is not resident.
    pub fn get_block(&self, coord: WorldBlockCoord) -> Option<Block> {
        let (sector, chunk, block) = coord.parse();
        let resident = self.get(sector)?;
        let guard = resident.read()?;
        Some(guard.block(chunk, block).clone())
    }

    /// Replace the block at `coord`, returning the previous block. Returns `None`
    /// and changes nothing when the sector is not resident. Never rebakes.
    pub fn set_block(&self, coord: WorldBlockCoord, block: Block) -> Option<Block> {
        let (sector, chunk, local) = coord.parse();
        let resident = self.get(sector)?;
        let mut guard = resident.write()?;
        Some(guard.set_block(chunk, local, block))
    }

    /// Run `f` against a resident chunk under the sector's read lock.
    pub fn with_chunk<R>(&self, coord: WorldChunkCoord, f: impl FnOnce(&Chunk) -> R) -> Option<R> {
        let (sector, chunk) = coord.parse();
        let resident = self.get(sector)?;
        let guard = resident.read()?;
        Some(f(guard.chunk(chunk)))
    }

    /// Number of non-void blocks in a resident chunk.
    pub fn solid_count(&self, coord: WorldChunkCoord) -> Option<usize> {
        self.with_chunk(coord, |c| c.solid_count())
    }
}
