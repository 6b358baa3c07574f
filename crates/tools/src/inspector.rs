use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;
use tessera_common::{
    BLOCKS_PER_CHUNK, BlockCoord, CHUNK_HEIGHT, CHUNK_WIDTH, ChunkCoord, SECTOR_HEIGHT,
    SECTOR_WIDTH, WorldBlockCoord, WorldSectorCoord,
};
use tessera_kernel::{Block, BlockStorage, Chunk, Sector, Terrain};

/// Terrain inspector for developer tooling.
///
/// Read-only queries against resident terrain and loose sectors for debugging
/// and the command line.
pub struct TerrainInspector;

impl TerrainInspector {
    /// Produce a summary of the resident terrain.
    pub fn summary(terrain: &Terrain) -> TerrainSummary {
        let mut summary = TerrainSummary::default();
        for coord in terrain.resident_coords() {
            let Some(resident) = terrain.get(coord) else {
                continue;
            };
            let Some(sector) = resident.read() else {
                continue;
            };
            let report = Self::sector_report(&sector);
            summary.resident_sectors += 1;
            summary.solid_blocks += report.solid_blocks;
            for (tag, count) in report.tags {
                *summary.tags.entry(tag).or_default() += count;
            }
            summary.bounds = Some(match summary.bounds {
                None => (coord, coord),
                Some((lo, hi)) => (
                    WorldSectorCoord::new(lo.x.min(coord.x), lo.y.min(coord.y)),
                    WorldSectorCoord::new(hi.x.max(coord.x), hi.y.max(coord.y)),
                ),
            });
        }
        summary
    }

    pub fn sector_report(sector: &Sector) -> SectorReport {
        let tags = Self::histogram(sector);
        SectorReport {
            coord: sector.coord,
            solid_blocks: tags.values().sum(),
            tags,
        }
    }

    /// Count of each non-void tag in a sector.
    pub fn histogram(sector: &Sector) -> BTreeMap<String, usize> {
        let mut tags = BTreeMap::new();
        for chunk in sector.chunks() {
            for (_, block) in chunk.solid_blocks() {
                *tags.entry(block.kind.as_str().to_owned()).or_default() += 1;
            }
        }
        tags
    }

    /// One character per chunk showing how full it is, top row first.
    ///
    /// ` ` empty, `.` under a quarter, `:` under half, `+` under three
    /// quarters, `#` otherwise.
    pub fn sector_map(sector: &Sector) -> String {
        let mut out = String::with_capacity((SECTOR_WIDTH + 1) * SECTOR_HEIGHT);
        for y in (0..SECTOR_HEIGHT).rev() {
            for x in 0..SECTOR_WIDTH {
                let chunk = sector.chunk(ChunkCoord::new(x as u8, y as u8));
                out.push(fill_glyph(chunk.solid_count()));
            }
            out.push('\n');
        }
        out
    }

    /// One character per block: the first letter of its tag, `.` for void.
    pub fn chunk_map(chunk: &Chunk) -> String {
        let mut out = String::with_capacity((CHUNK_WIDTH + 1) * CHUNK_HEIGHT);
        for y in (0..CHUNK_HEIGHT).rev() {
            for x in 0..CHUNK_WIDTH {
                let block = chunk.block(BlockCoord::new(x as u8, y as u8));
                out.push(block.kind.as_str().chars().next().unwrap_or('.'));
            }
            out.push('\n');
        }
        out
    }

    /// Where a block lives and what it holds, if its sector is resident.
    pub fn inspect_block(terrain: &Terrain, coord: WorldBlockCoord) -> Option<BlockInfo> {
        let block = terrain.get_block(coord)?;
        let (sector, chunk, local) = coord.parse();
        Some(BlockInfo {
            coord,
            sector,
            chunk,
            local,
            block,
        })
    }
}

fn fill_glyph(solid: usize) -> char {
    match solid * 4 / BLOCKS_PER_CHUNK {
        _ if solid == 0 => ' ',
        0 => '.',
        1 => ':',
        2 => '+',
        _ => '#',
    }
}

/// Summary of resident terrain for the inspector.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TerrainSummary {
    pub resident_sectors: usize,
    pub solid_blocks: usize,
    pub tags: BTreeMap<String, usize>,
    /// Lowest and highest resident sector on each axis.
    pub bounds: Option<(WorldSectorCoord, WorldSectorCoord)>,
}

impl fmt::Display for TerrainSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Terrain: sectors={} solid={}",
            self.resident_sectors, self.solid_blocks
        )?;
        if let Some((lo, hi)) = self.bounds {
            write!(f, " bounds={lo}..{hi}")?;
        }
        for (tag, count) in &self.tags {
            write!(f, " {tag}={count}")?;
        }
        Ok(())
    }
}

/// Block statistics for one sector.
#[derive(Debug, Clone, Serialize)]
pub struct SectorReport {
    pub coord: WorldSectorCoord,
    pub solid_blocks: usize,
    pub tags: BTreeMap<String, usize>,
}

impl fmt::Display for SectorReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sector {} solid={}", self.coord, self.solid_blocks)?;
        for (tag, count) in &self.tags {
            write!(f, " {tag}={count}")?;
        }
        Ok(())
    }
}

/// Detailed info about a single block.
#[derive(Debug, Clone, Serialize)]
pub struct BlockInfo {
    pub coord: WorldBlockCoord,
    pub sector: WorldSectorCoord,
    pub chunk: ChunkCoord,
    pub local: BlockCoord,
    pub block: Block,
}

impl fmt::Display for BlockInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = if self.block.is_void() {
            "void"
        } else {
            self.block.kind.as_str()
        };
        write!(
            f,
            "Block {} sector={} chunk={} local={} tag={} orientation={:?}",
            self.coord, self.sector, self.chunk, self.local, tag, self.block.orientation
        )
    }
}
