use crate::block::Block;
use crate::storage::{BlockGrid, BlockStorage};
use tessera_common::{
    BlockCoord, CHUNKS_PER_SECTOR, ChunkCoord, WorldBlockCoord, WorldChunkCoord, WorldSectorCoord,
};

/// A 16x16 grid of blocks inside a sector.
///
/// Holds block data only. Meshes and physics bodies derived from a chunk are
/// owned by the baker and keyed by world chunk coordinate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub coord: ChunkCoord,
    pub blocks: BlockGrid,
}

impl Chunk {
    pub fn new(coord: ChunkCoord) -> Self {
        Self {
            coord,
            blocks: BlockGrid::new(),
        }
    }

    pub fn with_blocks(coord: ChunkCoord, blocks: BlockGrid) -> Self {
        Self { coord, blocks }
    }
}

impl BlockStorage for Chunk {
    fn grid(&self) -> &BlockGrid {
        &self.blocks
    }

    fn grid_mut(&mut self) -> &mut BlockGrid {
        &mut self.blocks
    }
}

/// A 16x16 grid of chunks: the unit of persistence and of streaming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    pub coord: WorldSectorCoord,
    chunks: Box<[Chunk]>,
}

impl Sector {
    /// An all-void sector.
    pub fn new(coord: WorldSectorCoord) -> Self {
        Self::from_fn(coord, Chunk::new)
    }

    pub fn from_fn(coord: WorldSectorCoord, f: impl FnMut(ChunkCoord) -> Chunk) -> Self {
        let chunks: Vec<Chunk> = ChunkCoord::all().map(f).collect();
        Self {
            coord,
            chunks: chunks.into_boxed_slice(),
        }
    }

    /// Build from chunks in slot order. Each chunk's coordinate is reset from its
    /// position. Returns `None` unless exactly one chunk per slot is given.
    pub fn from_chunks(coord: WorldSectorCoord, chunks: Vec<Chunk>) -> Option<Self> {
        if chunks.len() != CHUNKS_PER_SECTOR {
            return None;
        }
        let chunks: Vec<Chunk> = chunks
            .into_iter()
            .enumerate()
            .map(|(i, mut c)| {
                c.coord = ChunkCoord::from_index(i);
                c
            })
            .collect();
        Some(Self {
            coord,
            chunks: chunks.into_boxed_slice(),
        })
    }

    pub fn chunk(&self, coord: ChunkCoord) -> &Chunk {
        &self.chunks[coord.index()]
    }

    pub fn chunk_mut(&mut self, coord: ChunkCoord) -> &mut Chunk {
        &mut self.chunks[coord.index()]
    }

    pub fn chunks(&self) -> impl Iterator<Item = &Chunk> + '_ {
        self.chunks.iter()
    }

    pub fn world_chunk(&self, coord: ChunkCoord) -> WorldChunkCoord {
        WorldChunkCoord::combine(self.coord, coord)
    }

    /// Block lookup by local coordinates.
    pub fn block(&self, chunk: ChunkCoord, block: BlockCoord) -> &Block {
        self.chunk(chunk).block(block)
    }

    pub fn set_block(&mut self, chunk: ChunkCoord, block: BlockCoord, value: Block) -> Block {
        self.chunk_mut(chunk).set_block(block, value)
    }

    /// Whether `coord` lies inside this sector.
    pub fn contains(&self, coord: WorldBlockCoord) -> bool {
        coord.sector() == self.coord
    }

    pub fn solid_count(&self) -> usize {
        self.chunks.iter().map(|c| c.solid_count()).sum()
    }
}
