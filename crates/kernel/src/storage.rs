use crate::block::Block;
use tessera_common::{BLOCKS_PER_CHUNK, BlockCoord};

/// Fixed 16x16 grid of blocks, addressed by [`BlockCoord`].
///
/// Always full: empty cells hold [`Block::VOID`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockGrid {
    slots: Box<[Block]>,
}

impl BlockGrid {
    pub fn new() -> Self {
        Self::from_fn(|_| Block::VOID)
    }

    pub fn from_fn(mut f: impl FnMut(BlockCoord) -> Block) -> Self {
        let slots: Vec<Block> = BlockCoord::all().map(&mut f).collect();
        Self {
            slots: slots.into_boxed_slice(),
        }
    }

    /// Build from row-major slots. Returns `None` unless exactly one block per cell is given.
    pub fn from_slots(slots: Vec<Block>) -> Option<Self> {
        (slots.len() == BLOCKS_PER_CHUNK).then(|| Self {
            slots: slots.into_boxed_slice(),
        })
    }

    pub fn get(&self, coord: BlockCoord) -> &Block {
        &self.slots[coord.index()]
    }

    /// Replace a block, returning the previous one.
    pub fn set(&mut self, coord: BlockCoord, block: Block) -> Block {
        std::mem::replace(&mut self.slots[coord.index()], block)
    }

    pub fn iter(&self) -> impl Iterator<Item = (BlockCoord, &Block)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .map(|(i, b)| (BlockCoord::from_index(i), b))
    }

    pub fn slots(&self) -> &[Block] {
        &self.slots
    }
}

impl Default for BlockGrid {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything that owns a block grid: terrain chunks and free-floating block entities.
///
/// Implementors only expose their grid; every query is shared.
pub trait BlockStorage {
    fn grid(&self) -> &BlockGrid;
    fn grid_mut(&mut self) -> &mut BlockGrid;

    fn block(&self, coord: BlockCoord) -> &Block {
        self.grid().get(coord)
    }

    fn set_block(&mut self, coord: BlockCoord, block: Block) -> Block {
        self.grid_mut().set(coord, block)
    }

    fn blocks(&self) -> impl Iterator<Item = (BlockCoord, &Block)> + '_ {
        self.grid().iter()
    }

    fn solid_blocks(&self) -> impl Iterator<Item = (BlockCoord, &Block)> + '_ {
        self.grid().iter().filter(|(_, b)| !b.is_void())
    }

    fn solid_count(&self) -> usize {
        self.solid_blocks().count()
    }
}

impl BlockStorage for BlockGrid {
    fn grid(&self) -> &BlockGrid {
        self
    }

    fn grid_mut(&mut self) -> &mut BlockGrid {
        self
    }
}
