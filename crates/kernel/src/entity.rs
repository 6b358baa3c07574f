use crate::storage::{BlockGrid, BlockStorage};
use glam::DVec2;
use tessera_common::EntityId;

/// A free-floating group of blocks with its own identity, such as debris or a
/// thrown object. Simulated as a dynamic body rather than static terrain.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockEntity {
    pub id: EntityId,
    /// World position of the grid's block (0, 0).
    pub position: DVec2,
    pub angle: f64,
    pub blocks: BlockGrid,
}

impl BlockEntity {
    pub fn new(position: DVec2) -> Self {
        Self {
            id: EntityId::new(),
            position,
            angle: 0.0,
            blocks: BlockGrid::new(),
        }
    }
}

impl BlockStorage for BlockEntity {
    fn grid(&self) -> &BlockGrid {
        &self.blocks
    }

    fn grid_mut(&mut self) -> &mut BlockGrid {
        &mut self.blocks
    }
}
