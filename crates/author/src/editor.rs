use tessera_common::{WorldBlockCoord, WorldChunkCoord, WorldSectorCoord};
use tessera_kernel::{Block, EventPublisher, Terrain, TerrainEvent};

/// A block edit that can be applied to the terrain and reversed.
#[derive(Debug, Clone, PartialEq)]
pub enum EditCommand {
    /// Replace one block. Undo = restore `old`.
    SetBlock {
        coord: WorldBlockCoord,
        old: Block,
        new: Block,
    },
}

impl EditCommand {
    /// Produce the inverse command (for undo).
    pub fn inverse(&self) -> Self {
        match self {
            Self::SetBlock { coord, old, new } => Self::SetBlock {
                coord: *coord,
                old: new.clone(),
                new: old.clone(),
            },
        }
    }

    /// The chunk whose derived state this command invalidates.
    pub fn chunk(&self) -> WorldChunkCoord {
        match self {
            Self::SetBlock { coord, .. } => coord.chunk(),
        }
    }
}

/// Errors from edit operations.
#[derive(Debug, thiserror::Error)]
pub enum EditError {
    #[error("sector {0} is not resident")]
    NotResident(WorldSectorCoord),
}

/// Block editor with undo/redo over the resident terrain.
///
/// Edits write straight into [`Terrain`]. Each returns the touched chunk so the
/// caller can request a rebake; nothing here rebakes on its own.
pub struct Editor {
    undo_stack: Vec<EditCommand>,
    redo_stack: Vec<EditCommand>,
    events: EventPublisher,
}

impl Editor {
    pub fn new() -> Self {
        Self::with_events(EventPublisher::detached())
    }

    pub fn with_events(events: EventPublisher) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            events,
        }
    }

    /// Replace the block at `coord` and push the edit to the undo stack.
    pub fn set_block(
        &mut self,
        terrain: &Terrain,
        coord: WorldBlockCoord,
        block: Block,
    ) -> Result<WorldChunkCoord, EditError> {
        let old = self.write(terrain, coord, block.clone())?;
        let cmd = EditCommand::SetBlock {
            coord,
            old,
            new: block,
        };
        let chunk = cmd.chunk();
        self.undo_stack.push(cmd);
        self.redo_stack.clear();
        Ok(chunk)
    }

    /// Place a block. Same as [`set_block`](Self::set_block).
    pub fn place(
        &mut self,
        terrain: &Terrain,
        coord: WorldBlockCoord,
        block: Block,
    ) -> Result<WorldChunkCoord, EditError> {
        self.set_block(terrain, coord, block)
    }

    /// Clear a block to void.
    pub fn remove(
        &mut self,
        terrain: &Terrain,
        coord: WorldBlockCoord,
    ) -> Result<WorldChunkCoord, EditError> {
        self.set_block(terrain, coord, Block::VOID)
    }

    /// Undo the last edit. Returns the chunk to rebake, or `None` when there is
    /// nothing to undo. A failed undo stays on the stack.
    pub fn undo(&mut self, terrain: &Terrain) -> Result<Option<WorldChunkCoord>, EditError> {
        let Some(cmd) = self.undo_stack.pop() else {
            return Ok(None);
        };
        if let Err(e) = self.apply(terrain, &cmd.inverse()) {
            self.undo_stack.push(cmd);
            return Err(e);
        }
        let chunk = cmd.chunk();
        self.redo_stack.push(cmd);
        Ok(Some(chunk))
    }

    /// Redo the last undone edit.
    pub fn redo(&mut self, terrain: &Terrain) -> Result<Option<WorldChunkCoord>, EditError> {
        let Some(cmd) = self.redo_stack.pop() else {
            return Ok(None);
        };
        if let Err(e) = self.apply(terrain, &cmd) {
            self.redo_stack.push(cmd);
            return Err(e);
        }
        let chunk = cmd.chunk();
        self.undo_stack.push(cmd);
        Ok(Some(chunk))
    }

    fn apply(&self, terrain: &Terrain, cmd: &EditCommand) -> Result<(), EditError> {
        match cmd {
            EditCommand::SetBlock { coord, new, .. } => {
                self.write(terrain, *coord, new.clone())?;
            }
        }
        Ok(())
    }

    fn write(
        &self,
        terrain: &Terrain,
        coord: WorldBlockCoord,
        block: Block,
    ) -> Result<Block, EditError> {
        let previous = terrain
            .set_block(coord, block.clone())
            .ok_or(EditError::NotResident(coord.sector()))?;
        tracing::debug!(%coord, from = %previous.kind, to = %block.kind, "block edited");
        self.events.publish(TerrainEvent::BlockChanged {
            coord,
            previous: previous.clone(),
            current: block,
        });
        Ok(previous)
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }
}

impl Default for Editor {
    fn default() -> Self {
        Self::new()
    }
}
