use crate::body::{FixtureDef, bake_body};
use crate::mesh::{MeshData, bake_mesh};
use glam::DVec2;
use tessera_common::WorldChunkCoord;
use tessera_kernel::{BlockTypeDictionary, Chunk};

/// Everything needed to bake one chunk, computed off the owning thread.
///
/// Plain data: `Send`, holds no render or physics handles.
#[derive(Debug, Clone, PartialEq)]
pub struct ChunkArtifacts {
    pub coord: WorldChunkCoord,
    pub mesh: MeshData,
    pub fixtures: Vec<FixtureDef>,
}

impl ChunkArtifacts {
    pub fn compute(coord: WorldChunkCoord, chunk: &Chunk, dictionary: &BlockTypeDictionary) -> Self {
        Self {
            coord,
            mesh: bake_mesh(chunk, dictionary),
            fixtures: bake_body(chunk, dictionary),
        }
    }

    /// World position of the chunk's block (0, 0), where its body is placed.
    pub fn origin(&self) -> DVec2 {
        self.coord.origin().center()
    }
}
