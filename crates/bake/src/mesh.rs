use bytemuck::{Pod, Zeroable};
use tessera_kernel::{BlockStorage, BlockTypeDictionary};

/// Vertex layout shared with the renderer: xyz position and uv + texture-array layer.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    pub position: [f32; 3],
    pub tex_coord: [f32; 3],
}

/// Indexed triangle list for one chunk or block entity, in its local block space.
///
/// Every block slot owns exactly four vertices and six indices, void or not.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u16>,
}

impl MeshData {
    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    pub fn quad_count(&self) -> usize {
        self.vertices.len() / 4
    }

    /// Quads with non-zero area.
    pub fn visible_quads(&self) -> usize {
        self.vertices
            .chunks_exact(4)
            .filter(|q| q[0].position != q[2].position)
            .count()
    }
}

// Corner order: top-left, bottom-left, bottom-right, top-right.
const CORNERS: [[f32; 2]; 4] = [[-0.5, 0.5], [-0.5, -0.5], [0.5, -0.5], [0.5, 0.5]];
const UVS: [[f32; 2]; 4] = [[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]];
const QUAD_INDICES: [u16; 6] = [0, 1, 2, 0, 2, 3];

/// Build the mesh for any block storage.
///
/// Solid blocks become unit quads centred on their block coordinate. Texture
/// coordinates are rotated by the block's orientation; the layer comes from the
/// dictionary (layer 0 for unknown tags). Void blocks become zero-area quads at
/// the origin so vertex and index counts never depend on content.
pub fn bake_mesh(storage: &impl BlockStorage, dictionary: &BlockTypeDictionary) -> MeshData {
    let mut vertices = Vec::with_capacity(tessera_common::BLOCKS_PER_CHUNK * 4);
    let mut indices = Vec::with_capacity(tessera_common::BLOCKS_PER_CHUNK * 6);

    for (slot, (coord, block)) in storage.blocks().enumerate() {
        if block.is_void() {
            vertices.extend([Vertex::zeroed(); 4]);
        } else {
            let layer = match dictionary.layer(&block.kind) {
                Some(layer) => layer as f32,
                None => {
                    tracing::warn!(tag = %block.kind, "unknown block type; using layer 0");
                    0.0
                }
            };
            let (x, y) = (coord.x() as f32, coord.y() as f32);
            let turns = block.orientation.quarter_turns() as usize;
            for (i, corner) in CORNERS.iter().enumerate() {
                let uv = UVS[(i + turns) % 4];
                vertices.push(Vertex {
                    position: [corner[0] + x, corner[1] + y, 0.0],
                    tex_coord: [uv[0], uv[1], layer],
                });
            }
        }
        let base = (slot * 4) as u16;
        indices.extend(QUAD_INDICES.iter().map(|i| base + i));
    }

    MeshData { vertices, indices }
}
