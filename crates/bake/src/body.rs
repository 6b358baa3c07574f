use glam::Vec2;
use tessera_kernel::{BlockStorage, BlockTypeDictionary};

/// How the physics collaborator should simulate a body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// Terrain: never moves.
    Static,
    /// Block entities and actors.
    Dynamic,
}

/// One collision polygon in the body's local space.
#[derive(Debug, Clone, PartialEq)]
pub struct FixtureDef {
    pub vertices: Vec<Vec2>,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
}

impl FixtureDef {
    /// Signed area by the shoelace formula; positive for counter-clockwise winding.
    pub fn area(&self) -> f32 {
        let n = self.vertices.len();
        let twice: f32 = (0..n)
            .map(|i| {
                let (a, b) = (self.vertices[i], self.vertices[(i + 1) % n]);
                a.perp_dot(b)
            })
            .sum();
        twice * 0.5
    }

    pub fn mass(&self) -> f32 {
        self.area().abs() * self.density
    }
}

/// Collision fixtures for any block storage: one polygon per solid block,
/// rotated by the block's orientation and offset to its coordinate. Blocks with
/// a tag missing from the dictionary are skipped.
pub fn bake_body(storage: &impl BlockStorage, dictionary: &BlockTypeDictionary) -> Vec<FixtureDef> {
    let mut fixtures = Vec::new();
    for (coord, block) in storage.solid_blocks() {
        let Some(desc) = dictionary.get(&block.kind) else {
            tracing::warn!(tag = %block.kind, %coord, "no descriptor for block type; no collision");
            continue;
        };
        let offset = Vec2::new(coord.x() as f32, coord.y() as f32);
        fixtures.push(FixtureDef {
            vertices: desc
                .polygon
                .iter()
                .map(|&v| block.orientation.rotate(v) + offset)
                .collect(),
            density: desc.density,
            friction: desc.friction,
            restitution: desc.restitution,
        });
    }
    fixtures
}
