use crate::affinity::ThreadAffinity;
use crate::artifacts::ChunkArtifacts;
use crate::backend::{PhysicsWorld, RenderDevice};
use crate::body::{BodyKind, bake_body};
use crate::mesh::bake_mesh;
use glam::{DVec2, Vec2};
use std::collections::HashMap;
use std::marker::PhantomData;
use tessera_common::{EntityId, WorldChunkCoord};
use tessera_kernel::{BlockEntity, BlockTypeDictionary};

/// Render and physics resources of one baked chunk.
#[derive(Debug)]
pub struct BakedChunk<M, B> {
    /// Residency epoch of the sector the chunk was baked from.
    pub epoch: u64,
    pub mesh: M,
    pub body: B,
    pub origin: DVec2,
}

#[derive(Debug)]
struct BakedEntity<M, B> {
    mesh: M,
    body: B,
}

/// Owner of every render mesh and physics body derived from block data.
///
/// Lives on the thread that owns the graphics and physics contexts and cannot
/// leave it: the type is `!Send`, and each call re-checks the thread in debug
/// builds. Block data reaches it only as finished [`ChunkArtifacts`].
pub struct Baker<R: RenderDevice, P: PhysicsWorld> {
    renderer: R,
    physics: P,
    chunks: HashMap<WorldChunkCoord, BakedChunk<R::Mesh, P::Body>>,
    entities: HashMap<EntityId, BakedEntity<R::Mesh, P::Body>>,
    affinity: ThreadAffinity,
    _not_send: PhantomData<*const ()>,
}

impl<R: RenderDevice, P: PhysicsWorld> Baker<R, P> {
    pub fn new(renderer: R, physics: P) -> Self {
        Self {
            renderer,
            physics,
            chunks: HashMap::new(),
            entities: HashMap::new(),
            affinity: ThreadAffinity::current("baker"),
            _not_send: PhantomData,
        }
    }

    /// Create the mesh and static body for a chunk, replacing any earlier bake
    /// of the same coordinate. Returns the epoch of the replaced bake, if any.
    pub fn bake_chunk(&mut self, artifacts: ChunkArtifacts, epoch: u64) -> Option<u64> {
        self.affinity.check();
        let replaced = self.release_chunk(artifacts.coord);

        let origin = artifacts.origin();
        let mesh = self.renderer.upload(&artifacts.mesh);
        let body = self.physics.create_body(BodyKind::Static, origin);
        for fixture in &artifacts.fixtures {
            self.physics.add_fixture(&body, fixture);
        }
        tracing::trace!(coord = %artifacts.coord, epoch, ?replaced, "baked chunk");
        self.chunks.insert(
            artifacts.coord,
            BakedChunk {
                epoch,
                mesh,
                body,
                origin,
            },
        );
        replaced
    }

    /// Release a chunk's resources if they were baked under `epoch`. A bake from
    /// a newer residency of the same sector is left alone.
    pub fn destroy_chunk(&mut self, coord: WorldChunkCoord, epoch: u64) -> bool {
        self.affinity.check();
        match self.chunks.get(&coord) {
            Some(baked) if baked.epoch == epoch => {}
            Some(baked) => {
                tracing::trace!(%coord, epoch, current = baked.epoch, "skipping stale destroy");
                return false;
            }
            None => return false,
        }
        self.release_chunk(coord).is_some()
    }

    /// Release a chunk regardless of epoch.
    pub fn remove_chunk(&mut self, coord: WorldChunkCoord) -> bool {
        self.affinity.check();
        self.release_chunk(coord).is_some()
    }

    fn release_chunk(&mut self, coord: WorldChunkCoord) -> Option<u64> {
        let baked = self.chunks.remove(&coord)?;
        self.renderer.release(baked.mesh);
        self.physics.destroy_body(baked.body);
        Some(baked.epoch)
    }

    pub fn is_baked(&self, coord: WorldChunkCoord) -> bool {
        self.chunks.contains_key(&coord)
    }

    pub fn baked_epoch(&self, coord: WorldChunkCoord) -> Option<u64> {
        self.chunks.get(&coord).map(|b| b.epoch)
    }

    pub fn baked_chunk(&self, coord: WorldChunkCoord) -> Option<&BakedChunk<R::Mesh, P::Body>> {
        self.chunks.get(&coord)
    }

    pub fn baked_chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Bake a block entity as a dynamic body, replacing an earlier bake.
    pub fn bake_entity(&mut self, entity: &BlockEntity, dictionary: &BlockTypeDictionary) {
        self.affinity.check();
        self.release_entity(entity.id);
        let mesh = self.renderer.upload(&bake_mesh(entity, dictionary));
        let body = self.physics.create_body(BodyKind::Dynamic, entity.position);
        for fixture in bake_body(entity, dictionary) {
            self.physics.add_fixture(&body, &fixture);
        }
        self.entities.insert(entity.id, BakedEntity { mesh, body });
    }

    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        self.affinity.check();
        self.release_entity(id)
    }

    fn release_entity(&mut self, id: EntityId) -> bool {
        let Some(baked) = self.entities.remove(&id) else {
            return false;
        };
        self.renderer.release(baked.mesh);
        self.physics.destroy_body(baked.body);
        true
    }

    pub fn entity_position(&self, id: EntityId) -> Option<DVec2> {
        let baked = self.entities.get(&id)?;
        self.physics.position(&baked.body)
    }

    pub fn push_entity(&mut self, id: EntityId, force: DVec2) -> bool {
        self.affinity.check();
        match self.entities.get(&id) {
            Some(baked) => {
                self.physics.apply_force(&baked.body, force);
                true
            }
            None => false,
        }
    }

    /// Copy the simulated pose back into the entity.
    pub fn sync_entity(&self, entity: &mut BlockEntity) -> bool {
        let Some(baked) = self.entities.get(&entity.id) else {
            return false;
        };
        match (
            self.physics.position(&baked.body),
            self.physics.angle(&baked.body),
        ) {
            (Some(position), Some(angle)) => {
                entity.position = position;
                entity.angle = angle;
                true
            }
            _ => false,
        }
    }

    pub fn step(&mut self, dt: f64) {
        self.affinity.check();
        self.physics.step(dt);
    }

    /// Draw every baked chunk and entity. Returns the number of draw calls.
    pub fn draw(&mut self) -> usize {
        self.affinity.check();
        let mut calls = 0;
        for baked in self.chunks.values() {
            self.renderer.draw(&baked.mesh, baked.origin.as_vec2());
            calls += 1;
        }
        for baked in self.entities.values() {
            let at = self
                .physics
                .position(&baked.body)
                .map_or(Vec2::ZERO, |p| p.as_vec2());
            self.renderer.draw(&baked.mesh, at);
            calls += 1;
        }
        calls
    }

    /// Release everything this baker owns.
    pub fn clear(&mut self) {
        self.affinity.check();
        let coords: Vec<_> = self.chunks.keys().copied().collect();
        for coord in coords {
            self.release_chunk(coord);
        }
        let ids: Vec<_> = self.entities.keys().copied().collect();
        for id in ids {
            self.release_entity(id);
        }
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    pub fn physics(&self) -> &P {
        &self.physics
    }

    pub fn physics_mut(&mut self) -> &mut P {
        &mut self.physics
    }
}

impl<R: RenderDevice, P: PhysicsWorld> Drop for Baker<R, P> {
    fn drop(&mut self) {
        self.clear();
    }
}
