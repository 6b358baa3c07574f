//! Baking: turn block data into render meshes and collision bodies.
//!
//! # Invariants
//! - Mesh and fixture computation is pure and may run on any thread.
//! - Render and physics objects are created and destroyed only on the thread
//!   that owns the [`Baker`].
//! - Every block slot yields exactly four vertices and six indices.
//!
//! # Workaround
//! Ships headless render and physics backends so streaming can run and be
//! tested without a GPU or a physics engine. Real backends implement
//! [`RenderDevice`] and [`PhysicsWorld`] without changing consumers.

mod affinity;
mod artifacts;
mod backend;
mod baker;
mod body;
mod headless;
mod mesh;

pub use affinity::ThreadAffinity;
pub use artifacts::ChunkArtifacts;
pub use backend::{PhysicsWorld, RenderDevice};
pub use baker::{BakedChunk, Baker};
pub use body::{BodyKind, FixtureDef, bake_body};
pub use headless::{BodyHandle, HeadlessMesh, HeadlessPhysics, HeadlessRenderer};
pub use mesh::{MeshData, Vertex, bake_mesh};
