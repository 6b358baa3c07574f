use crate::body::{BodyKind, FixtureDef};
use crate::mesh::MeshData;
use glam::{DVec2, Vec2};

/// Renderer collaborator. Handles are owned values so a mesh can only be
/// released once.
///
/// Every method must be called on the thread that owns the graphics context.
pub trait RenderDevice {
    type Mesh;

    fn upload(&mut self, mesh: &MeshData) -> Self::Mesh;
    fn release(&mut self, mesh: Self::Mesh);
    /// Draw a mesh translated into world block space.
    fn draw(&mut self, mesh: &Self::Mesh, translation: Vec2);
}

/// Physics collaborator: an opaque rigid-body service.
///
/// Every method must be called on the thread that owns the physics world.
pub trait PhysicsWorld {
    type Body;

    fn create_body(&mut self, kind: BodyKind, position: DVec2) -> Self::Body;
    fn add_fixture(&mut self, body: &Self::Body, fixture: &FixtureDef);
    fn destroy_body(&mut self, body: Self::Body);

    fn position(&self, body: &Self::Body) -> Option<DVec2>;
    fn angle(&self, body: &Self::Body) -> Option<f64>;
    fn apply_force(&mut self, body: &Self::Body, force: DVec2);
    fn step(&mut self, dt: f64);
}
