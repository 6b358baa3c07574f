use crate::backend::{PhysicsWorld, RenderDevice};
use crate::body::{BodyKind, FixtureDef};
use crate::mesh::MeshData;
use glam::{DVec2, Vec2};
use std::collections::HashMap;
use std::fmt::Write as _;

/// Handle to a mesh held by [`HeadlessRenderer`].
#[derive(Debug, PartialEq, Eq)]
pub struct HeadlessMesh(u64);

#[derive(Debug, Clone, Copy)]
struct MeshStats {
    quads: usize,
    visible: usize,
}

/// Renderer without a GPU. Tracks uploads, releases and draws so tests and
/// the CLI can observe what a real backend would have done.
#[derive(Debug, Default)]
pub struct HeadlessRenderer {
    next_id: u64,
    live: HashMap<u64, MeshStats>,
    uploads: u64,
    releases: u64,
    frame: Vec<(u64, Vec2)>,
}

impl HeadlessRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_meshes(&self) -> usize {
        self.live.len()
    }

    pub fn uploads(&self) -> u64 {
        self.uploads
    }

    pub fn releases(&self) -> u64 {
        self.releases
    }

    /// Forget the draws recorded for the previous frame.
    pub fn begin_frame(&mut self) {
        self.frame.clear();
    }

    pub fn draws_this_frame(&self) -> usize {
        self.frame.len()
    }

    pub fn visible_quads_this_frame(&self) -> usize {
        self.frame
            .iter()
            .filter_map(|(id, _)| self.live.get(id))
            .map(|s| s.visible)
            .sum()
    }

    /// Human-readable summary of the current frame.
    pub fn frame_report(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "=== Frame (meshes={}, uploads={}, releases={}) ===",
            self.live.len(),
            self.uploads,
            self.releases
        );
        let _ = writeln!(
            out,
            "Draws: {} ({} visible quads)",
            self.frame.len(),
            self.visible_quads_this_frame()
        );
        for (id, at) in &self.frame {
            if let Some(stats) = self.live.get(id) {
                let _ = writeln!(
                    out,
                    "  mesh#{id} at=({:.1}, {:.1}) quads={} visible={}",
                    at.x, at.y, stats.quads, stats.visible
                );
            }
        }
        out
    }
}

impl RenderDevice for HeadlessRenderer {
    type Mesh = HeadlessMesh;

    fn upload(&mut self, mesh: &MeshData) -> HeadlessMesh {
        self.next_id += 1;
        self.uploads += 1;
        self.live.insert(
            self.next_id,
            MeshStats {
                quads: mesh.quad_count(),
                visible: mesh.visible_quads(),
            },
        );
        HeadlessMesh(self.next_id)
    }

    fn release(&mut self, mesh: HeadlessMesh) {
        if self.live.remove(&mesh.0).is_none() {
            tracing::warn!(id = mesh.0, "released a mesh that was not live");
        }
        self.releases += 1;
    }

    fn draw(&mut self, mesh: &HeadlessMesh, translation: Vec2) {
        self.frame.push((mesh.0, translation));
    }
}

/// Handle to a body held by [`HeadlessPhysics`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct BodyHandle(u64);

#[derive(Debug, Clone)]
struct BodyState {
    kind: BodyKind,
    position: DVec2,
    velocity: DVec2,
    angle: f64,
    force: DVec2,
    mass: f64,
    fixtures: usize,
}

/// Minimal rigid-body world: explicit Euler integration of dynamic bodies,
/// no collision response. Enough to drive a tracked entity headlessly.
#[derive(Debug)]
pub struct HeadlessPhysics {
    next_id: u64,
    bodies: HashMap<u64, BodyState>,
    pub gravity: DVec2,
    pub linear_damping: f64,
}

impl HeadlessPhysics {
    pub fn new() -> Self {
        Self {
            next_id: 0,
            bodies: HashMap::new(),
            gravity: DVec2::ZERO,
            linear_damping: 0.0,
        }
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    pub fn static_body_count(&self) -> usize {
        self.bodies
            .values()
            .filter(|b| b.kind == BodyKind::Static)
            .count()
    }

    pub fn fixture_count(&self) -> usize {
        self.bodies.values().map(|b| b.fixtures).sum()
    }

    pub fn velocity(&self, body: &BodyHandle) -> Option<DVec2> {
        self.bodies.get(&body.0).map(|b| b.velocity)
    }
}

impl Default for HeadlessPhysics {
    fn default() -> Self {
        Self::new()
    }
}

impl PhysicsWorld for HeadlessPhysics {
    type Body = BodyHandle;

    fn create_body(&mut self, kind: BodyKind, position: DVec2) -> BodyHandle {
        self.next_id += 1;
        self.bodies.insert(
            self.next_id,
            BodyState {
                kind,
                position,
                velocity: DVec2::ZERO,
                angle: 0.0,
                force: DVec2::ZERO,
                mass: 0.0,
                fixtures: 0,
            },
        );
        BodyHandle(self.next_id)
    }

    fn add_fixture(&mut self, body: &BodyHandle, fixture: &FixtureDef) {
        if let Some(state) = self.bodies.get_mut(&body.0) {
            state.mass += fixture.mass() as f64;
            state.fixtures += 1;
        }
    }

    fn destroy_body(&mut self, body: BodyHandle) {
        if self.bodies.remove(&body.0).is_none() {
            tracing::warn!(id = body.0, "destroyed a body that did not exist");
        }
    }

    fn position(&self, body: &BodyHandle) -> Option<DVec2> {
        self.bodies.get(&body.0).map(|b| b.position)
    }

    fn angle(&self, body: &BodyHandle) -> Option<f64> {
        self.bodies.get(&body.0).map(|b| b.angle)
    }

    fn apply_force(&mut self, body: &BodyHandle, force: DVec2) {
        if let Some(state) = self.bodies.get_mut(&body.0) {
            state.force += force;
        }
    }

    fn step(&mut self, dt: f64) {
        let damping = (1.0 - self.linear_damping * dt).max(0.0);
        for body in self.bodies.values_mut() {
            if body.kind == BodyKind::Static {
                continue;
            }
            // Massless bodies integrate as unit mass.
            let mass = if body.mass > 0.0 { body.mass } else { 1.0 };
            let accel = body.force / mass + self.gravity;
            body.velocity = (body.velocity + accel * dt) * damping;
            body.position += body.velocity * dt;
            body.force = DVec2::ZERO;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_kernel::{BlockGrid, BlockTypeDictionary};

    #[test]
    fn renderer_tracks_live_meshes() {
        let mut r = HeadlessRenderer::new();
        let mesh = crate::bake_mesh(&BlockGrid::new(), &BlockTypeDictionary::default_catalog());
        let a = r.upload(&mesh);
        let b = r.upload(&mesh);
        assert_ne!(a, b);
        assert_eq!(r.live_meshes(), 2);
        r.release(a);
        assert_eq!(r.live_meshes(), 1);
        assert_eq!((r.uploads(), r.releases()), (2, 1));
    }

    #[test]
    fn frame_report_lists_draws() {
        let mut r = HeadlessRenderer::new();
        let mesh = r.upload(&MeshData::default());
        r.begin_frame();
        r.draw(&mesh, Vec2::new(16.0, -32.0));
        let report = r.frame_report();
        assert!(report.contains("Draws: 1"));
        assert!(report.contains("at=(16.0, -32.0)"));
        r.begin_frame();
        assert_eq!(r.draws_this_frame(), 0);
    }

    #[test]
    fn static_bodies_do_not_move() {
        let mut p = HeadlessPhysics::new();
        p.gravity = DVec2::new(0.0, -9.8);
        let body = p.create_body(BodyKind::Static, DVec2::new(16.0, 0.0));
        p.apply_force(&body, DVec2::new(100.0, 0.0));
        p.step(1.0);
        assert_eq!(p.position(&body), Some(DVec2::new(16.0, 0.0)));
        assert_eq!(p.static_body_count(), 1);
    }

    #[test]
    fn dynamic_body_integrates_force() {
        let mut p = HeadlessPhysics::new();
        let body = p.create_body(BodyKind::Dynamic, DVec2::ZERO);
        p.apply_force(&body, DVec2::new(2.0, 0.0));
        p.step(0.5);
        assert_eq!(p.velocity(&body), Some(DVec2::new(1.0, 0.0)));
        assert_eq!(p.position(&body), Some(DVec2::new(0.5, 0.0)));
        // Force is cleared after each step.
        p.step(0.5);
        assert_eq!(p.position(&body), Some(DVec2::new(1.0, 0.0)));
    }

    #[test]
    fn destroyed_body_is_gone() {
        let mut p = HeadlessPhysics::new();
        let body = p.create_body(BodyKind::Dynamic, DVec2::ZERO);
        let probe = BodyHandle(body.0);
        p.destroy_body(body);
        assert!(p.position(&probe).is_none());
        assert_eq!(p.body_count(), 0);
    }
}
