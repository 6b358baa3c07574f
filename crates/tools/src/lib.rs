//! Developer Tooling: terrain inspector, tag histograms, ASCII sector maps.
//!
//! # Invariants
//! - Tools are read-only; inspecting never changes terrain state.

mod inspector;

pub use inspector::{BlockInfo, SectorReport, TerrainInspector, TerrainSummary};
