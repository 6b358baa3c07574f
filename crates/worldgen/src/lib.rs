//! World generation: seeded noise and deterministic terrain.
//!
//! # Invariants
//! - Generation is a pure function of (seed, config, coordinate).
//! - Noise samples are always within `[0, 1]`.
//! - Generation never fails once a configuration has validated.

pub mod generator;
pub mod noise;
pub mod seed;

pub use generator::{
    Band, GeneratorConfig, GeneratorError, TerrainGenerator, generate_chunk, generate_sector,
};
pub use noise::NoiseField;
pub use seed::Seed;
