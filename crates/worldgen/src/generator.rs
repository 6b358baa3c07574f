use crate::noise::NoiseField;
use crate::seed::Seed;
use serde::{Deserialize, Serialize};
use tessera_common::{WorldBlockCoord, WorldChunkCoord, WorldSectorCoord};
use tessera_kernel::{Block, BlockGrid, BlockType, Chunk, Sector};

/// A block type chosen when the detail value exceeds `above`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Band {
    pub above: f64,
    pub tag: String,
}

/// Tunables for terrain generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
    /// World blocks per unit of the shape noise.
    pub shape_scale: f64,
    /// World blocks per unit of the detail noise.
    pub detail_scale: f64,
    /// Shape values at or below this are void.
    pub solid_threshold: f64,
    /// Checked in order; the first band exceeded wins.
    pub bands: Vec<Band>,
    /// Tag for solid blocks that match no band.
    pub fill: String,
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            shape_scale: 32.0,
            detail_scale: 8.0,
            solid_threshold: 0.67,
            bands: vec![
                Band {
                    above: 0.5,
                    tag: "test1".into(),
                },
                Band {
                    above: 0.45,
                    tag: "test2".into(),
                },
            ],
            fill: "stone".into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GeneratorError {
    #[error("noise scale must be positive and finite, got {0}")]
    BadScale(f64),
    #[error("band {0} has an empty tag")]
    EmptyBandTag(usize),
    #[error("fill tag must not be empty")]
    EmptyFill,
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl GeneratorConfig {
    pub fn validate(&self) -> Result<(), GeneratorError> {
        for scale in [self.shape_scale, self.detail_scale] {
            if !(scale.is_finite() && scale > 0.0) {
                return Err(GeneratorError::BadScale(scale));
            }
        }
        if let Some(i) = self.bands.iter().position(|b| b.tag.is_empty()) {
            return Err(GeneratorError::EmptyBandTag(i));
        }
        if self.fill.is_empty() {
            return Err(GeneratorError::EmptyFill);
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self, GeneratorError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Deterministic terrain generator: the same seed and coordinate always give
/// the same blocks. Safe to share across worker threads.
#[derive(Debug, Clone)]
pub struct TerrainGenerator {
    seed: Seed,
    noise: NoiseField,
    config: GeneratorConfig,
    bands: Vec<(f64, BlockType)>,
    fill: BlockType,
}

impl TerrainGenerator {
    pub fn new(seed: Seed, config: GeneratorConfig) -> Result<Self, GeneratorError> {
        config.validate()?;
        Ok(Self::build(seed, config))
    }

    pub fn with_seed(seed: Seed) -> Self {
        Self::build(seed, GeneratorConfig::default())
    }

    fn build(seed: Seed, config: GeneratorConfig) -> Self {
        let bands = config
            .bands
            .iter()
            .map(|b| (b.above, BlockType::new(&b.tag)))
            .collect();
        let fill = BlockType::new(&config.fill);
        Self {
            noise: NoiseField::new(&seed),
            seed,
            config,
            bands,
            fill,
        }
    }

    pub fn seed(&self) -> &Seed {
        &self.seed
    }

    pub fn config(&self) -> &GeneratorConfig {
        &self.config
    }

    pub fn block_at(&self, coord: WorldBlockCoord) -> Block {
        let (x, y) = (coord.x as f64, coord.y as f64);
        let shape_scale = self.config.shape_scale;
        let shape = self.noise.sample(x / shape_scale, y / shape_scale, 0.0);
        if shape <= self.config.solid_threshold {
            return Block::VOID;
        }
        let detail_scale = self.config.detail_scale;
        let value = shape * self.noise.sample(x / detail_scale, y / detail_scale, 0.0);
        let kind = self
            .bands
            .iter()
            .find(|(above, _)| value > *above)
            .map(|(_, tag)| tag.clone())
            .unwrap_or_else(|| self.fill.clone());
        Block {
            kind,
            ..Block::VOID
        }
    }

    pub fn generate_chunk(&self, coord: WorldChunkCoord) -> Chunk {
        let (_, local) = coord.parse();
        let blocks = BlockGrid::from_fn(|b| self.block_at(WorldBlockCoord::from_chunk(coord, b)));
        Chunk::with_blocks(local, blocks)
    }

    pub fn generate_sector(&self, coord: WorldSectorCoord) -> Sector {
        let _span = tracing::debug_span!("generate_sector", %coord).entered();
        let sector = Sector::from_fn(coord, |c| self.generate_chunk(coord.chunk(c)));
        tracing::trace!(solid = sector.solid_count(), "sector generated");
        sector
    }
}

/// Generate one chunk with the default configuration.
pub fn generate_chunk(seed: &Seed, coord: WorldChunkCoord) -> Chunk {
    TerrainGenerator::with_seed(seed.clone()).generate_chunk(coord)
}

/// Generate one sector with the default configuration.
pub fn generate_sector(seed: &Seed, coord: WorldSectorCoord) -> Sector {
    TerrainGenerator::with_seed(seed.clone()).generate_sector(coord)
}
