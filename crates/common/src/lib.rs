//! Common: coordinate hierarchy and identifiers shared by every tessera crate.
//!
//! # Invariants
//! - `world = ((sector * 16) + chunk) * 16 + block` on each axis.
//! - Parsing a world coordinate is the exact inverse of combining, with floor
//!   division for negative values.
//! - Local coordinates (`ChunkCoord`, `BlockCoord`) are always in `[0, 16)`.

pub mod coord;
pub mod types;

pub use coord::{
    BLOCKS_PER_CHUNK, BlockCoord, CHUNK_HEIGHT, CHUNK_WIDTH, CHUNKS_PER_SECTOR, ChunkCoord,
    SECTOR_HEIGHT, SECTOR_WIDTH, WorldBlockCoord, WorldChunkCoord, WorldSectorCoord,
};
pub use types::EntityId;
