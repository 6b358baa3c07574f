//! World Kernel: blocks, chunks, sectors, block type dictionary and resident terrain.
//!
//! # Invariants
//! - Chunks and sectors are always full 16x16 grids; empty cells are void blocks.
//! - Block data never carries derived render or physics state.
//! - Querying a non-resident sector yields `None`, never a void block.
//! - Each residency of a sector has a unique, increasing epoch.
//! - No write lands in a sector after it has been removed.

pub mod block;
pub mod chunk;
pub mod dictionary;
pub mod entity;
pub mod events;
pub mod storage;
pub mod terrain;

pub use block::{Block, BlockType, Orientation};
pub use chunk::{Chunk, Sector};
pub use dictionary::{BlockCatalog, BlockTypeDescriptor, BlockTypeDictionary, DictionaryError};
pub use entity::BlockEntity;
pub use events::{EventBus, EventPublisher, SectorSource, TerrainEvent};
pub use storage::{BlockGrid, BlockStorage};
pub use terrain::{EvictedSector, ResidentSector, Terrain};
