//! Sector file format.
//!
//! A sector is palette-encoded: every distinct tag is listed once and each
//! chunk stores one palette index and one orientation per block, in row-major
//! slot order. Chunk and block coordinates are implied by position. Palette
//! entry 0 is always the void tag.

use crate::PersistError;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tessera_common::{BLOCKS_PER_CHUNK, CHUNKS_PER_SECTOR, WorldSectorCoord};
use tessera_kernel::{Block, BlockGrid, BlockType, Chunk, Orientation, Sector};

pub const SECTOR_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectorFile {
    pub schema_version: u32,
    /// Informational; the coordinate requested by the loader is authoritative.
    pub coord: [i64; 2],
    pub palette: Vec<String>,
    pub chunks: Vec<ChunkRecord>,
    /// SHA-256 over the CBOR encoding of `(palette, chunks)`.
    pub digest: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChunkRecord {
    pub cells: Vec<u16>,
    pub orientations: Vec<u8>,
}

impl SectorFile {
    pub fn encode(sector: &Sector) -> Result<Self, PersistError> {
        let mut palette = vec![String::new()];
        let mut lookup: HashMap<BlockType, u16> = HashMap::from([(BlockType::VOID, 0)]);

        let mut chunks = Vec::with_capacity(CHUNKS_PER_SECTOR);
        for chunk in sector.chunks() {
            let mut cells = Vec::with_capacity(BLOCKS_PER_CHUNK);
            let mut orientations = Vec::with_capacity(BLOCKS_PER_CHUNK);
            for block in chunk.blocks.slots() {
                let index = match lookup.get(&block.kind) {
                    Some(&i) => i,
                    None => {
                        let i = u16::try_from(palette.len()).map_err(|_| {
                            PersistError::Malformed("more than 65536 distinct block types".into())
                        })?;
                        palette.push(block.kind.as_str().to_string());
                        lookup.insert(block.kind.clone(), i);
                        i
                    }
                };
                cells.push(index);
                orientations.push(block.orientation.quarter_turns());
            }
            chunks.push(ChunkRecord {
                cells,
                orientations,
            });
        }

        let digest = payload_digest(&palette, &chunks)?;
        Ok(Self {
            schema_version: SECTOR_SCHEMA_VERSION,
            coord: [sector.coord.x, sector.coord.y],
            palette,
            chunks,
            digest,
        })
    }

    /// Rebuild the sector at `coord`, checking schema, digest and shape.
    pub fn decode(self, coord: WorldSectorCoord) -> Result<Sector, PersistError> {
        if self.schema_version != SECTOR_SCHEMA_VERSION {
            return Err(PersistError::SchemaMismatch {
                file_version: self.schema_version,
                expected_version: SECTOR_SCHEMA_VERSION,
            });
        }
        let actual = payload_digest(&self.palette, &self.chunks)?;
        if actual != self.digest {
            return Err(PersistError::IntegrityMismatch {
                expected: self.digest,
                actual,
            });
        }
        if self.coord != [coord.x, coord.y] {
            tracing::warn!(
                %coord,
                stored = ?self.coord,
                "sector file records a different coordinate; using requested one"
            );
        }
        if self.chunks.len() != CHUNKS_PER_SECTOR {
            return Err(PersistError::Malformed(format!(
                "expected {CHUNKS_PER_SECTOR} chunks, found {}",
                self.chunks.len()
            )));
        }

        let palette: Vec<BlockType> = self.palette.iter().map(|t| BlockType::new(t)).collect();
        let mut chunks = Vec::with_capacity(CHUNKS_PER_SECTOR);
        for (i, record) in self.chunks.into_iter().enumerate() {
            if record.cells.len() != BLOCKS_PER_CHUNK
                || record.orientations.len() != BLOCKS_PER_CHUNK
            {
                return Err(PersistError::Malformed(format!(
                    "chunk {i} has {} cells and {} orientations",
                    record.cells.len(),
                    record.orientations.len()
                )));
            }
            let mut slots = Vec::with_capacity(BLOCKS_PER_CHUNK);
            for (&cell, &turns) in record.cells.iter().zip(&record.orientations) {
                let kind = palette.get(cell as usize).cloned().ok_or_else(|| {
                    PersistError::Malformed(format!("chunk {i} references palette entry {cell}"))
                })?;
                slots.push(Block {
                    kind,
                    orientation: Orientation::from_quarter_turns(turns),
                });
            }
            let grid = BlockGrid::from_slots(slots)
                .ok_or_else(|| PersistError::Malformed(format!("chunk {i} is not full")))?;
            chunks.push(Chunk::with_blocks(tessera_common::ChunkCoord::from_index(i), grid));
        }

        Sector::from_chunks(coord, chunks)
            .ok_or_else(|| PersistError::Malformed("sector is not full".into()))
    }
}

fn payload_digest(palette: &[String], chunks: &[ChunkRecord]) -> Result<String, PersistError> {
    let bytes = crate::cbor_serialize(&(palette, chunks))?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(format!("{:x}", hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessera_common::{BlockCoord, ChunkCoord};

    fn sample_sector() -> Sector {
        let mut sector = Sector::new(WorldSectorCoord::new(-2, 5));
        sector.set_block(
            ChunkCoord::new(0, 0),
            BlockCoord::new(0, 0),
            Block::new("stone"),
        );
        sector.set_block(
            ChunkCoord::new(15, 15),
            BlockCoord::new(3, 4),
            Block::new("test1").with_orientation(Orientation::Deg270),
        );
        sector
    }

    #[test]
    fn palette_starts_with_void() {
        let file = SectorFile::encode(&sample_sector()).unwrap();
        assert_eq!(file.palette, vec!["", "stone", "test1"]);
        assert_eq!(file.chunks.len(), CHUNKS_PER_SECTOR);
        assert_eq!(file.chunks[255].orientations[BlockCoord::new(3, 4).index()], 3);
    }

    #[test]
    fn decode_restores_blocks() {
        let sector = sample_sector();
        let file = SectorFile::encode(&sector).unwrap();
        assert_eq!(file.decode(sector.coord).unwrap(), sector);
    }

    #[test]
    fn tampered_payload_fails_integrity() {
        let sector = sample_sector();
        let mut file = SectorFile::encode(&sector).unwrap();
        file.chunks[3].cells[0] = 1;
        assert!(matches!(
            file.decode(sector.coord),
            Err(PersistError::IntegrityMismatch { .. })
        ));
    }

    #[test]
    fn future_schema_rejected() {
        let sector = sample_sector();
        let mut file = SectorFile::encode(&sector).unwrap();
        file.schema_version = 42;
        assert!(matches!(
            file.decode(sector.coord),
            Err(PersistError::SchemaMismatch {
                file_version: 42,
                ..
            })
        ));
    }

    #[test]
    fn out_of_range_palette_index_is_malformed() {
        let sector = sample_sector();
        let mut file = SectorFile::encode(&sector).unwrap();
        file.chunks[0].cells[0] = 9;
        file.digest = payload_digest(&file.palette, &file.chunks).unwrap();
        assert!(matches!(
            file.decode(sector.coord),
            Err(PersistError::Malformed(_))
        ));
    }

    #[test]
    fn stored_coordinate_is_not_authoritative() {
        let sector = sample_sector();
        let file = SectorFile::encode(&sector).unwrap();
        let moved = file.decode(WorldSectorCoord::new(7, 7)).unwrap();
        assert_eq!(moved.coord, WorldSectorCoord::new(7, 7));
        assert_eq!(moved.solid_count(), 2);
    }
}
