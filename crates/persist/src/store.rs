//! File-backed sector store.
//!
//! Layout inside the store directory:
//! ```text
//! sector_{x}_{y}.cbor.zst   - one CBOR+zstd compressed sector file per sector
//! ```

use crate::format::SectorFile;
use crate::{PersistError, cbor_deserialize, cbor_serialize, zstd_compress, zstd_decompress};
use std::path::{Path, PathBuf};
use tessera_common::WorldSectorCoord;
use tessera_kernel::Sector;

const PREFIX: &str = "sector_";
const SUFFIX: &str = ".cbor.zst";

/// Directory of sector files. Cheap to clone and share across threads; each
/// call touches exactly one file.
#[derive(Debug, Clone)]
pub struct SectorStore {
    root: PathBuf,
}

impl SectorStore {
    /// Open or create a store at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let root = path.as_ref().to_path_buf();
        std::fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_for(&self, coord: WorldSectorCoord) -> PathBuf {
        self.root
            .join(format!("{PREFIX}{}_{}{SUFFIX}", coord.x, coord.y))
    }

    pub fn exists(&self, coord: WorldSectorCoord) -> bool {
        self.path_for(coord).exists()
    }

    /// Write a sector, replacing any earlier save. The file is written beside
    /// its final path and renamed into place.
    pub fn save(&self, sector: &Sector) -> Result<PathBuf, PersistError> {
        let path = self.path_for(sector.coord);
        let file = SectorFile::encode(sector)?;
        let compressed = zstd_compress(&cbor_serialize(&file)?)?;

        let tmp = path.with_extension("zst.tmp");
        std::fs::write(&tmp, &compressed)?;
        std::fs::rename(&tmp, &path)?;

        tracing::debug!(coord = %sector.coord, bytes = compressed.len(), "saved sector");
        Ok(path)
    }

    /// Read a sector. A missing file is `Ok(None)`; an unreadable one is an error.
    pub fn load(&self, coord: WorldSectorCoord) -> Result<Option<Sector>, PersistError> {
        let path = self.path_for(coord);
        let compressed = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: SectorFile = cbor_deserialize(&zstd_decompress(&compressed)?)?;
        let sector = file.decode(coord)?;
        tracing::debug!(%coord, "loaded sector");
        Ok(Some(sector))
    }

    /// Delete a saved sector. Returns whether a file was removed.
    pub fn remove(&self, coord: WorldSectorCoord) -> Result<bool, PersistError> {
        match std::fs::remove_file(self.path_for(coord)) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Every saved sector coordinate, sorted.
    pub fn list(&self) -> Result<Vec<WorldSectorCoord>, PersistError> {
        let mut coords = Vec::new();
        for entry in std::fs::read_dir(&self.root)? {
            let name = entry?.file_name();
            if let Some(coord) = name.to_str().and_then(parse_file_name) {
                coords.push(coord);
            }
        }
        coords.sort();
        Ok(coords)
    }
}

fn parse_file_name(name: &str) -> Option<WorldSectorCoord> {
    let body = name.strip_prefix(PREFIX)?.strip_suffix(SUFFIX)?;
    // Split on the separator after the first character so a leading minus on x survives.
    let split = body.get(1..)?.find('_')? + 1;
    let x = body[..split].parse().ok()?;
    let y = body[split + 1..].parse().ok()?;
    Some(WorldSectorCoord::new(x, y))
}
