use glam::DVec2;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Blocks along the x axis of a chunk.
pub const CHUNK_WIDTH: usize = 16;
/// Blocks along the y axis of a chunk.
pub const CHUNK_HEIGHT: usize = 16;
/// Chunks along the x axis of a sector.
pub const SECTOR_WIDTH: usize = 16;
/// Chunks along the y axis of a sector.
pub const SECTOR_HEIGHT: usize = 16;

pub const BLOCKS_PER_CHUNK: usize = CHUNK_WIDTH * CHUNK_HEIGHT;
pub const CHUNKS_PER_SECTOR: usize = SECTOR_WIDTH * SECTOR_HEIGHT;

const CW: i64 = CHUNK_WIDTH as i64;
const CH: i64 = CHUNK_HEIGHT as i64;
const SW: i64 = SECTOR_WIDTH as i64;
const SH: i64 = SECTOR_HEIGHT as i64;

macro_rules! world_coord {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        pub struct $name {
            pub x: i64,
            pub y: i64,
        }

        impl $name {
            pub const ORIGIN: Self = Self { x: 0, y: 0 };

            pub const fn new(x: i64, y: i64) -> Self {
                Self { x, y }
            }

            pub const fn offset(self, dx: i64, dy: i64) -> Self {
                Self::new(self.x + dx, self.y + dy)
            }

            /// Chebyshev distance: the number of rings separating two coordinates.
            pub fn ring_distance(self, other: Self) -> i64 {
                (self.x - other.x).abs().max((self.y - other.y).abs())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "({}, {})", self.x, self.y)
            }
        }
    };
}

macro_rules! local_coord {
    ($(#[$meta:meta])* $name:ident, $width:expr, $height:expr) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
        pub struct $name {
            x: u8,
            y: u8,
        }

        impl $name {
            pub const WIDTH: usize = $width;
            pub const HEIGHT: usize = $height;

            /// Panics when either component is out of range.
            pub fn new(x: u8, y: u8) -> Self {
                Self::try_new(x, y).unwrap_or_else(|| {
                    panic!(
                        "{} ({x}, {y}) outside [0, {}) x [0, {})",
                        stringify!($name),
                        Self::WIDTH,
                        Self::HEIGHT
                    )
                })
            }

            pub fn try_new(x: u8, y: u8) -> Option<Self> {
                ((x as usize) < Self::WIDTH && (y as usize) < Self::HEIGHT).then_some(Self { x, y })
            }

            pub fn x(self) -> u8 {
                self.x
            }

            pub fn y(self) -> u8 {
                self.y
            }

            /// Row-major slot index.
            pub fn index(self) -> usize {
                self.y as usize * Self::WIDTH + self.x as usize
            }

            /// Inverse of [`Self::index`]. Panics when `index` is out of range.
            pub fn from_index(index: usize) -> Self {
                assert!(
                    index < Self::WIDTH * Self::HEIGHT,
                    "{} index {index} out of range",
                    stringify!($name)
                );
                Self {
                    x: (index % Self::WIDTH) as u8,
                    y: (index / Self::WIDTH) as u8,
                }
            }

            /// Every coordinate in row-major order.
            pub fn all() -> impl Iterator<Item = Self> {
                (0..Self::WIDTH * Self::HEIGHT).map(Self::from_index)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "({}, {})", self.x, self.y)
            }
        }
    };
}

world_coord!(
    /// Absolute position of a single block.
    WorldBlockCoord
);
world_coord!(
    /// Absolute position of a chunk.
    WorldChunkCoord
);
world_coord!(
    /// Absolute position of a sector, the unit of persistence and streaming.
    WorldSectorCoord
);
local_coord!(
    /// Chunk position inside its sector.
    ChunkCoord,
    SECTOR_WIDTH,
    SECTOR_HEIGHT
);
local_coord!(
    /// Block position inside its chunk.
    BlockCoord,
    CHUNK_WIDTH,
    CHUNK_HEIGHT
);

impl WorldBlockCoord {
    pub fn combine(sector: WorldSectorCoord, chunk: ChunkCoord, block: BlockCoord) -> Self {
        Self::from_chunk(WorldChunkCoord::combine(sector, chunk), block)
    }

    pub fn from_chunk(chunk: WorldChunkCoord, block: BlockCoord) -> Self {
        Self::new(
            chunk.x * CW + block.x as i64,
            chunk.y * CH + block.y as i64,
        )
    }

    /// Split into sector, chunk-in-sector and block-in-chunk using floor division.
    pub fn parse(self) -> (WorldSectorCoord, ChunkCoord, BlockCoord) {
        let (chunk, block) = self.split();
        let (sector, local) = chunk.parse();
        (sector, local, block)
    }

    pub fn split(self) -> (WorldChunkCoord, BlockCoord) {
        let chunk = WorldChunkCoord::new(self.x.div_euclid(CW), self.y.div_euclid(CH));
        let block = BlockCoord {
            x: self.x.rem_euclid(CW) as u8,
            y: self.y.rem_euclid(CH) as u8,
        };
        (chunk, block)
    }

    pub fn chunk(self) -> WorldChunkCoord {
        self.split().0
    }

    pub fn sector(self) -> WorldSectorCoord {
        self.parse().0
    }

    /// The block whose unit square contains `position`. Blocks are centred on
    /// their integer coordinate.
    pub fn containing(position: DVec2) -> Self {
        let p = (position + DVec2::splat(0.5)).floor();
        Self::new(p.x as i64, p.y as i64)
    }

    pub fn center(self) -> DVec2 {
        DVec2::new(self.x as f64, self.y as f64)
    }
}

impl WorldChunkCoord {
    pub fn combine(sector: WorldSectorCoord, chunk: ChunkCoord) -> Self {
        Self::new(sector.x * SW + chunk.x as i64, sector.y * SH + chunk.y as i64)
    }

    pub fn parse(self) -> (WorldSectorCoord, ChunkCoord) {
        let sector = WorldSectorCoord::new(self.x.div_euclid(SW), self.y.div_euclid(SH));
        let chunk = ChunkCoord {
            x: self.x.rem_euclid(SW) as u8,
            y: self.y.rem_euclid(SH) as u8,
        };
        (sector, chunk)
    }

    pub fn sector(self) -> WorldSectorCoord {
        self.parse().0
    }

    /// World position of block (0, 0) of this chunk.
    pub fn origin(self) -> WorldBlockCoord {
        WorldBlockCoord::from_chunk(self, BlockCoord::default())
    }
}

impl WorldSectorCoord {
    pub fn left(self) -> Self {
        self.offset(-1, 0)
    }

    pub fn right(self) -> Self {
        self.offset(1, 0)
    }

    pub fn up(self) -> Self {
        self.offset(0, 1)
    }

    pub fn down(self) -> Self {
        self.offset(0, -1)
    }

    pub fn chunk(self, chunk: ChunkCoord) -> WorldChunkCoord {
        WorldChunkCoord::combine(self, chunk)
    }

    /// Every chunk of the sector in slot order.
    pub fn chunks(self) -> impl Iterator<Item = WorldChunkCoord> {
        ChunkCoord::all().map(move |c| self.chunk(c))
    }

    /// The square of sectors within `radius` rings, ordered centre first and then
    /// ring by ring.
    pub fn neighborhood(self, radius: u32) -> Vec<WorldSectorCoord> {
        let r = radius as i64;
        let side = (2 * r + 1) as usize;
        let mut out = Vec::with_capacity(side * side);
        for ring in 0..=r {
            for dy in -ring..=ring {
                for dx in -ring..=ring {
                    if dx.abs().max(dy.abs()) == ring {
                        out.push(self.offset(dx, dy));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn parsed(x: i64, y: i64) -> ((i64, i64), (u8, u8), (u8, u8)) {
        let (s, c, b) = WorldBlockCoord::new(x, y).parse();
        ((s.x, s.y), (c.x(), c.y()), (b.x(), b.y()))
    }

    #[test]
    fn parse_known_vectors() {
        assert_eq!(parsed(0, 1), ((0, 0), (0, 0), (0, 1)));
        assert_eq!(parsed(-1, -1), ((-1, -1), (15, 15), (15, 15)));
        assert_eq!(parsed(16, 16), ((0, 0), (1, 1), (0, 0)));
        assert_eq!(parsed(256, 256), ((1, 1), (0, 0), (0, 0)));
        assert_eq!(parsed(17, 33), ((0, 0), (1, 2), (1, 1)));
    }

    #[test]
    fn local_coord_rejects_out_of_range() {
        assert!(BlockCoord::try_new(16, 0).is_none());
        assert!(ChunkCoord::try_new(0, 200).is_none());
        assert!(BlockCoord::try_new(15, 15).is_some());
    }

    #[test]
    #[should_panic]
    fn local_coord_new_panics_out_of_range() {
        let _ = ChunkCoord::new(16, 3);
    }

    #[test]
    fn index_is_row_major() {
        assert_eq!(BlockCoord::new(3, 2).index(), 35);
        assert_eq!(BlockCoord::from_index(35), BlockCoord::new(3, 2));
        assert_eq!(BlockCoord::all().count(), BLOCKS_PER_CHUNK);
    }

    #[test]
    fn chunk_origin_is_first_block() {
        let chunk = WorldChunkCoord::new(-2, 3);
        assert_eq!(chunk.origin(), WorldBlockCoord::new(-32, 48));
        assert_eq!(chunk.origin().chunk(), chunk);
    }

    #[test]
    fn containing_rounds_to_block_centre() {
        assert_eq!(WorldBlockCoord::containing(DVec2::new(0.49, -0.49)), WorldBlockCoord::new(0, 0));
        assert_eq!(WorldBlockCoord::containing(DVec2::new(0.5, -0.51)), WorldBlockCoord::new(1, -1));
        assert_eq!(WorldBlockCoord::containing(DVec2::new(-16.2, 3.7)), WorldBlockCoord::new(-16, 4));
    }

    #[test]
    fn sector_neighbours() {
        let s = WorldSectorCoord::new(4, -1);
        assert_eq!(s.left(), WorldSectorCoord::new(3, -1));
        assert_eq!(s.right(), WorldSectorCoord::new(5, -1));
        assert_eq!(s.up(), WorldSectorCoord::new(4, 0));
        assert_eq!(s.down(), WorldSectorCoord::new(4, -2));
    }

    #[test]
    fn neighborhood_is_centre_first_and_complete() {
        let centre = WorldSectorCoord::new(-3, 7);
        let hood = centre.neighborhood(1);
        assert_eq!(hood.len(), 9);
        assert_eq!(hood[0], centre);
        for dy in -1..=1 {
            for dx in -1..=1 {
                assert!(hood.contains(&centre.offset(dx, dy)));
            }
        }
        assert_eq!(centre.neighborhood(2).len(), 25);
        assert_eq!(centre.neighborhood(0), vec![centre]);
    }

    #[test]
    fn sector_chunks_cover_sector() {
        let s = WorldSectorCoord::new(1, -1);
        let chunks: Vec<_> = s.chunks().collect();
        assert_eq!(chunks.len(), CHUNKS_PER_SECTOR);
        assert!(chunks.iter().all(|c| c.sector() == s));
    }

    fn world_i64() -> impl Strategy<Value = i64> {
        -(1i64 << 40)..(1i64 << 40)
    }

    proptest! {
        #[test]
        fn parse_inverts_combine(sx in world_i64(), sy in world_i64(), c in 0usize..256, b in 0usize..256) {
            let sector = WorldSectorCoord::new(sx, sy);
            let chunk = ChunkCoord::from_index(c);
            let block = BlockCoord::from_index(b);
            let world = WorldBlockCoord::combine(sector, chunk, block);
            prop_assert_eq!(world.parse(), (sector, chunk, block));
        }

        #[test]
        fn combine_inverts_parse(x in world_i64(), y in world_i64()) {
            let world = WorldBlockCoord::new(x, y);
            let (s, c, b) = world.parse();
            prop_assert_eq!(WorldBlockCoord::combine(s, c, b), world);
            let (chunk, block) = world.split();
            prop_assert_eq!(WorldBlockCoord::from_chunk(chunk, block), world);
        }

        #[test]
        fn chunk_parse_round_trips(x in world_i64(), y in world_i64()) {
            let chunk = WorldChunkCoord::new(x, y);
            let (s, c) = chunk.parse();
            prop_assert_eq!(WorldChunkCoord::combine(s, c), chunk);
        }
    }
}
