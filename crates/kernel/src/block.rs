use glam::Vec2;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::sync::Arc;

/// Tag naming a block type. The empty tag is void (no block).
///
/// Tags are shared `Arc<str>` so cloning a block never allocates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockType(Option<Arc<str>>);

impl BlockType {
    pub const VOID: Self = Self(None);

    pub fn new(tag: &str) -> Self {
        if tag.is_empty() {
            Self::VOID
        } else {
            Self(Some(Arc::from(tag)))
        }
    }

    pub fn is_void(&self) -> bool {
        self.0.is_none()
    }

    pub fn as_str(&self) -> &str {
        self.0.as_deref().unwrap_or("")
    }
}

impl From<&str> for BlockType {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

impl From<String> for BlockType {
    fn from(tag: String) -> Self {
        Self::new(&tag)
    }
}

impl fmt::Display for BlockType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_void() {
            f.write_str("<void>")
        } else {
            f.write_str(self.as_str())
        }
    }
}

impl Serialize for BlockType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for BlockType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let tag = String::deserialize(deserializer)?;
        Ok(Self::new(&tag))
    }
}

/// Quarter-turn rotation of a block, counter-clockwise.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Orientation {
    pub const ALL: [Orientation; 4] = [Self::Deg0, Self::Deg90, Self::Deg180, Self::Deg270];

    pub fn quarter_turns(self) -> u8 {
        self as u8
    }

    /// Wraps modulo four.
    pub fn from_quarter_turns(turns: u8) -> Self {
        Self::ALL[(turns % 4) as usize]
    }

    pub fn turned(self, turns: u8) -> Self {
        Self::from_quarter_turns(self.quarter_turns() + turns % 4)
    }

    /// Rotate a point about the origin.
    pub fn rotate(self, v: Vec2) -> Vec2 {
        match self {
            Self::Deg0 => v,
            Self::Deg90 => Vec2::new(-v.y, v.x),
            Self::Deg180 => -v,
            Self::Deg270 => Vec2::new(v.y, -v.x),
        }
    }
}

/// A single cell of the world. Blocks are replaced, never mutated in place.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Block {
    pub kind: BlockType,
    pub orientation: Orientation,
}

impl Block {
    pub const VOID: Self = Self {
        kind: BlockType::VOID,
        orientation: Orientation::Deg0,
    };

    pub fn new(kind: impl Into<BlockType>) -> Self {
        Self {
            kind: kind.into(),
            orientation: Orientation::Deg0,
        }
    }

    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.orientation = orientation;
        self
    }

    pub fn is_void(&self) -> bool {
        self.kind.is_void()
    }
}
