use crate::block::BlockType;
use glam::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;

/// Physical and visual properties of one block type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockTypeDescriptor {
    pub tag: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub texture: String,
    pub density: f32,
    pub friction: f32,
    pub restitution: f32,
    /// Static blocks never become part of a dynamic body.
    #[serde(default)]
    pub fixed: bool,
    /// Convex collision polygon in block space, centred on the origin.
    pub polygon: Vec<Vec2>,
}

impl BlockTypeDescriptor {
    /// Unit square descriptor with the given physical properties.
    pub fn square(tag: &str, density: f32, friction: f32, restitution: f32) -> Self {
        Self {
            tag: tag.to_string(),
            name: tag.to_string(),
            texture: format!("{tag}.png"),
            density,
            friction,
            restitution,
            fixed: false,
            polygon: unit_square(),
        }
    }
}

pub fn unit_square() -> Vec<Vec2> {
    vec![
        Vec2::new(-0.5, -0.5),
        Vec2::new(0.5, -0.5),
        Vec2::new(0.5, 0.5),
        Vec2::new(-0.5, 0.5),
    ]
}

/// Errors from building a block type dictionary.
#[derive(Debug, thiserror::Error)]
pub enum DictionaryError {
    #[error("block type '{0}' registered twice")]
    DuplicateTag(String),
    #[error("the empty tag is reserved for void")]
    VoidTag,
    #[error("block type '{tag}' has a degenerate polygon ({vertices} vertices)")]
    DegeneratePolygon { tag: String, vertices: usize },
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// On-disk catalog of block types, in layer order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockCatalog {
    pub block_types: Vec<BlockTypeDescriptor>,
}

/// Read-only lookup from block tag to descriptor.
///
/// The texture layer of a type is its registration index.
#[derive(Debug, Clone, Default)]
pub struct BlockTypeDictionary {
    descriptors: Vec<BlockTypeDescriptor>,
    by_tag: HashMap<String, usize>,
}

impl BlockTypeDictionary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in catalog: stone, test1, test2.
    pub fn default_catalog() -> Self {
        let mut dict = Self::new();
        for desc in [
            BlockTypeDescriptor::square("stone", 0.5, 0.2, 1.0),
            BlockTypeDescriptor::square("test1", 0.0, 0.2, 1.0),
            BlockTypeDescriptor::square("test2", 0.0, 0.2, 1.0),
        ] {
            dict.push(desc);
        }
        dict
    }

    pub fn from_catalog(catalog: BlockCatalog) -> Result<Self, DictionaryError> {
        let mut dict = Self::new();
        for desc in catalog.block_types {
            dict.register(desc)?;
        }
        Ok(dict)
    }

    pub fn from_json_str(json: &str) -> Result<Self, DictionaryError> {
        Self::from_catalog(serde_json::from_str(json)?)
    }

    pub fn from_json_reader(reader: impl Read) -> Result<Self, DictionaryError> {
        Self::from_catalog(serde_json::from_reader(reader)?)
    }

    pub fn to_catalog(&self) -> BlockCatalog {
        BlockCatalog {
            block_types: self.descriptors.clone(),
        }
    }

    /// Add a descriptor, returning its layer.
    pub fn register(&mut self, desc: BlockTypeDescriptor) -> Result<u32, DictionaryError> {
        if desc.tag.is_empty() {
            return Err(DictionaryError::VoidTag);
        }
        if self.by_tag.contains_key(&desc.tag) {
            return Err(DictionaryError::DuplicateTag(desc.tag));
        }
        if desc.polygon.len() < 3 {
            return Err(DictionaryError::DegeneratePolygon {
                vertices: desc.polygon.len(),
                tag: desc.tag,
            });
        }
        Ok(self.push(desc))
    }

    fn push(&mut self, desc: BlockTypeDescriptor) -> u32 {
        let layer = self.descriptors.len();
        tracing::debug!(tag = %desc.tag, layer, "registered block type");
        self.by_tag.insert(desc.tag.clone(), layer);
        self.descriptors.push(desc);
        layer as u32
    }

    pub fn get(&self, kind: &BlockType) -> Option<&BlockTypeDescriptor> {
        self.by_tag.get(kind.as_str()).map(|&i| &self.descriptors[i])
    }

    pub fn layer(&self, kind: &BlockType) -> Option<u32> {
        self.by_tag.get(kind.as_str()).map(|&i| i as u32)
    }

    pub fn contains(&self, kind: &BlockType) -> bool {
        self.by_tag.contains_key(kind.as_str())
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlockTypeDescriptor> + '_ {
        self.descriptors.iter()
    }
}
