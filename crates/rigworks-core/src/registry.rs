//! Block definitions looked up by the machines while they work the world.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;
use crate::id::{BlockTypeId, ItemTypeId};
use crate::item::ItemStack;

/// Static properties of one block type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlockDef {
    pub name: String,
    /// Break difficulty. Zero or negative means the block cannot be broken.
    pub hardness: Fixed64,
    /// Never breakable regardless of hardness (bedrock and friends).
    #[serde(default)]
    pub unbreakable: bool,
    /// Items produced when the block is broken.
    #[serde(default)]
    pub drops: Vec<ItemStack>,
}

impl BlockDef {
    pub fn new(name: &str, hardness: Fixed64) -> Self {
        Self {
            name: name.to_owned(),
            hardness,
            unbreakable: false,
            drops: Vec::new(),
        }
    }

    pub fn unbreakable(name: &str) -> Self {
        Self {
            unbreakable: true,
            ..Self::new(name, Fixed64::ZERO)
        }
    }

    pub fn with_drop(mut self, item: ItemTypeId, quantity: u32) -> Self {
        self.drops.push(ItemStack::new(item, quantity));
        self
    }

    pub fn is_breakable(&self) -> bool {
        !self.unbreakable && self.hardness > Fixed64::ZERO
    }
}

/// Registry of block types, built once at startup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlockRegistry {
    defs: BTreeMap<BlockTypeId, BlockDef>,
}

impl BlockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition, replacing any earlier one with the same id.
    pub fn register(&mut self, id: BlockTypeId, def: BlockDef) {
        self.defs.insert(id, def);
    }

    pub fn get(&self, id: BlockTypeId) -> Option<&BlockDef> {
        self.defs.get(&id)
    }

    /// Unknown blocks are treated as unbreakable.
    pub fn is_breakable(&self, id: BlockTypeId) -> bool {
        self.get(id).is_some_and(BlockDef::is_breakable)
    }

    pub fn drops(&self, id: BlockTypeId) -> Vec<ItemStack> {
        self.get(id).map(|d| d.drops.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.defs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.defs.is_empty()
    }
}
