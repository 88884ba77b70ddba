use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    /// Identifies a machine entity placed in the simulation.
    pub struct MachineId;
}

/// Identifies a block type in the [`BlockRegistry`](crate::registry::BlockRegistry).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockTypeId(pub u32);

/// Identifies a fluid type. Cheap to copy and compare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FluidId(pub u32);

/// Identifies an item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemTypeId(pub u32);
