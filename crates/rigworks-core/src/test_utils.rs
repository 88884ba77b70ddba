//! Shared fixtures for unit and integration tests.
//!
//! Gated behind `#[cfg(any(test, feature = "test-utils"))]`.

use crate::fixed::Fixed64;
use crate::id::*;
use crate::pos::BlockPos;
use crate::registry::{BlockDef, BlockRegistry};
use crate::world::{BlockState, GridWorld, World};

pub fn fixed(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

// ===========================================================================
// Block types
// ===========================================================================

pub fn stone() -> BlockTypeId {
    BlockTypeId(1)
}
pub fn dirt() -> BlockTypeId {
    BlockTypeId(2)
}
pub fn iron_ore_block() -> BlockTypeId {
    BlockTypeId(3)
}
pub fn bedrock() -> BlockTypeId {
    BlockTypeId(4)
}
pub fn column_pipe() -> BlockTypeId {
    BlockTypeId(5)
}
pub fn glass() -> BlockTypeId {
    BlockTypeId(6)
}

// ===========================================================================
// Items and fluids
// ===========================================================================

pub fn cobblestone() -> ItemTypeId {
    ItemTypeId(1)
}
pub fn dirt_item() -> ItemTypeId {
    ItemTypeId(2)
}
pub fn iron_ore() -> ItemTypeId {
    ItemTypeId(3)
}

pub fn water() -> FluidId {
    FluidId(0)
}
pub fn oil() -> FluidId {
    FluidId(1)
}
pub fn fuel() -> FluidId {
    FluidId(2)
}
pub fn heavy_oil() -> FluidId {
    FluidId(3)
}

/// Stone (1.5), dirt (0.5), iron ore (3.0), bedrock, the mining column
/// pipe and glass (0.3, no drops).
pub fn standard_registry() -> BlockRegistry {
    let mut reg = BlockRegistry::new();
    reg.register(stone(), BlockDef::new("stone", fixed(1.5)).with_drop(cobblestone(), 1));
    reg.register(dirt(), BlockDef::new("dirt", fixed(0.5)).with_drop(dirt_item(), 1));
    reg.register(
        iron_ore_block(),
        BlockDef::new("iron_ore", fixed(3.0)).with_drop(iron_ore(), 1),
    );
    reg.register(bedrock(), BlockDef::unbreakable("bedrock"));
    reg.register(column_pipe(), BlockDef::new("column_pipe", fixed(1.0)));
    reg.register(glass(), BlockDef::new("glass", fixed(0.3)));
    reg
}

/// A world with a bedrock floor at `floor_y` and `block` filling the
/// column `x = z = 0` from `floor_y + 1` up to `top_y` inclusive.
pub fn column_world(floor_y: i32, top_y: i32, block: BlockTypeId) -> GridWorld {
    let mut world = GridWorld::new(floor_y);
    world.set_block(BlockPos::new(0, floor_y, 0), BlockState::Solid(bedrock()));
    for y in floor_y + 1..=top_y {
        world.set_block(BlockPos::new(0, y, 0), BlockState::Solid(block));
    }
    world
}
