//! The world surface machines read and mutate during their tick.
//!
//! The simulation never owns the voxel world. Every step receives a
//! `&mut dyn World` handle and all block queries and edits go through it.
//! [`GridWorld`] is a sparse in-memory implementation used by tests and
//! headless runs.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::{BlockTypeId, FluidId};
use crate::item::ItemStack;
use crate::pos::BlockPos;

/// What occupies a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BlockState {
    #[default]
    Air,
    Solid(BlockTypeId),
    Fluid { fluid: FluidId, source: bool },
}

impl BlockState {
    pub fn source(fluid: FluidId) -> Self {
        BlockState::Fluid { fluid, source: true }
    }

    pub fn flowing(fluid: FluidId) -> Self {
        BlockState::Fluid { fluid, source: false }
    }

    pub fn is_air(&self) -> bool {
        matches!(self, BlockState::Air)
    }

    pub fn is_solid(&self) -> bool {
        matches!(self, BlockState::Solid(_))
    }

    pub fn fluid(&self) -> Option<FluidId> {
        match self {
            BlockState::Fluid { fluid, .. } => Some(*fluid),
            _ => None,
        }
    }

    pub fn is_source(&self) -> bool {
        matches!(self, BlockState::Fluid { source: true, .. })
    }

    pub fn block_type(&self) -> Option<BlockTypeId> {
        match self {
            BlockState::Solid(id) => Some(*id),
            _ => None,
        }
    }
}

/// Synchronous, tick-scoped access to the voxel world.
pub trait World {
    fn block(&self, pos: BlockPos) -> BlockState;

    fn set_block(&mut self, pos: BlockPos, state: BlockState);

    /// Drop an item stack into the world at `pos`.
    fn spawn_item(&mut self, pos: BlockPos, stack: ItemStack);

    /// Show (`Some(0..=9)`) or clear (`None`) a break-progress overlay.
    fn set_break_progress(&mut self, pos: BlockPos, stage: Option<u8>);

    /// Lowest valid y coordinate.
    fn min_y(&self) -> i32;

    fn remove_block(&mut self, pos: BlockPos) {
        self.set_block(pos, BlockState::Air);
    }
}

/// Sparse world: anything not stored is air.
#[derive(Debug, Clone, Default)]
pub struct GridWorld {
    blocks: BTreeMap<BlockPos, BlockState>,
    min_y: i32,
    spawned: Vec<(BlockPos, ItemStack)>,
    break_progress: BTreeMap<BlockPos, u8>,
}

impl GridWorld {
    pub fn new(min_y: i32) -> Self {
        Self {
            min_y,
            ..Self::default()
        }
    }

    /// Fill every cell of the inclusive box `a..=b` with `state`.
    pub fn fill(&mut self, a: BlockPos, b: BlockPos, state: BlockState) {
        for x in a.x.min(b.x)..=a.x.max(b.x) {
            for y in a.y.min(b.y)..=a.y.max(b.y) {
                for z in a.z.min(b.z)..=a.z.max(b.z) {
                    self.set_block(BlockPos::new(x, y, z), state);
                }
            }
        }
    }

    /// Items dropped into the world so far.
    pub fn spawned_items(&self) -> &[(BlockPos, ItemStack)] {
        &self.spawned
    }

    pub fn break_progress(&self, pos: BlockPos) -> Option<u8> {
        self.break_progress.get(&pos).copied()
    }

    /// Number of cells holding `fluid`, and how many of those are sources.
    pub fn count_fluid(&self, fluid: FluidId) -> (usize, usize) {
        self.blocks
            .values()
            .filter(|s| s.fluid() == Some(fluid))
            .fold((0, 0), |(all, sources), s| {
                (all + 1, sources + usize::from(s.is_source()))
            })
    }
}

impl World for GridWorld {
    fn block(&self, pos: BlockPos) -> BlockState {
        self.blocks.get(&pos).copied().unwrap_or_default()
    }

    fn set_block(&mut self, pos: BlockPos, state: BlockState) {
        if state.is_air() {
            self.blocks.remove(&pos);
        } else {
            self.blocks.insert(pos, state);
        }
    }

    fn spawn_item(&mut self, pos: BlockPos, stack: ItemStack) {
        self.spawned.push((pos, stack));
    }

    fn set_break_progress(&mut self, pos: BlockPos, stage: Option<u8>) {
        match stage {
            Some(s) => self.break_progress.insert(pos, s),
            None => self.break_progress.remove(&pos),
        };
    }

    fn min_y(&self) -> i32 {
        self.min_y
    }
}
