//! Events machines emit when their state machines make a transition.
//!
//! Events fire on transitions only, never every tick. The scheduler collects
//! them per step for observers (sync, sound, statistics).

use serde::{Deserialize, Serialize};

use crate::fluid::FluidStack;
use crate::id::{BlockTypeId, MachineId};
use crate::pos::BlockPos;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MachineEvent {
    /// A mining well acquired a new target.
    TargetAcquired { machine: MachineId, target: BlockPos, energy_needed: i64 },
    /// A mining well hit something it can never break (or its depth limit).
    Parked { machine: MachineId, target: Option<BlockPos> },
    /// A mining well broke a block.
    BlockBroken { machine: MachineId, pos: BlockPos, block: BlockTypeId },
    /// A mining well filled a gap in its column.
    ColumnRepaired { machine: MachineId, pos: BlockPos },
    /// A pump's hose reached the bottom of its shaft.
    HoseSettled { machine: MachineId, depth: i32 },
    /// A pump harvested a fluid source.
    SourceDrained { machine: MachineId, pos: BlockPos, stack: FluidStack },
    /// A pump started cleaning up a sourceless fluid remnant.
    CleanupArmed { machine: MachineId, anchor: BlockPos },
    /// Cleanup stopped: the remnant is gone or a source came back.
    CleanupDisarmed { machine: MachineId },
    /// A pump removed flowing fluid cells.
    Evaporated { machine: MachineId, cells: u32 },
    /// A refinery completed one conversion.
    Converted { machine: MachineId, consumed: i64, produced: FluidStack },
}

impl MachineEvent {
    pub fn machine(&self) -> MachineId {
        match self {
            MachineEvent::TargetAcquired { machine, .. }
            | MachineEvent::Parked { machine, .. }
            | MachineEvent::BlockBroken { machine, .. }
            | MachineEvent::ColumnRepaired { machine, .. }
            | MachineEvent::HoseSettled { machine, .. }
            | MachineEvent::SourceDrained { machine, .. }
            | MachineEvent::CleanupArmed { machine, .. }
            | MachineEvent::CleanupDisarmed { machine }
            | MachineEvent::Evaporated { machine, .. }
            | MachineEvent::Converted { machine, .. } => *machine,
        }
    }
}
