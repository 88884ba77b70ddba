//! What a machine sees during its own tick.

use std::collections::BTreeMap;

use rigworks_core::capability::{Capability, CapabilityKind, CapabilityRegistry};
use rigworks_core::event::MachineEvent;
use rigworks_core::fixed::Ticks;
use rigworks_core::id::MachineId;
use rigworks_core::pos::{BlockPos, Face};
use rigworks_core::registry::BlockRegistry;
use rigworks_core::world::World;
use slotmap::SlotMap;

use crate::machine::{Machine, MachineKind};
use crate::sim::Placed;

/// Resolves neighbor capabilities against the machines placed in the
/// simulation. The machine currently being ticked is absent from the slot
/// map, so a lookup can never resolve back to the caller.
pub struct Neighbors<'a> {
    machines: &'a mut SlotMap<MachineId, Placed>,
    positions: &'a BTreeMap<BlockPos, MachineId>,
    capabilities: &'a CapabilityRegistry<MachineKind, Machine>,
}

impl<'a> Neighbors<'a> {
    pub(crate) fn new(
        machines: &'a mut SlotMap<MachineId, Placed>,
        positions: &'a BTreeMap<BlockPos, MachineId>,
        capabilities: &'a CapabilityRegistry<MachineKind, Machine>,
    ) -> Self {
        Self {
            machines,
            positions,
            capabilities,
        }
    }

    /// The `kind` capability exposed by the cell across `face` from `pos`,
    /// asked on the face pointing back at `pos`.
    pub fn lookup(&mut self, kind: CapabilityKind, pos: BlockPos, face: Face) -> Option<Capability<'_>> {
        let id = *self.positions.get(&pos.offset(face))?;
        let machine = self.machines.get_mut(id)?.machine.as_mut()?;
        self.capabilities
            .resolve(machine.kind(), kind, machine, face.opposite())
    }
}

/// Per-tick handle passed to [`Machine::tick`].
pub struct TickContext<'a> {
    pub machine: MachineId,
    pub pos: BlockPos,
    pub tick: Ticks,
    pub world: &'a mut dyn World,
    pub blocks: &'a BlockRegistry,
    pub neighbors: Neighbors<'a>,
    pub events: &'a mut Vec<MachineEvent>,
}

impl TickContext<'_> {
    /// Capability of the neighbor across `face` from this machine.
    pub fn lookup(&mut self, kind: CapabilityKind, face: Face) -> Option<Capability<'_>> {
        self.neighbors.lookup(kind, self.pos, face)
    }

    pub fn emit(&mut self, event: MachineEvent) {
        self.events.push(event);
    }
}
