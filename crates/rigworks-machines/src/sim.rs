//! The tick scheduler.
//!
//! Machines live in a slot map in placement order and are stepped in that
//! order, one at a time. While a machine ticks it is taken out of its slot,
//! so the only way it can touch a neighbor is through [`Neighbors`], and a
//! neighbor can never call back into it.

use std::collections::BTreeMap;

use rigworks_core::capability::CapabilityRegistry;
use rigworks_core::dirty::DirtyTracker;
use rigworks_core::event::MachineEvent;
use rigworks_core::fixed::Ticks;
use rigworks_core::id::MachineId;
use rigworks_core::persist::{Persist, Record};
use rigworks_core::pos::BlockPos;
use rigworks_core::registry::BlockRegistry;
use rigworks_core::serialize::{self, DeserializeError, SerializeError};
use rigworks_core::world::World;
use serde::{Deserialize, Serialize};
use slotmap::SlotMap;

use crate::context::{Neighbors, TickContext};
use crate::machine::{Machine, MachineKind, default_capabilities};

/// A machine and the cell it occupies. `machine` is `None` only while the
/// machine is being ticked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Placed {
    pub pos: BlockPos,
    pub machine: Option<Machine>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("cell {0:?} is already occupied by {1:?}")]
    Occupied(BlockPos, MachineId),
}

#[derive(Serialize, Deserialize)]
struct SimState {
    machines: SlotMap<MachineId, Placed>,
    tick: Ticks,
}

pub struct Simulation {
    machines: SlotMap<MachineId, Placed>,
    positions: BTreeMap<BlockPos, MachineId>,
    capabilities: CapabilityRegistry<MachineKind, Machine>,
    blocks: BlockRegistry,
    dirty: DirtyTracker,
    events: Vec<MachineEvent>,
    tick: Ticks,
}

impl Simulation {
    pub fn new(blocks: BlockRegistry) -> Self {
        Self::with_capabilities(blocks, default_capabilities())
    }

    pub fn with_capabilities(
        blocks: BlockRegistry,
        capabilities: CapabilityRegistry<MachineKind, Machine>,
    ) -> Self {
        Self {
            machines: SlotMap::with_key(),
            positions: BTreeMap::new(),
            capabilities,
            blocks,
            dirty: DirtyTracker::new(),
            events: Vec::new(),
            tick: 0,
        }
    }

    // -----------------------------------------------------------------------
    // Placement
    // -----------------------------------------------------------------------

    pub fn add_machine(&mut self, pos: BlockPos, machine: Machine) -> Result<MachineId, PlacementError> {
        if let Some(&existing) = self.positions.get(&pos) {
            return Err(PlacementError::Occupied(pos, existing));
        }
        let kind = machine.kind();
        let id = self.machines.insert(Placed {
            pos,
            machine: Some(machine),
        });
        self.positions.insert(pos, id);
        self.dirty.mark_layout();
        tracing::debug!(machine = ?id, ?kind, ?pos, "machine placed");
        Ok(id)
    }

    /// Remove a machine, discarding its state. Returns it if it existed.
    pub fn remove_machine(&mut self, id: MachineId) -> Option<Machine> {
        let placed = self.machines.remove(id)?;
        self.positions.remove(&placed.pos);
        self.dirty.forget(id);
        self.dirty.mark_layout();
        tracing::debug!(machine = ?id, pos = ?placed.pos, "machine removed");
        placed.machine
    }

    pub fn machine(&self, id: MachineId) -> Option<&Machine> {
        self.machines.get(id)?.machine.as_ref()
    }

    pub fn machine_mut(&mut self, id: MachineId) -> Option<&mut Machine> {
        self.machines.get_mut(id)?.machine.as_mut()
    }

    pub fn machine_at(&self, pos: BlockPos) -> Option<MachineId> {
        self.positions.get(&pos).copied()
    }

    pub fn position(&self, id: MachineId) -> Option<BlockPos> {
        self.machines.get(id).map(|p| p.pos)
    }

    pub fn machine_ids(&self) -> impl Iterator<Item = MachineId> + '_ {
        self.machines.keys()
    }

    pub fn len(&self) -> usize {
        self.machines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.machines.is_empty()
    }

    pub fn blocks(&self) -> &BlockRegistry {
        &self.blocks
    }

    // -----------------------------------------------------------------------
    // Stepping
    // -----------------------------------------------------------------------

    /// Advance every machine by one tick, in placement order.
    pub fn step(&mut self, world: &mut dyn World) {
        self.tick += 1;
        let ids: Vec<MachineId> = self.machines.keys().collect();

        for id in ids {
            let Some(placed) = self.machines.get_mut(id) else {
                continue;
            };
            let pos = placed.pos;
            let Some(mut machine) = placed.machine.take() else {
                continue;
            };

            let mut ctx = TickContext {
                machine: id,
                pos,
                tick: self.tick,
                world: &mut *world,
                blocks: &self.blocks,
                neighbors: Neighbors::new(&mut self.machines, &self.positions, &self.capabilities),
                events: &mut self.events,
            };
            machine.tick(&mut ctx);

            if let Some(placed) = self.machines.get_mut(id) {
                placed.machine = Some(machine);
            }
        }

        // Neighbors can change each other's buffers, so collect flags only
        // after everyone has ticked.
        for (id, placed) in &mut self.machines {
            if placed.machine.as_mut().is_some_and(Machine::take_changed) {
                self.dirty.mark_machine(id);
            }
        }
    }

    pub fn run(&mut self, world: &mut dyn World, ticks: u64) {
        for _ in 0..ticks {
            self.step(world);
        }
    }

    pub fn tick(&self) -> Ticks {
        self.tick
    }

    /// Events emitted since the last [`take_events`](Self::take_events).
    pub fn events(&self) -> &[MachineEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<MachineEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn dirty(&self) -> &DirtyTracker {
        &self.dirty
    }

    pub fn dirty_mut(&mut self) -> &mut DirtyTracker {
        &mut self.dirty
    }

    // -----------------------------------------------------------------------
    // Persistence
    // -----------------------------------------------------------------------

    pub fn save_machine(&self, id: MachineId) -> Option<Record> {
        self.machine(id).map(Persist::save)
    }

    /// Load `record` into an existing machine. Returns false if `id` is
    /// unknown.
    pub fn load_machine(&mut self, id: MachineId, record: &Record) -> bool {
        let Some(machine) = self.machine_mut(id) else {
            return false;
        };
        machine.load(record);
        self.dirty.mark_machine(id);
        true
    }

    /// Binary snapshot of every machine and the tick counter.
    pub fn snapshot(&self) -> Result<Vec<u8>, SerializeError> {
        #[derive(Serialize)]
        struct SimStateRef<'a> {
            machines: &'a SlotMap<MachineId, Placed>,
            tick: Ticks,
        }
        serialize::encode(
            self.tick,
            &SimStateRef {
                machines: &self.machines,
                tick: self.tick,
            },
        )
    }

    /// Rebuild a simulation from [`snapshot`](Self::snapshot) output.
    /// Machine ids are preserved.
    pub fn restore(data: &[u8], blocks: BlockRegistry) -> Result<Self, DeserializeError> {
        let (_, state): (_, SimState) = serialize::decode(data)?;
        let mut sim = Self::new(blocks);
        sim.positions = state.machines.iter().map(|(id, p)| (p.pos, id)).collect();
        sim.machines = state.machines;
        sim.tick = state.tick;
        sim.dirty.mark_layout();
        Ok(sim)
    }
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("machines", &self.machines.len())
            .field("tick", &self.tick)
            .field("capabilities", &self.capabilities)
            .finish()
    }
}
