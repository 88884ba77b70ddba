//! The closed set of placeable machines and their capability providers.

use rigworks_core::capability::{Capability, CapabilityKind, CapabilityRegistry};
use rigworks_core::persist::{Persist, Record};
use rigworks_core::pos::Face;
use serde::{Deserialize, Serialize};

use crate::context::TickContext;
use crate::engine::Engine;
use crate::mining_well::MiningWell;
use crate::pump::Pump;
use crate::refinery::Refinery;
use crate::storage::{FluidStore, ItemCrate};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum MachineKind {
    MiningWell,
    Pump,
    Refinery,
    Engine,
    FluidStore,
    ItemCrate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Machine {
    MiningWell(MiningWell),
    Pump(Pump),
    Refinery(Refinery),
    Engine(Engine),
    FluidStore(FluidStore),
    ItemCrate(ItemCrate),
}

macro_rules! accessors {
    ($($variant:ident: $ty:ty => $get:ident, $get_mut:ident;)*) => {
        impl Machine {
            $(
                pub fn $get(&self) -> Option<&$ty> {
                    match self {
                        Machine::$variant(m) => Some(m),
                        _ => None,
                    }
                }

                pub fn $get_mut(&mut self) -> Option<&mut $ty> {
                    match self {
                        Machine::$variant(m) => Some(m),
                        _ => None,
                    }
                }
            )*
        }
    };
}

accessors! {
    MiningWell: MiningWell => as_mining_well, as_mining_well_mut;
    Pump: Pump => as_pump, as_pump_mut;
    Refinery: Refinery => as_refinery, as_refinery_mut;
    Engine: Engine => as_engine, as_engine_mut;
    FluidStore: FluidStore => as_fluid_store, as_fluid_store_mut;
    ItemCrate: ItemCrate => as_item_crate, as_item_crate_mut;
}

impl Machine {
    pub fn kind(&self) -> MachineKind {
        match self {
            Machine::MiningWell(_) => MachineKind::MiningWell,
            Machine::Pump(_) => MachineKind::Pump,
            Machine::Refinery(_) => MachineKind::Refinery,
            Machine::Engine(_) => MachineKind::Engine,
            Machine::FluidStore(_) => MachineKind::FluidStore,
            Machine::ItemCrate(_) => MachineKind::ItemCrate,
        }
    }

    /// Advance one tick. Storage machines are passive.
    pub fn tick(&mut self, ctx: &mut TickContext<'_>) {
        match self {
            Machine::MiningWell(m) => m.tick(ctx),
            Machine::Pump(m) => m.tick(ctx),
            Machine::Refinery(m) => m.tick(ctx),
            Machine::Engine(m) => m.tick(ctx),
            Machine::FluidStore(_) | Machine::ItemCrate(_) => {}
        }
    }

    /// Whether observable state changed since the last call; clears the flag.
    pub fn take_changed(&mut self) -> bool {
        match self {
            Machine::MiningWell(m) => m.take_changed(),
            Machine::Pump(m) => m.take_changed(),
            Machine::Refinery(m) => m.take_changed(),
            Machine::Engine(m) => m.take_changed(),
            Machine::FluidStore(m) => m.take_changed(),
            Machine::ItemCrate(m) => m.take_changed(),
        }
    }

    fn persist(&self) -> &dyn Persist {
        match self {
            Machine::MiningWell(m) => m,
            Machine::Pump(m) => m,
            Machine::Refinery(m) => m,
            Machine::Engine(m) => m,
            Machine::FluidStore(m) => m,
            Machine::ItemCrate(m) => m,
        }
    }

    fn persist_mut(&mut self) -> &mut dyn Persist {
        match self {
            Machine::MiningWell(m) => m,
            Machine::Pump(m) => m,
            Machine::Refinery(m) => m,
            Machine::Engine(m) => m,
            Machine::FluidStore(m) => m,
            Machine::ItemCrate(m) => m,
        }
    }
}

impl Persist for Machine {
    fn save(&self) -> Record {
        self.persist().save()
    }

    fn load(&mut self, record: &Record) {
        self.persist_mut().load(record);
    }
}

// ---------------------------------------------------------------------------
// Capability providers
// ---------------------------------------------------------------------------

fn energy(machine: &mut Machine, _face: Face) -> Option<Capability<'_>> {
    match machine {
        Machine::MiningWell(m) => Some(Capability::Energy(m)),
        _ => None,
    }
}

fn pulse(machine: &mut Machine, _face: Face) -> Option<Capability<'_>> {
    match machine {
        Machine::MiningWell(m) => Some(Capability::Pulse(m)),
        Machine::Pump(m) => Some(Capability::Pulse(m)),
        Machine::Refinery(m) => Some(Capability::Pulse(m)),
        _ => None,
    }
}

fn fluid(machine: &mut Machine, _face: Face) -> Option<Capability<'_>> {
    match machine {
        Machine::Pump(m) => Some(Capability::Fluid(m)),
        Machine::Refinery(m) => Some(Capability::Fluid(m)),
        Machine::FluidStore(m) => Some(Capability::Fluid(m)),
        _ => None,
    }
}

fn items(machine: &mut Machine, _face: Face) -> Option<Capability<'_>> {
    match machine {
        Machine::ItemCrate(m) => Some(Capability::Items(m)),
        _ => None,
    }
}

fn mechanical(machine: &mut Machine, _face: Face) -> Option<Capability<'_>> {
    match machine {
        Machine::Engine(m) => Some(Capability::Mechanical(m)),
        _ => None,
    }
}

/// Which machine exposes what. Every machine accepts on all six faces.
pub fn default_capabilities() -> CapabilityRegistry<MachineKind, Machine> {
    let mut reg = CapabilityRegistry::new();
    reg.register(MachineKind::MiningWell, CapabilityKind::Energy, energy);
    reg.register(MachineKind::MiningWell, CapabilityKind::Pulse, pulse);
    reg.register(MachineKind::Pump, CapabilityKind::Pulse, pulse);
    reg.register(MachineKind::Pump, CapabilityKind::Fluid, fluid);
    reg.register(MachineKind::Refinery, CapabilityKind::Pulse, pulse);
    reg.register(MachineKind::Refinery, CapabilityKind::Fluid, fluid);
    reg.register(MachineKind::Engine, CapabilityKind::Mechanical, mechanical);
    reg.register(MachineKind::FluidStore, CapabilityKind::Fluid, fluid);
    reg.register(MachineKind::ItemCrate, CapabilityKind::Items, items);
    reg
}
