//! Typed capabilities a cell can expose to its neighbors.
//!
//! A machine never calls a neighbor's concrete type. It asks the resolver for
//! a [`Capability`] of a given [`CapabilityKind`] on a given face, and the
//! resolver consults a [`CapabilityRegistry`] mapping
//! `(machine kind, capability kind)` to a provider function. Lookups are
//! made fresh on every call; nothing is cached across ticks.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::fixed::Fixed64;
use crate::fluid::{FluidStack, FluidTank};
use crate::item::{InventorySlot, ItemStack};
use crate::pos::Face;
use crate::pulse::{EnergySink, PulseAcceptor};

// ---------------------------------------------------------------------------
// Capability traits
// ---------------------------------------------------------------------------

/// Fluid fill/drain on a face.
pub trait FluidHandler {
    /// Returns how much of `stack` was (or would be) accepted.
    fn fill(&mut self, from: Face, stack: FluidStack, simulate: bool) -> i64;

    fn drain(&mut self, from: Face, max: i64, simulate: bool) -> Option<FluidStack>;
}

/// Accepts item stacks.
pub trait ItemSink {
    /// Returns how many items of `stack` were (or would be) taken.
    fn insert(&mut self, from: Face, stack: ItemStack, simulate: bool) -> u32;
}

/// Read-only view of a rotating mechanical source.
pub trait MechanicalSource {
    fn rpm(&self) -> u32;

    /// Stroke phase in `[0, 1)`.
    fn phase(&self) -> Fixed64;
}

impl FluidHandler for FluidTank {
    fn fill(&mut self, _from: Face, stack: FluidStack, simulate: bool) -> i64 {
        FluidTank::fill(self, stack, simulate)
    }

    fn drain(&mut self, _from: Face, max: i64, simulate: bool) -> Option<FluidStack> {
        FluidTank::drain(self, max, simulate)
    }
}

impl ItemSink for InventorySlot {
    fn insert(&mut self, _from: Face, stack: ItemStack, simulate: bool) -> u32 {
        if simulate {
            return stack.quantity.min(self.space());
        }
        self.accept(stack.item_type, stack.quantity)
    }
}

// ---------------------------------------------------------------------------
// Capability variant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CapabilityKind {
    Energy,
    Fluid,
    Items,
    Pulse,
    Mechanical,
}

/// A borrowed handle to whatever a neighbor exposes.
pub enum Capability<'a> {
    Energy(&'a mut dyn EnergySink),
    Fluid(&'a mut dyn FluidHandler),
    Items(&'a mut dyn ItemSink),
    Pulse(&'a mut dyn PulseAcceptor),
    Mechanical(&'a dyn MechanicalSource),
}

impl<'a> Capability<'a> {
    pub fn kind(&self) -> CapabilityKind {
        match self {
            Capability::Energy(_) => CapabilityKind::Energy,
            Capability::Fluid(_) => CapabilityKind::Fluid,
            Capability::Items(_) => CapabilityKind::Items,
            Capability::Pulse(_) => CapabilityKind::Pulse,
            Capability::Mechanical(_) => CapabilityKind::Mechanical,
        }
    }

    pub fn into_energy(self) -> Option<&'a mut dyn EnergySink> {
        match self {
            Capability::Energy(e) => Some(e),
            _ => None,
        }
    }

    pub fn into_fluid(self) -> Option<&'a mut dyn FluidHandler> {
        match self {
            Capability::Fluid(f) => Some(f),
            _ => None,
        }
    }

    pub fn into_items(self) -> Option<&'a mut dyn ItemSink> {
        match self {
            Capability::Items(i) => Some(i),
            _ => None,
        }
    }

    pub fn into_pulse(self) -> Option<&'a mut dyn PulseAcceptor> {
        match self {
            Capability::Pulse(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_mechanical(self) -> Option<&'a dyn MechanicalSource> {
        match self {
            Capability::Mechanical(m) => Some(m),
            _ => None,
        }
    }
}

impl fmt::Debug for Capability<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Capability::{:?}", self.kind())
    }
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

/// Produces a capability from a machine, given the face it is asked on.
pub type CapabilityProvider<M> = for<'a> fn(&'a mut M, Face) -> Option<Capability<'a>>;

/// Maps `(machine kind, capability kind)` to a provider.
pub struct CapabilityRegistry<K, M> {
    providers: BTreeMap<(K, CapabilityKind), CapabilityProvider<M>>,
}

impl<K: Ord + Copy, M> CapabilityRegistry<K, M> {
    pub fn new() -> Self {
        Self {
            providers: BTreeMap::new(),
        }
    }

    /// Register `provider`, replacing any earlier one for the same pair.
    pub fn register(&mut self, kind: K, capability: CapabilityKind, provider: CapabilityProvider<M>) {
        self.providers.insert((kind, capability), provider);
    }

    pub fn supports(&self, kind: K, capability: CapabilityKind) -> bool {
        self.providers.contains_key(&(kind, capability))
    }

    /// Ask `target` (of machine kind `kind`) for `capability` on `face`.
    pub fn resolve<'a>(
        &self,
        kind: K,
        capability: CapabilityKind,
        target: &'a mut M,
        face: Face,
    ) -> Option<Capability<'a>> {
        let provider = self.providers.get(&(kind, capability))?;
        provider(target, face)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

impl<K: Ord + Copy, M> Default for CapabilityRegistry<K, M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: fmt::Debug, M> fmt::Debug for CapabilityRegistry<K, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.providers.keys()).finish()
    }
}
