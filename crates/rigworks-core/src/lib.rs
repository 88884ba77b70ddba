//! Rigworks Core -- shared building blocks for tick-driven machines in a
//! voxel world.
//!
//! Every machine in `rigworks-machines` is assembled from the pieces here:
//!
//! - [`buffer::ResourceBuffer`] -- capacity-bounded energy/fluid store with
//!   clamped transfers and change tracking.
//! - [`fluid::FluidTank`] -- a single-fluid tank on top of a buffer.
//! - [`pulse`] -- the pulse and power delivery contract between engines
//!   and the machines they drive.
//! - [`capability`] -- typed capabilities (energy, fluid, items, pulse,
//!   mechanical) and the registry that resolves them per neighbor.
//! - [`world::World`] -- the synchronous world surface machines query and
//!   mutate, plus [`world::GridWorld`] for headless use.
//! - [`persist`] -- named-field save records with default-on-missing reads.
//! - [`serialize`] -- versioned binary snapshots via bitcode.
//!
//! # Tick model
//!
//! The simulation is single-threaded. Each step visits every machine once;
//! a machine may call into its neighbors' capabilities inline during its own
//! turn, but never back into itself.

pub mod buffer;
pub mod capability;
pub mod dirty;
pub mod event;
pub mod fixed;
pub mod fluid;
pub mod id;
pub mod item;
pub mod persist;
pub mod pos;
pub mod pulse;
pub mod registry;
pub mod serialize;
pub mod world;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
