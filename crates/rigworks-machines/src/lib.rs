//! Rigworks Machines -- the machines themselves and the scheduler that
//! steps them.
//!
//! - [`mining_well::MiningWell`] digs a shaft straight down, one pulse and
//!   one energy quantum at a time, and keeps a column of pipe behind it.
//! - [`pump::Pump`] lowers a hose, harvests fluid sources and cleans up
//!   the sourceless remnant.
//! - [`refinery::Refinery`] converts oil into fuel, one quantum per tick.
//! - [`engine::Engine`] generates energy, pulses and rotation.
//! - [`storage`] holds passive tanks and crates.
//!
//! [`sim::Simulation`] owns every placed machine and steps them in placement
//! order against a [`World`](rigworks_core::world::World). Machines talk to
//! neighbors only through capabilities resolved by [`context::Neighbors`].
//!
//! # Example
//!
//! ```
//! use rigworks_core::fixed::Fixed64;
//! use rigworks_core::pos::{BlockPos, Face};
//! use rigworks_core::registry::BlockRegistry;
//! use rigworks_core::world::GridWorld;
//! use rigworks_machines::engine::{Engine, EngineConfig};
//! use rigworks_machines::machine::Machine;
//! use rigworks_machines::pump::{Pump, PumpConfig};
//! use rigworks_machines::sim::Simulation;
//!
//! let mut world = GridWorld::new(0);
//! let mut sim = Simulation::new(BlockRegistry::new());
//! let engine = EngineConfig { facing: Face::Down, ..EngineConfig::default() };
//! sim.add_machine(BlockPos::new(0, 11, 0), Machine::Engine(Engine::new(engine))).unwrap();
//! let pump = sim.add_machine(BlockPos::new(0, 10, 0), Machine::Pump(Pump::new(PumpConfig::default()))).unwrap();
//!
//! sim.run(&mut world, 100);
//! let hose = sim.machine(pump).and_then(Machine::as_pump).unwrap().deployed_depth();
//! assert!(hose > Fixed64::ZERO);
//! ```

pub mod config;
pub mod context;
pub mod engine;
pub mod machine;
pub mod mining_well;
pub mod pump;
pub mod refinery;
pub mod sim;
pub mod storage;
