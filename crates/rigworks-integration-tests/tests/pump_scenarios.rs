//! Pump scenarios: hose deployment, source harvesting, remnant cleanup and
//! push-out to neighbors.

use rigworks_core::event::MachineEvent;
use rigworks_core::fixed::Fixed64;
use rigworks_core::fluid::{BUCKET, FluidFilter, FluidStack, FluidTank};
use rigworks_core::id::MachineId;
use rigworks_core::pos::{BlockPos, Face};
use rigworks_core::pulse::PulseAcceptor;
use rigworks_core::test_utils::*;
use rigworks_core::world::{BlockState, GridWorld, World};
use rigworks_machines::engine::{Engine, EngineConfig};
use rigworks_machines::machine::Machine;
use rigworks_machines::pump::{Pump, PumpConfig};
use rigworks_machines::sim::Simulation;
use rigworks_machines::storage::FluidStore;

const PUMP_AT: BlockPos = BlockPos::new(0, 10, 0);

fn pump(sim: &Simulation, id: MachineId) -> &Pump {
    sim.machine(id).and_then(Machine::as_pump).unwrap()
}

fn pump_mut(sim: &mut Simulation, id: MachineId) -> &mut Pump {
    sim.machine_mut(id).and_then(Machine::as_pump_mut).unwrap()
}

/// A stone slab at `floor_y` under an `r`-radius square of `fluid` cells at
/// `floor_y + 1`.
fn pool(world: &mut GridWorld, floor_y: i32, r: i32, state: BlockState) {
    world.fill(
        BlockPos::new(-r - 1, floor_y, -r - 1),
        BlockPos::new(r + 1, floor_y, r + 1),
        BlockState::Solid(stone()),
    );
    world.fill(
        BlockPos::new(-r, floor_y + 1, -r),
        BlockPos::new(r, floor_y + 1, r),
        state,
    );
}

fn place_pump(sim: &mut Simulation, pulses: u32) -> MachineId {
    let id = sim
        .add_machine(PUMP_AT, Machine::Pump(Pump::new(PumpConfig::default())))
        .unwrap();
    for _ in 0..pulses {
        assert!(pump_mut(sim, id).accept_pulse(Face::Up));
    }
    id
}

/// Run until the first `SourceDrained` event, bounded by `limit` ticks.
fn run_until_drained(sim: &mut Simulation, world: &mut GridWorld, limit: u32) -> bool {
    for _ in 0..limit {
        sim.step(world);
        if sim
            .take_events()
            .iter()
            .any(|e| matches!(e, MachineEvent::SourceDrained { .. }))
        {
            return true;
        }
    }
    false
}

#[test]
fn five_pulses_settle_five_blocks_down() {
    let mut world = GridWorld::new(0);
    world.set_block(PUMP_AT.below(6), BlockState::Solid(stone()));
    let mut sim = Simulation::new(standard_registry());
    let id = place_pump(&mut sim, 5);

    sim.run(&mut world, 5 * 40 + 5);
    let p = pump(&sim, id);
    assert_eq!(p.max_depth(), 5);
    assert!(p.is_settled());
    assert_eq!(p.reported_depth(), Fixed64::from_num(5));
    assert_eq!(p.deployed_depth(), Fixed64::from_num(5));
}

#[test]
fn depth_is_reported_exactly_while_moving() {
    let mut world = GridWorld::new(0);
    world.set_block(PUMP_AT.below(6), BlockState::Solid(stone()));
    let mut sim = Simulation::new(standard_registry());
    let id = place_pump(&mut sim, 5);

    sim.run(&mut world, 50);
    let p = pump(&sim, id);
    assert!(!p.is_settled());
    assert!(p.reported_depth() > Fixed64::ONE && p.reported_depth() < Fixed64::from_num(2));
}

#[test]
fn hose_never_passes_the_obstruction() {
    let mut world = GridWorld::new(0);
    world.set_block(PUMP_AT.below(3), BlockState::Solid(stone()));
    let mut sim = Simulation::new(standard_registry());
    let id = place_pump(&mut sim, 10);

    for _ in 0..400 {
        sim.step(&mut world);
        let p = pump(&sim, id);
        assert!(p.deployed_depth() <= Fixed64::from_num(p.max_depth()));
    }
    // Unspent extension stays banked.
    assert_eq!(pump(&sim, id).pending_extend(), Fixed64::from_num(8));

    world.remove_block(PUMP_AT.below(3));
    world.set_block(PUMP_AT.below(5), BlockState::Solid(stone()));
    sim.run(&mut world, 100);
    assert_eq!(pump(&sim, id).reported_depth(), Fixed64::from_num(4));
}

#[test]
fn one_drain_removes_one_source_and_adds_one_bucket() {
    let mut world = GridWorld::new(0);
    pool(&mut world, 3, 2, BlockState::source(water()));
    let mut sim = Simulation::new(standard_registry());
    let id = place_pump(&mut sim, 6);

    let (cells_before, sources_before) = world.count_fluid(water());
    assert!(run_until_drained(&mut sim, &mut world, 400));
    assert_eq!(world.count_fluid(water()), (cells_before - 1, sources_before - 1));
    assert_eq!(pump(&sim, id).tank().contents(), Some(FluidStack::new(water(), BUCKET)));
}

#[test]
fn drained_pool_evaporates_within_bounded_ticks() {
    let mut world = GridWorld::new(0);
    pool(&mut world, 3, 3, BlockState::flowing(water()));
    world.set_block(BlockPos::new(0, 4, 0), BlockState::source(water()));
    let mut sim = Simulation::new(standard_registry());
    let id = place_pump(&mut sim, 6);

    assert!(run_until_drained(&mut sim, &mut world, 400));
    assert!(pump(&sim, id).cleanup().is_some());

    // 48 flowing cells, four per step, a step every eleven ticks.
    sim.run(&mut world, 12 * 11 + 11);
    assert_eq!(world.count_fluid(water()), (0, 0));
    assert!(pump(&sim, id).cleanup().is_none());
}

#[test]
fn evaporation_removes_farthest_cells_first() {
    let mut world = GridWorld::new(0);
    pool(&mut world, 3, 3, BlockState::flowing(water()));
    world.set_block(BlockPos::new(0, 4, 0), BlockState::source(water()));
    let mut sim = Simulation::new(standard_registry());
    place_pump(&mut sim, 6);
    assert!(run_until_drained(&mut sim, &mut world, 400));

    sim.run(&mut world, 11);
    for (x, z) in [(3, 3), (3, -3), (-3, 3), (-3, -3)] {
        assert_eq!(world.block(BlockPos::new(x, 4, z)), BlockState::Air);
    }
    assert_eq!(world.count_fluid(water()), (44, 0));
}

#[test]
fn evaporation_finishes_every_piece_it_cuts_off() {
    let mut world = GridWorld::new(0);
    pool(&mut world, 3, 3, BlockState::flowing(water()));
    world.set_block(BlockPos::new(0, 4, 0), BlockState::source(water()));
    let mut sim = Simulation::new(standard_registry());
    let id = place_pump(&mut sim, 6);
    assert!(run_until_drained(&mut sim, &mut world, 400));

    // With the centre drained, the innermost ring falls apart into single
    // cells once its diagonal neighbors are gone.
    let mut most_anchors = 0;
    for _ in 0..5000 {
        sim.step(&mut world);
        if let Some(cleanup) = pump(&sim, id).cleanup() {
            most_anchors = most_anchors.max(cleanup.anchors.len());
        }
    }
    assert!(most_anchors > 1);
    assert_eq!(world.count_fluid(water()), (0, 0));
    assert!(pump(&sim, id).cleanup().is_none());

    let evaporated: u32 = sim
        .events()
        .iter()
        .filter_map(|e| match e {
            MachineEvent::Evaporated { cells, .. } => Some(*cells),
            _ => None,
        })
        .sum();
    assert_eq!(evaporated, 48);
}

#[test]
fn draining_a_line_cleans_up_both_halves() {
    let mut world = GridWorld::new(0);
    world.fill(
        BlockPos::new(-3, 3, -1),
        BlockPos::new(3, 3, 1),
        BlockState::Solid(stone()),
    );
    world.fill(
        BlockPos::new(-2, 4, 0),
        BlockPos::new(2, 4, 0),
        BlockState::flowing(water()),
    );
    world.set_block(BlockPos::new(1, 4, 0), BlockState::source(water()));
    let mut sim = Simulation::new(standard_registry());
    let id = place_pump(&mut sim, 6);

    assert!(run_until_drained(&mut sim, &mut world, 400));
    assert_eq!(world.count_fluid(water()), (4, 0));

    sim.run(&mut world, 5000);
    assert_eq!(world.count_fluid(water()), (0, 0));
    assert_eq!(world.block(BlockPos::new(2, 4, 0)), BlockState::Air);
    assert!(pump(&sim, id).cleanup().is_none());
}

#[test]
fn push_out_never_loses_fluid() {
    let mut world = GridWorld::new(0);
    pool(&mut world, 3, 1, BlockState::source(oil()));
    let mut sim = Simulation::new(standard_registry());
    let id = place_pump(&mut sim, 6);
    let small = sim
        .add_machine(
            PUMP_AT.offset(Face::East),
            Machine::FluidStore(FluidStore::new(FluidTank::new(700, FluidFilter::Any))),
        )
        .unwrap();
    let picky = sim
        .add_machine(
            PUMP_AT.offset(Face::North),
            Machine::FluidStore(FluidStore::new(FluidTank::new(
                10 * BUCKET,
                FluidFilter::Only(vec![water()]),
            ))),
        )
        .unwrap();
    let big = sim
        .add_machine(
            PUMP_AT.offset(Face::Up),
            Machine::FluidStore(FluidStore::new(FluidTank::new(3 * BUCKET, FluidFilter::Any))),
        )
        .unwrap();

    let stored = |sim: &Simulation, id: MachineId| {
        sim.machine(id)
            .and_then(Machine::as_fluid_store)
            .unwrap()
            .tank()
            .amount()
    };

    for _ in 0..600 {
        sim.step(&mut world);
        let (_, sources) = world.count_fluid(oil());
        let harvested = (9 - sources as i64) * BUCKET;
        let held = pump(&sim, id).tank().amount() + stored(&sim, small) + stored(&sim, big);
        assert_eq!(held, harvested);
        assert_eq!(stored(&sim, picky), 0);
    }
    assert_eq!(world.count_fluid(oil()), (0, 0));
    assert_eq!(stored(&sim, small), 700);
    assert_eq!(stored(&sim, big), 3 * BUCKET);
    assert_eq!(pump(&sim, id).tank().amount(), 9 * BUCKET - 700 - 3 * BUCKET);
}

#[test]
fn engine_driven_pump_reaches_a_deep_pool() {
    let mut world = GridWorld::new(0);
    pool(&mut world, 0, 1, BlockState::source(water()));
    let mut sim = Simulation::new(standard_registry());
    sim.add_machine(
        PUMP_AT.up(),
        Machine::Engine(Engine::new(EngineConfig {
            facing: Face::Down,
            stroke_interval: 10,
            ..EngineConfig::default()
        })),
    )
    .unwrap();
    let id = sim
        .add_machine(PUMP_AT, Machine::Pump(Pump::new(PumpConfig::default())))
        .unwrap();

    // Nine blocks of hose at 40 ticks each, plus time to drain.
    sim.run(&mut world, 9 * 40 + 40);
    assert_eq!(pump(&sim, id).max_depth(), 9);
    assert!(pump(&sim, id).is_settled());
    assert!(pump(&sim, id).tank().amount() >= BUCKET);
    assert!(world.count_fluid(water()).1 < 9);
}
