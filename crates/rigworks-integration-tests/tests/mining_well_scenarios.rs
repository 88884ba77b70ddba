//! Mining well scenarios: pulse accounting, column repair, parking and drop
//! routing, with and without an engine driving the well.

use proptest::prelude::*;
use rigworks_core::event::MachineEvent;
use rigworks_core::fixed::Fixed64;
use rigworks_core::id::{BlockTypeId, MachineId};
use rigworks_core::item::ItemStack;
use rigworks_core::pos::{BlockPos, Face};
use rigworks_core::pulse::PulseAcceptor;
use rigworks_core::registry::BlockDef;
use rigworks_core::test_utils::*;
use rigworks_core::world::{BlockState, GridWorld, World};
use rigworks_machines::engine::{Engine, EngineConfig};
use rigworks_machines::machine::Machine;
use rigworks_machines::mining_well::{MiningWell, MiningWellConfig};
use rigworks_machines::sim::Simulation;
use rigworks_machines::storage::ItemCrate;

const ORIGIN: BlockPos = BlockPos::new(0, 10, 0);

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn well_config() -> MiningWellConfig {
    MiningWellConfig {
        column_block: column_pipe(),
        ..MiningWellConfig::default()
    }
}

fn well(sim: &Simulation, id: MachineId) -> &MiningWell {
    sim.machine(id).and_then(Machine::as_mining_well).unwrap()
}

fn well_mut(sim: &mut Simulation, id: MachineId) -> &mut MiningWell {
    sim.machine_mut(id).and_then(Machine::as_mining_well_mut).unwrap()
}

fn feed(sim: &mut Simulation, id: MachineId, world: &mut GridWorld, pulses: u32) {
    for _ in 0..pulses {
        well_mut(sim, id).energy_mut().set_level(i64::MAX);
        assert!(well_mut(sim, id).accept_pulse(Face::Up));
        sim.step(world);
    }
}

// ===========================================================================
// Pulse accounting
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// With unlimited energy a block of cost N breaks on exactly the
    /// ceil(N / quantum)-th pulse.
    #[test]
    fn breaks_after_ceil_cost_over_quantum_pulses(
        tenths in 1i32..=50,
        base_cost in 1i64..=100,
        quantum in 1i64..=100,
    ) {
        let custom = BlockTypeId(42);
        let mut blocks = standard_registry();
        blocks.register(
            custom,
            BlockDef::new("custom", Fixed64::from_num(tenths) / Fixed64::from_num(10)),
        );
        let mut world = column_world(0, 9, custom);
        let mut sim = Simulation::new(blocks);
        let config = MiningWellConfig {
            base_cost,
            energy_per_pulse: quantum,
            energy_capacity: 1_000_000,
            energy_max_in: 1_000_000,
            ..well_config()
        };
        let id = sim.add_machine(ORIGIN, Machine::MiningWell(MiningWell::new(config))).unwrap();
        sim.step(&mut world);

        let needed = well(&sim, id).energy_needed();
        prop_assert!(needed >= 1);
        let pulses = (needed + quantum - 1) / quantum;
        let target = BlockPos::new(0, 9, 0);

        feed(&mut sim, id, &mut world, (pulses - 1) as u32);
        prop_assert_eq!(world.block(target), BlockState::Solid(custom));

        feed(&mut sim, id, &mut world, 1);
        prop_assert_eq!(world.block(target), BlockState::Solid(column_pipe()));
        prop_assert_eq!(well(&sim, id).current_target(), Some(BlockPos::new(0, 8, 0)));
    }
}

#[test]
fn progress_never_exceeds_cost() {
    let mut world = column_world(0, 9, stone());
    let mut sim = Simulation::new(standard_registry());
    let id = sim
        .add_machine(ORIGIN, Machine::MiningWell(MiningWell::new(well_config())))
        .unwrap();
    for _ in 0..20 {
        feed(&mut sim, id, &mut world, 1);
        let w = well(&sim, id);
        assert!(w.energy_progress() <= w.energy_needed());
    }
}

// ===========================================================================
// Column maintenance
// ===========================================================================

#[test]
fn replaced_column_cell_is_next_target_and_gets_dug_out() {
    init_tracing();
    let mut world = column_world(0, 9, dirt());
    let mut sim = Simulation::new(standard_registry());
    let id = sim
        .add_machine(ORIGIN, Machine::MiningWell(MiningWell::new(well_config())))
        .unwrap();

    // Dirt costs 32 energy: one pulse per block.
    feed(&mut sim, id, &mut world, 4);
    assert_eq!(well(&sim, id).current_target(), Some(BlockPos::new(0, 5, 0)));

    let replaced = BlockPos::new(0, 8, 0);
    world.set_block(replaced, BlockState::Solid(stone()));
    sim.step(&mut world);
    assert_eq!(well(&sim, id).current_target(), Some(replaced));
    assert_eq!(well(&sim, id).energy_needed(), 96);

    feed(&mut sim, id, &mut world, 3);
    assert_eq!(world.block(replaced), BlockState::Solid(column_pipe()));
    assert_eq!(well(&sim, id).current_target(), Some(BlockPos::new(0, 5, 0)));
}

#[test]
fn gap_repair_costs_one_pulse_and_keeps_deeper_progress_fresh() {
    let mut world = column_world(0, 9, dirt());
    let mut sim = Simulation::new(standard_registry());
    let id = sim
        .add_machine(ORIGIN, Machine::MiningWell(MiningWell::new(well_config())))
        .unwrap();
    feed(&mut sim, id, &mut world, 3);

    world.remove_block(BlockPos::new(0, 9, 0));
    world.set_block(BlockPos::new(0, 8, 0), BlockState::source(water()));
    feed(&mut sim, id, &mut world, 1);
    assert_eq!(world.block(BlockPos::new(0, 9, 0)), BlockState::Solid(column_pipe()));
    assert_eq!(well(&sim, id).current_target(), Some(BlockPos::new(0, 8, 0)));

    feed(&mut sim, id, &mut world, 1);
    assert_eq!(world.block(BlockPos::new(0, 8, 0)), BlockState::Solid(column_pipe()));
    assert_eq!(well(&sim, id).current_target(), Some(BlockPos::new(0, 6, 0)));
    assert_eq!(well(&sim, id).energy_progress(), 0);

    let repaired = sim
        .events()
        .iter()
        .filter(|e| matches!(e, MachineEvent::ColumnRepaired { .. }))
        .count();
    assert_eq!(repaired, 2);
}

// ===========================================================================
// Drops
// ===========================================================================

#[test]
fn drops_go_to_adjacent_crate_then_spill() {
    let mut world = column_world(0, 9, stone());
    let mut sim = Simulation::new(standard_registry());
    let id = sim
        .add_machine(ORIGIN, Machine::MiningWell(MiningWell::new(well_config())))
        .unwrap();
    let crate_id = sim
        .add_machine(ORIGIN.offset(Face::East), Machine::ItemCrate(ItemCrate::new(2)))
        .unwrap();

    // Three stone blocks, three pulses each.
    feed(&mut sim, id, &mut world, 9);

    let stored = sim
        .machine(crate_id)
        .and_then(Machine::as_item_crate)
        .unwrap()
        .quantity(cobblestone());
    assert_eq!(stored, 2);
    assert_eq!(world.spawned_items(), &[(ORIGIN.up(), ItemStack::new(cobblestone(), 1))]);
    assert!(sim.dirty().is_machine_dirty(crate_id));
}

#[test]
fn blocks_without_drops_leave_nothing() {
    let mut world = column_world(0, 9, glass());
    let mut sim = Simulation::new(standard_registry());
    let id = sim
        .add_machine(ORIGIN, Machine::MiningWell(MiningWell::new(well_config())))
        .unwrap();
    feed(&mut sim, id, &mut world, 1);
    assert_eq!(world.block(BlockPos::new(0, 9, 0)), BlockState::Solid(column_pipe()));
    assert!(world.spawned_items().is_empty());
}

// ===========================================================================
// Engine-driven
// ===========================================================================

#[test]
fn engine_driven_well_digs_to_bedrock_and_parks() {
    init_tracing();
    let mut world = column_world(0, 4, dirt());
    for y in 5..10 {
        world.set_block(BlockPos::new(0, y, 0), BlockState::Solid(column_pipe()));
    }
    let mut sim = Simulation::new(standard_registry());
    sim.add_machine(
        ORIGIN.up(),
        Machine::Engine(Engine::new(EngineConfig {
            facing: Face::Down,
            ..EngineConfig::default()
        })),
    )
    .unwrap();
    let id = sim
        .add_machine(ORIGIN, Machine::MiningWell(MiningWell::new(well_config())))
        .unwrap();

    sim.run(&mut world, 200);

    for y in 1..10 {
        assert_eq!(world.block(BlockPos::new(0, y, 0)), BlockState::Solid(column_pipe()));
    }
    let w = well(&sim, id);
    assert!(w.is_parked());
    assert_eq!(w.current_target(), Some(BlockPos::new(0, 0, 0)));
    assert_eq!(world.block(BlockPos::new(0, 0, 0)), BlockState::Solid(bedrock()));

    let broken = sim
        .events()
        .iter()
        .filter(|e| matches!(e, MachineEvent::BlockBroken { .. }))
        .count();
    assert_eq!(broken, 4);
    assert_eq!(world.spawned_items().len(), 4);
    assert!(
        sim.events()
            .iter()
            .any(|e| matches!(e, MachineEvent::Parked { .. }))
    );
}

#[test]
fn parked_well_banks_pulses_without_spending_energy() {
    let mut world = column_world(0, 0, dirt());
    for y in 1..10 {
        world.set_block(BlockPos::new(0, y, 0), BlockState::Solid(column_pipe()));
    }
    let mut sim = Simulation::new(standard_registry());
    let id = sim
        .add_machine(ORIGIN, Machine::MiningWell(MiningWell::new(well_config())))
        .unwrap();
    well_mut(&mut sim, id).energy_mut().set_level(500);
    for _ in 0..3 {
        well_mut(&mut sim, id).accept_pulse(Face::Up);
    }
    sim.run(&mut world, 5);
    assert!(well(&sim, id).is_parked());
    assert_eq!(well(&sim, id).queued_pulses(), 3);
    assert_eq!(well(&sim, id).energy().level(), 500);

    // Clearing the obstruction lets the banked pulses work.
    world.set_block(BlockPos::new(0, 0, 0), BlockState::Solid(dirt()));
    sim.step(&mut world);
    assert_eq!(world.block(BlockPos::new(0, 0, 0)), BlockState::Solid(column_pipe()));
    assert_eq!(well(&sim, id).queued_pulses(), 2);

    // The column now reaches the world floor: nothing left to dig.
    assert!(well(&sim, id).is_parked());
    assert_eq!(well(&sim, id).current_target(), None);
}
