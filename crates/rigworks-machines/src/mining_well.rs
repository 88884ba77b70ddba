//! Mining well: digs straight down, keeping a column of pipe behind it.
//!
//! Every tick the well re-derives its target from the world (the first cell
//! below it that is not column pipe), so outside edits to the column are
//! picked up immediately. Progress needs both a pulse and energy: each pulse
//! spends up to `energy_per_pulse` from the buffer toward the target's
//! break cost. A gap in the column is repaired before anything deeper is
//! dug.

use rigworks_core::buffer::ResourceBuffer;
use rigworks_core::capability::{Capability, CapabilityKind};
use rigworks_core::event::MachineEvent;
use rigworks_core::fixed::Fixed64;
use rigworks_core::id::BlockTypeId;
use rigworks_core::item::ItemStack;
use rigworks_core::persist::{Persist, Record};
use rigworks_core::pos::{BlockPos, Face};
use rigworks_core::pulse::{EnergySink, PulseAcceptor, PulseQueue};
use rigworks_core::registry::BlockRegistry;
use rigworks_core::world::{BlockState, World};
use serde::{Deserialize, Serialize};

use crate::context::TickContext;

/// Break-overlay stages run `0..=LAST_STAGE`; the last one is only reached
/// on completion.
const LAST_STAGE: i64 = 9;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiningWellConfig {
    /// Block placed behind the drill head.
    pub column_block: BlockTypeId,
    /// How far below the well the scan may reach.
    pub max_depth: i32,
    /// Energy per unit of hardness.
    pub base_cost: i64,
    /// Energy spent per consumed pulse.
    pub energy_per_pulse: i64,
    pub energy_capacity: i64,
    pub energy_max_in: i64,
    pub max_pulses: u32,
}

impl Default for MiningWellConfig {
    fn default() -> Self {
        Self {
            column_block: BlockTypeId(0),
            max_depth: 256,
            base_cost: 64,
            energy_per_pulse: 32,
            energy_capacity: 1000,
            energy_max_in: 100,
            max_pulses: 64,
        }
    }
}

/// How the well will treat the cell it is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TargetClass {
    /// Empty or fluid: fill with column pipe.
    Gap,
    Breakable { energy_needed: i64 },
    Unbreakable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MiningWell {
    config: MiningWellConfig,
    energy: ResourceBuffer,
    pulses: PulseQueue,
    current_target: Option<BlockPos>,
    energy_needed: i64,
    energy_progress: i64,
    parked: bool,
    output_cursor: usize,
    #[serde(skip)]
    changed: bool,
}

impl MiningWell {
    pub fn new(config: MiningWellConfig) -> Self {
        Self {
            energy: ResourceBuffer::new(config.energy_capacity, config.energy_max_in, config.energy_per_pulse),
            pulses: PulseQueue::new(config.max_pulses),
            config,
            current_target: None,
            energy_needed: 0,
            energy_progress: 0,
            parked: false,
            output_cursor: 0,
            changed: false,
        }
    }

    pub fn config(&self) -> &MiningWellConfig {
        &self.config
    }

    pub fn current_target(&self) -> Option<BlockPos> {
        self.current_target
    }

    pub fn energy_needed(&self) -> i64 {
        self.energy_needed
    }

    pub fn energy_progress(&self) -> i64 {
        self.energy_progress
    }

    pub fn is_parked(&self) -> bool {
        self.parked
    }

    pub fn energy(&self) -> &ResourceBuffer {
        &self.energy
    }

    pub fn energy_mut(&mut self) -> &mut ResourceBuffer {
        &mut self.energy
    }

    pub fn queued_pulses(&self) -> u32 {
        self.pulses.len()
    }

    /// Current overlay stage, or `None` when nothing is being broken.
    pub fn break_stage(&self) -> Option<u8> {
        if self.parked || self.energy_needed <= 0 || self.energy_progress == 0 {
            return None;
        }
        let stage = (self.energy_progress * LAST_STAGE / self.energy_needed).min(LAST_STAGE);
        u8::try_from(stage).ok()
    }

    /// `max(1, round(base_cost * max(0.5, hardness)))`.
    pub fn energy_for_hardness(&self, hardness: Fixed64) -> i64 {
        let factor = hardness.max(Fixed64::from_num(0.5));
        Fixed64::saturating_from_num(self.config.base_cost)
            .saturating_mul(factor)
            .saturating_round()
            .to_num::<i64>()
            .max(1)
    }

    pub fn classify(&self, state: BlockState, blocks: &BlockRegistry) -> TargetClass {
        match state {
            BlockState::Air | BlockState::Fluid { .. } => TargetClass::Gap,
            BlockState::Solid(id) => match blocks.get(id) {
                Some(def) if def.is_breakable() => TargetClass::Breakable {
                    energy_needed: self.energy_for_hardness(def.hardness),
                },
                _ => TargetClass::Unbreakable,
            },
        }
    }

    /// First cell below `origin` that is not column pipe, or `None` when the
    /// column already reaches the depth limit or the world floor.
    pub fn scan_target(&self, origin: BlockPos, world: &dyn World) -> Option<BlockPos> {
        let floor = (origin.y - self.config.max_depth.max(0)).max(world.min_y());
        let column = BlockState::Solid(self.config.column_block);
        (floor..origin.y)
            .rev()
            .map(|y| BlockPos::new(origin.x, y, origin.z))
            .find(|p| world.block(*p) != column)
    }

    pub fn tick(&mut self, ctx: &mut TickContext<'_>) {
        self.retarget(ctx);

        if self.pulses.is_empty() || self.parked {
            return;
        }
        let Some(target) = self.current_target else {
            return;
        };

        self.pulses.pop();
        self.changed = true;
        let spent = self.energy.extract(self.config.energy_per_pulse, false);
        if spent == 0 {
            tracing::trace!(machine = ?ctx.machine, "mining well starved");
            return;
        }

        if self.classify(ctx.world.block(target), ctx.blocks) == TargetClass::Gap {
            ctx.world
                .set_block(target, BlockState::Solid(self.config.column_block));
            tracing::debug!(machine = ?ctx.machine, ?target, "column repaired");
            ctx.emit(MachineEvent::ColumnRepaired {
                machine: ctx.machine,
                pos: target,
            });
            self.retarget(ctx);
            return;
        }

        self.energy_progress = (self.energy_progress + spent).min(self.energy_needed);
        if self.energy_progress < self.energy_needed {
            ctx.world.set_break_progress(target, self.break_stage());
            return;
        }

        self.break_target(target, ctx);
        self.retarget(ctx);
    }

    /// Re-derive the target; reset progress when it moved or its cost changed.
    fn retarget(&mut self, ctx: &mut TickContext<'_>) {
        let expected = self.scan_target(ctx.pos, &*ctx.world);
        let class = expected.map(|p| self.classify(ctx.world.block(p), ctx.blocks));
        let (needed, parked) = match class {
            Some(TargetClass::Gap) => (0, false),
            Some(TargetClass::Breakable { energy_needed }) => (energy_needed, false),
            Some(TargetClass::Unbreakable) | None => (0, true),
        };

        if expected == self.current_target && needed == self.energy_needed && parked == self.parked {
            return;
        }

        if let Some(old) = self.current_target {
            ctx.world.set_break_progress(old, None);
        }
        self.current_target = expected;
        self.energy_needed = needed;
        self.energy_progress = 0;
        self.parked = parked;
        self.changed = true;

        if parked {
            tracing::debug!(machine = ?ctx.machine, target = ?expected, "mining well parked");
            ctx.emit(MachineEvent::Parked {
                machine: ctx.machine,
                target: expected,
            });
        } else if let Some(target) = expected {
            tracing::debug!(machine = ?ctx.machine, ?target, needed, "mining well retargeted");
            ctx.emit(MachineEvent::TargetAcquired {
                machine: ctx.machine,
                target,
                energy_needed: needed,
            });
        }
    }

    fn break_target(&mut self, target: BlockPos, ctx: &mut TickContext<'_>) {
        let Some(block) = ctx.world.block(target).block_type() else {
            return;
        };
        let drops = ctx.blocks.drops(block);

        ctx.world.set_break_progress(target, None);
        ctx.world.remove_block(target);
        for stack in drops {
            self.distribute(stack, ctx);
        }
        ctx.world
            .set_block(target, BlockState::Solid(self.config.column_block));
        self.energy_progress = 0;

        tracing::debug!(machine = ?ctx.machine, ?target, ?block, "block broken");
        ctx.emit(MachineEvent::BlockBroken {
            machine: ctx.machine,
            pos: target,
            block,
        });
    }

    /// Offer `stack` to item neighbors starting at the rotating cursor; what
    /// nobody takes is dropped above the well.
    fn distribute(&mut self, mut stack: ItemStack, ctx: &mut TickContext<'_>) {
        for i in 0..Face::ALL.len() {
            if stack.is_empty() {
                break;
            }
            let face = Face::from_index(self.output_cursor + i);
            if let Some(sink) = ctx
                .lookup(CapabilityKind::Items, face)
                .and_then(Capability::into_items)
            {
                stack.quantity -= sink.insert(face.opposite(), stack, false).min(stack.quantity);
            }
        }
        self.output_cursor = (self.output_cursor + 1) % Face::ALL.len();

        if !stack.is_empty() {
            ctx.world.spawn_item(ctx.pos.up(), stack);
        }
    }

    pub fn take_changed(&mut self) -> bool {
        let own = std::mem::take(&mut self.changed);
        own | self.energy.take_changed()
    }
}

impl EnergySink for MiningWell {
    fn accept_power(&mut self, _from: Face, amount: i64) -> i64 {
        self.energy.receive(amount, false)
    }
}

impl PulseAcceptor for MiningWell {
    fn accept_pulse(&mut self, _from: Face) -> bool {
        let banked = self.pulses.push();
        self.changed |= banked;
        banked
    }
}

impl Persist for MiningWell {
    fn save(&self) -> Record {
        let mut record = Record::new();
        record.put_record("energy", self.energy.save());
        record.put_record("pulses", self.pulses.save());
        record.put_pos("target", self.current_target);
        record.put_i64("energy_needed", self.energy_needed);
        record.put_i64("energy_progress", self.energy_progress);
        record.put_bool("parked", self.parked);
        record.put_i64("output_cursor", self.output_cursor as i64);
        record
    }

    fn load(&mut self, record: &Record) {
        self.energy.load(&record.get_record("energy"));
        self.pulses.load(&record.get_record("pulses"));
        self.current_target = record.get_pos("target");
        self.energy_needed = record.get_i64("energy_needed", 0).max(0);
        self.energy_progress = record
            .get_i64("energy_progress", 0)
            .clamp(0, self.energy_needed);
        self.parked = record.get_bool("parked", false);
        self.output_cursor = usize::try_from(record.get_i64("output_cursor", 0)).unwrap_or(0) % Face::ALL.len();
        self.changed = false;
    }
}
