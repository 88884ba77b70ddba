//! Pump: lowers a hose to the bottom of its shaft, harvests fluid sources
//! into an internal tank and pushes the tank out to its neighbors.
//!
//! Hose deployment and fluid handling are independent. Pulses bank pending
//! extension which the hose spends at a fixed fraction of a block per tick;
//! the depth limit is recomputed from the world every tick. Only a settled
//! hose drains. Fluid left without a source is cleaned up a few cells at a
//! time, farthest from the pump first.

mod blob;

use std::collections::BTreeSet;

pub use blob::FluidBlob;

use rigworks_core::capability::{Capability, CapabilityKind, FluidHandler};
use rigworks_core::event::MachineEvent;
use rigworks_core::fixed::{Fixed64, is_near_whole};
use rigworks_core::fluid::{BUCKET, FluidFilter, FluidStack, FluidTank};
use rigworks_core::id::FluidId;
use rigworks_core::persist::{Persist, Record};
use rigworks_core::pos::{BlockPos, Face};
use rigworks_core::pulse::PulseAcceptor;
use rigworks_core::world::{BlockState, World};
use serde::{Deserialize, Serialize};

use crate::context::TickContext;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PumpConfig {
    /// Longest hose, in blocks.
    pub max_range: i32,
    /// Ticks to lower the hose by one block.
    pub ticks_per_block: u32,
    /// Tolerance for "whole block" and "fully extended".
    pub settle_epsilon: f64,
    pub tank_capacity: i64,
    /// Fluid taken per harvested source.
    pub drain_amount: i64,
    /// Node budget for one blob scan.
    pub max_blob_nodes: usize,
    /// Total pushed to neighbors per tick.
    pub output_per_tick: i64,
    /// Ticks between evaporation steps.
    pub evaporate_cooldown: u32,
    /// Flowing cells removed per evaporation step.
    pub evaporate_batch: usize,
    /// Most pending extension, in whole blocks.
    pub max_pulses: u32,
}

impl Default for PumpConfig {
    fn default() -> Self {
        Self {
            max_range: 64,
            ticks_per_block: 40,
            settle_epsilon: 0.001,
            tank_capacity: 16 * BUCKET,
            drain_amount: BUCKET,
            max_blob_nodes: 4096,
            output_per_tick: BUCKET,
            evaporate_cooldown: 10,
            evaporate_batch: 4,
            max_pulses: 64,
        }
    }
}

/// Armed evaporation of sourceless remnants.
///
/// Every anchor is a cell of some remnant. Evaporation can cut a remnant
/// apart; each resulting piece keeps at least one anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cleanup {
    pub anchors: Vec<BlockPos>,
    pub cooldown: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pump {
    config: PumpConfig,
    tank: FluidTank,
    pending_extend: Fixed64,
    deployed_depth: Fixed64,
    max_depth: i32,
    settled: bool,
    target_source: Option<BlockPos>,
    cleanup: Option<Cleanup>,
    output_cursor: usize,
    #[serde(skip)]
    changed: bool,
}

impl Pump {
    pub fn new(config: PumpConfig) -> Self {
        Self {
            tank: FluidTank::new(config.tank_capacity, FluidFilter::Any),
            config,
            pending_extend: Fixed64::ZERO,
            deployed_depth: Fixed64::ZERO,
            max_depth: 0,
            settled: false,
            target_source: None,
            cleanup: None,
            output_cursor: 0,
            changed: false,
        }
    }

    pub fn config(&self) -> &PumpConfig {
        &self.config
    }

    pub fn tank(&self) -> &FluidTank {
        &self.tank
    }

    pub fn tank_mut(&mut self) -> &mut FluidTank {
        &mut self.tank
    }

    /// Exact internal hose depth.
    pub fn deployed_depth(&self) -> Fixed64 {
        self.deployed_depth
    }

    pub fn pending_extend(&self) -> Fixed64 {
        self.pending_extend
    }

    /// Depth limit seen on the last tick.
    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    pub fn target_source(&self) -> Option<BlockPos> {
        self.target_source
    }

    pub fn cleanup(&self) -> Option<&Cleanup> {
        self.cleanup.as_ref()
    }

    /// Depth as shown to observers: snapped to the whole block when within
    /// epsilon of one, otherwise exact.
    pub fn reported_depth(&self) -> Fixed64 {
        if is_near_whole(self.deployed_depth, self.epsilon()) {
            self.deployed_depth.round()
        } else {
            self.deployed_depth
        }
    }

    /// Fully extended to the current obstruction and on a block boundary.
    pub fn is_settled(&self) -> bool {
        let eps = self.epsilon();
        (self.deployed_depth - Fixed64::from_num(self.max_depth)).abs() <= eps
            && is_near_whole(self.deployed_depth, eps)
    }

    fn epsilon(&self) -> Fixed64 {
        Fixed64::saturating_from_num(self.config.settle_epsilon.max(0.0))
    }

    /// Number of non-solid cells below `origin` before the first solid one,
    /// bounded by the hose range and the world floor.
    pub fn obstruction_depth(&self, origin: BlockPos, world: &dyn World) -> i32 {
        let floor = world.min_y();
        (1..=self.config.max_range.max(0))
            .take_while(|d| {
                let pos = origin.below(*d);
                pos.y >= floor && !world.block(pos).is_solid()
            })
            .count() as i32
    }

    pub fn tick(&mut self, ctx: &mut TickContext<'_>) {
        self.advance_hose(ctx);
        if self.settled {
            self.drain_step(ctx);
        }
        self.cleanup_step(ctx);
        self.push_output(ctx);
    }

    fn advance_hose(&mut self, ctx: &mut TickContext<'_>) {
        let max_depth = self.obstruction_depth(ctx.pos, &*ctx.world);
        if max_depth != self.max_depth {
            self.max_depth = max_depth;
            self.changed = true;
        }

        let limit = Fixed64::from_num(max_depth);
        if self.deployed_depth > limit {
            self.deployed_depth = limit;
            self.changed = true;
        }

        let rate = Fixed64::ONE / Fixed64::from_num(self.config.ticks_per_block.max(1));
        let step = rate
            .min(self.pending_extend)
            .min(limit - self.deployed_depth);
        if step > Fixed64::ZERO {
            self.deployed_depth += step;
            self.pending_extend -= step;
            self.changed = true;
        }

        let settled = self.is_settled();
        if settled != self.settled {
            self.settled = settled;
            self.changed = true;
            if settled {
                let depth = self.reported_depth().to_num::<i32>();
                tracing::debug!(machine = ?ctx.machine, depth, "hose settled");
                ctx.emit(MachineEvent::HoseSettled {
                    machine: ctx.machine,
                    depth,
                });
            }
        }
    }

    /// Topmost fluid cell the hose passes through.
    fn nearest_fluid(&self, origin: BlockPos, world: &dyn World) -> Option<BlockPos> {
        let reach = self.reported_depth().to_num::<i32>();
        (1..=reach)
            .map(|d| origin.below(d))
            .find(|p| world.block(*p).fluid().is_some())
    }

    fn drain_step(&mut self, ctx: &mut TickContext<'_>) {
        let Some(seed) = self.nearest_fluid(ctx.pos, &*ctx.world) else {
            if self.target_source.take().is_some() {
                self.changed = true;
            }
            return;
        };
        let Some(blob) = FluidBlob::scan(&*ctx.world, seed, self.config.max_blob_nodes) else {
            return;
        };
        let Some(source) = blob.last_source() else {
            // A truncated scan may have stopped short of a source.
            if !blob.truncated && self.cleanup.is_none() {
                self.arm_cleanup(vec![seed], ctx);
            }
            return;
        };
        if self.target_source != Some(source) {
            self.target_source = Some(source);
            self.changed = true;
        }

        let stack = FluidStack::new(blob.fluid, self.config.drain_amount);
        if self.tank.fill(stack, true) < stack.amount {
            return;
        }
        self.tank.fill(stack, false);
        ctx.world.remove_block(source);
        self.target_source = None;
        self.changed = true;
        tracing::debug!(machine = ?ctx.machine, ?source, amount = stack.amount, "source drained");
        ctx.emit(MachineEvent::SourceDrained {
            machine: ctx.machine,
            pos: source,
            stack,
        });

        // Every piece left behind touches the drained cell.
        let anchors = self.sourceless_pieces(&*ctx.world, blob.fluid, source.neighbors());
        self.arm_cleanup(anchors, ctx);
    }

    /// One cell of each sourceless region reachable from `candidates`.
    /// Regions holding a source, or too large to scan whole, are skipped.
    fn sourceless_pieces(
        &self,
        world: &dyn World,
        fluid: FluidId,
        candidates: impl IntoIterator<Item = BlockPos>,
    ) -> Vec<BlockPos> {
        let mut covered = BTreeSet::new();
        let mut anchors = Vec::new();
        for pos in candidates {
            if covered.contains(&pos) || world.block(pos).fluid() != Some(fluid) {
                continue;
            }
            let Some(piece) = FluidBlob::scan(world, pos, self.config.max_blob_nodes) else {
                continue;
            };
            covered.extend(piece.cells.iter().copied());
            if !piece.has_source() && !piece.truncated {
                anchors.push(pos);
            }
        }
        anchors
    }

    /// Arm cleanup on `anchors`, or add them to the cleanup already armed.
    fn arm_cleanup(&mut self, anchors: Vec<BlockPos>, ctx: &mut TickContext<'_>) {
        let cooldown = self.config.evaporate_cooldown;
        let cleanup = self.cleanup.get_or_insert_with(|| Cleanup {
            anchors: Vec::new(),
            cooldown,
        });
        let mut added = Vec::new();
        for anchor in anchors {
            if !cleanup.anchors.contains(&anchor) {
                cleanup.anchors.push(anchor);
                added.push(anchor);
            }
        }
        if cleanup.anchors.is_empty() {
            self.cleanup = None;
            return;
        }
        if !added.is_empty() {
            self.changed = true;
        }
        for anchor in added {
            tracing::debug!(machine = ?ctx.machine, ?anchor, "cleanup armed");
            ctx.emit(MachineEvent::CleanupArmed {
                machine: ctx.machine,
                anchor,
            });
        }
    }

    fn disarm_cleanup(&mut self, ctx: &mut TickContext<'_>) {
        if self.cleanup.take().is_some() {
            self.changed = true;
            tracing::debug!(machine = ?ctx.machine, "cleanup disarmed");
            ctx.emit(MachineEvent::CleanupDisarmed {
                machine: ctx.machine,
            });
        }
    }

    fn cleanup_step(&mut self, ctx: &mut TickContext<'_>) {
        let Some(cleanup) = self.cleanup.as_mut() else {
            return;
        };
        if cleanup.cooldown > 0 {
            cleanup.cooldown -= 1;
            return;
        }
        let anchors = std::mem::take(&mut cleanup.anchors);

        let mut covered = BTreeSet::new();
        let mut pieces = Vec::new();
        for anchor in anchors {
            if covered.contains(&anchor) {
                continue;
            }
            let Some(piece) = FluidBlob::scan(&*ctx.world, anchor, self.config.max_blob_nodes) else {
                continue;
            };
            covered.extend(piece.cells.iter().copied());
            // A truncated scan may have stopped short of a source.
            if !piece.has_source() && !piece.truncated {
                pieces.push(piece);
            }
        }
        if pieces.is_empty() {
            self.disarm_cleanup(ctx);
            return;
        }

        let doomed: BTreeSet<BlockPos> =
            FluidBlob::farthest_flowing_among(&pieces, ctx.pos, self.config.evaporate_batch.max(1))
                .into_iter()
                .collect();
        for pos in &doomed {
            ctx.world.set_block(*pos, BlockState::Air);
        }
        tracing::trace!(machine = ?ctx.machine, cells = doomed.len(), "evaporated");
        ctx.emit(MachineEvent::Evaporated {
            machine: ctx.machine,
            cells: u32::try_from(doomed.len()).unwrap_or(u32::MAX),
        });

        // Whatever a removed cell cut off still touches that cell.
        let mut next = BTreeSet::new();
        for piece in &pieces {
            let mut touched = false;
            for pos in piece.cells.iter().filter(|p| doomed.contains(p)) {
                touched = true;
                next.extend(
                    pos.neighbors()
                        .filter(|n| ctx.world.block(*n).fluid() == Some(piece.fluid)),
                );
            }
            if !touched {
                next.extend(piece.cells.first().copied());
            }
        }

        if next.is_empty() {
            self.disarm_cleanup(ctx);
            return;
        }
        self.cleanup = Some(Cleanup {
            anchors: next.into_iter().collect(),
            cooldown: self.config.evaporate_cooldown,
        });
        self.changed = true;
    }

    /// Offer up to `output_per_tick` to fluid neighbors, starting at the
    /// rotating cursor. Whatever a neighbor does not take goes back into
    /// the tank.
    fn push_output(&mut self, ctx: &mut TickContext<'_>) {
        if self.tank.is_empty() {
            return;
        }
        let mut budget = self.config.output_per_tick;
        for i in 0..Face::ALL.len() {
            if budget <= 0 {
                break;
            }
            let face = Face::from_index(self.output_cursor + i);
            let Some(offer) = self.tank.drain(budget, true) else {
                break;
            };
            let Some(neighbor) = ctx
                .lookup(CapabilityKind::Fluid, face)
                .and_then(Capability::into_fluid)
            else {
                continue;
            };
            let accepted = neighbor.fill(face.opposite(), offer, true);
            if accepted <= 0 {
                continue;
            }
            let Some(drained) = self.tank.drain(accepted, false) else {
                break;
            };
            let delivered = neighbor.fill(face.opposite(), drained, false).clamp(0, drained.amount);
            if delivered < drained.amount {
                self.tank
                    .restore(FluidStack::new(drained.fluid, drained.amount - delivered));
            }
            budget -= delivered;
        }
        self.output_cursor = (self.output_cursor + 1) % Face::ALL.len();
    }

    pub fn take_changed(&mut self) -> bool {
        let own = std::mem::take(&mut self.changed);
        own | self.tank.take_changed()
    }
}

impl PulseAcceptor for Pump {
    fn accept_pulse(&mut self, _from: Face) -> bool {
        let next = self.pending_extend + Fixed64::ONE;
        if next > Fixed64::from_num(self.config.max_pulses) {
            return false;
        }
        self.pending_extend = next;
        self.changed = true;
        true
    }
}

/// Drain-only: the pump never takes fluid from neighbors.
impl FluidHandler for Pump {
    fn fill(&mut self, _from: Face, _stack: FluidStack, _simulate: bool) -> i64 {
        0
    }

    fn drain(&mut self, _from: Face, max: i64, simulate: bool) -> Option<FluidStack> {
        self.tank.drain(max, simulate)
    }
}

impl Persist for Pump {
    fn save(&self) -> Record {
        let mut record = Record::new();
        record.put_record("tank", self.tank.save());
        record.put_fixed("pending_extend", self.pending_extend);
        record.put_fixed("deployed_depth", self.deployed_depth);
        record.put_i64("max_depth", i64::from(self.max_depth));
        record.put_bool("settled", self.settled);
        record.put_pos("target_source", self.target_source);
        if let Some(cleanup) = &self.cleanup {
            let mut nested = Record::new();
            nested.put_i64("cooldown", i64::from(cleanup.cooldown));
            nested.put_i64("anchors", cleanup.anchors.len() as i64);
            for (i, anchor) in cleanup.anchors.iter().enumerate() {
                nested.put_pos(&format!("anchor_{i}"), Some(*anchor));
            }
            record.put_record("cleanup", nested);
        }
        record.put_i64("output_cursor", self.output_cursor as i64);
        record
    }

    fn load(&mut self, record: &Record) {
        self.tank.load(&record.get_record("tank"));
        self.pending_extend = record
            .get_fixed("pending_extend", Fixed64::ZERO)
            .clamp(Fixed64::ZERO, Fixed64::from_num(self.config.max_pulses));
        self.deployed_depth = record
            .get_fixed("deployed_depth", Fixed64::ZERO)
            .clamp(Fixed64::ZERO, Fixed64::from_num(self.config.max_range.max(0)));
        self.max_depth = i32::try_from(record.get_i64("max_depth", 0))
            .unwrap_or(0)
            .clamp(0, self.config.max_range.max(0));
        self.settled = record.get_bool("settled", false);
        self.target_source = record.get_pos("target_source");
        let nested = record.get_record("cleanup");
        let count = usize::try_from(nested.get_i64("anchors", 0))
            .unwrap_or(0)
            .min(self.config.max_blob_nodes);
        let anchors: Vec<BlockPos> = (0..count)
            .filter_map(|i| nested.get_pos(&format!("anchor_{i}")))
            .collect();
        self.cleanup = (!anchors.is_empty()).then(|| Cleanup {
            anchors,
            cooldown: u32::try_from(nested.get_i64("cooldown", 0))
                .unwrap_or(0)
                .min(self.config.evaporate_cooldown),
        });
        self.output_cursor = usize::try_from(record.get_i64("output_cursor", 0)).unwrap_or(0) % Face::ALL.len();
        self.changed = false;
    }
}
