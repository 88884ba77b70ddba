//! Refinery: turns oil into fuel, one conversion per tick at most.
//!
//! A conversion is all or nothing: both the combined oil in the two input
//! tanks and the output headroom are checked before anything moves.

use rigworks_core::capability::{Capability, CapabilityKind, FluidHandler};
use rigworks_core::event::MachineEvent;
use rigworks_core::fluid::{BUCKET, FluidFilter, FluidStack, FluidTank};
use rigworks_core::id::FluidId;
use rigworks_core::persist::{Persist, Record};
use rigworks_core::pos::Face;
use rigworks_core::pulse::{PulseAcceptor, PulseQueue};
use serde::{Deserialize, Serialize};

use crate::context::TickContext;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineryConfig {
    /// Fluids accepted as oil.
    pub oil_inputs: Vec<FluidId>,
    pub fuel: FluidId,
    pub tank_capacity: i64,
    /// Oil consumed per conversion.
    pub oil_per_cycle: i64,
    /// Fuel produced per conversion.
    pub fuel_per_cycle: i64,
    pub max_pulses: u32,
}

impl Default for RefineryConfig {
    fn default() -> Self {
        Self {
            oil_inputs: vec![FluidId(1)],
            fuel: FluidId(2),
            tank_capacity: 8 * BUCKET,
            oil_per_cycle: 100,
            fuel_per_cycle: 100,
            max_pulses: 64,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Refinery {
    config: RefineryConfig,
    inputs: [FluidTank; 2],
    output: FluidTank,
    pulses: PulseQueue,
    active_ticks: u64,
    mechanical_rate: u32,
    #[serde(skip)]
    changed: bool,
}

impl Refinery {
    pub fn new(config: RefineryConfig) -> Self {
        let oil = || FluidTank::new(config.tank_capacity, FluidFilter::Only(config.oil_inputs.clone()));
        Self {
            inputs: [oil(), oil()],
            output: FluidTank::new(config.tank_capacity, FluidFilter::Only(vec![config.fuel])),
            pulses: PulseQueue::new(config.max_pulses),
            active_ticks: 0,
            mechanical_rate: 0,
            changed: false,
            config,
        }
    }

    pub fn config(&self) -> &RefineryConfig {
        &self.config
    }

    pub fn input(&self, index: usize) -> Option<&FluidTank> {
        self.inputs.get(index)
    }

    pub fn input_mut(&mut self, index: usize) -> Option<&mut FluidTank> {
        self.inputs.get_mut(index)
    }

    pub fn output(&self) -> &FluidTank {
        &self.output
    }

    pub fn output_mut(&mut self) -> &mut FluidTank {
        &mut self.output
    }

    pub fn queued_pulses(&self) -> u32 {
        self.pulses.len()
    }

    /// Ticks on which a conversion went through.
    pub fn active_ticks(&self) -> u64 {
        self.active_ticks
    }

    /// Fastest neighboring mechanical source seen on the last tick.
    pub fn mechanical_rate(&self) -> u32 {
        self.mechanical_rate
    }

    /// Oil held across both input tanks.
    pub fn combined_input(&self) -> i64 {
        self.inputs
            .iter()
            .filter(|t| t.fluid().is_some_and(|f| self.config.oil_inputs.contains(&f)))
            .map(FluidTank::amount)
            .sum()
    }

    pub fn tick(&mut self, ctx: &mut TickContext<'_>) {
        self.refresh_mechanical_rate(ctx);

        if self.pulses.is_empty() {
            return;
        }
        let consumed = self.pulses.clear();
        self.changed = true;
        if consumed > 1 {
            tracing::trace!(machine = ?ctx.machine, extra = consumed - 1, "surplus pulses discarded");
        }

        if let Some(produced) = self.try_convert() {
            self.active_ticks += 1;
            tracing::debug!(machine = ?ctx.machine, amount = produced.amount, "converted");
            ctx.emit(MachineEvent::Converted {
                machine: ctx.machine,
                consumed: self.config.oil_per_cycle,
                produced,
            });
        }
    }

    fn refresh_mechanical_rate(&mut self, ctx: &mut TickContext<'_>) {
        let rate = Face::ALL
            .iter()
            .filter_map(|&face| {
                ctx.lookup(CapabilityKind::Mechanical, face)
                    .and_then(Capability::into_mechanical)
                    .map(|source| source.rpm())
            })
            .max()
            .unwrap_or(0);
        if rate != self.mechanical_rate {
            self.mechanical_rate = rate;
            self.changed = true;
        }
    }

    /// One conversion, or nothing if either side falls short.
    fn try_convert(&mut self) -> Option<FluidStack> {
        let quantum = self.config.oil_per_cycle;
        let produced = FluidStack::new(self.config.fuel, self.config.fuel_per_cycle);
        if quantum <= 0 || produced.amount <= 0 {
            return None;
        }
        if self.combined_input() < quantum || self.output.fill(produced, true) < produced.amount {
            return None;
        }

        let mut remaining = quantum;
        for tank in &mut self.inputs {
            let Some(fluid) = tank.fluid() else {
                continue;
            };
            if !self.config.oil_inputs.contains(&fluid) {
                continue;
            }
            if let Some(taken) = tank.drain(remaining, false) {
                remaining -= taken.amount;
            }
            if remaining == 0 {
                break;
            }
        }
        self.output.fill(produced, false);
        Some(produced)
    }

    pub fn take_changed(&mut self) -> bool {
        let mut changed = std::mem::take(&mut self.changed);
        for tank in &mut self.inputs {
            changed |= tank.take_changed();
        }
        changed | self.output.take_changed()
    }
}

impl PulseAcceptor for Refinery {
    fn accept_pulse(&mut self, _from: Face) -> bool {
        let banked = self.pulses.push();
        self.changed |= banked;
        banked
    }
}

/// Fills go to the input tanks, first tank first; drains come from the
/// output tank.
impl FluidHandler for Refinery {
    fn fill(&mut self, _from: Face, stack: FluidStack, simulate: bool) -> i64 {
        let mut accepted = 0;
        for tank in &mut self.inputs {
            let rest = FluidStack::new(stack.fluid, stack.amount - accepted);
            if rest.amount <= 0 {
                break;
            }
            accepted += tank.fill(rest, simulate);
        }
        accepted
    }

    fn drain(&mut self, _from: Face, max: i64, simulate: bool) -> Option<FluidStack> {
        self.output.drain(max, simulate)
    }
}

impl Persist for Refinery {
    fn save(&self) -> Record {
        let mut record = Record::new();
        record.put_record("input_0", self.inputs[0].save());
        record.put_record("input_1", self.inputs[1].save());
        record.put_record("output", self.output.save());
        record.put_record("pulses", self.pulses.save());
        record.put_i64("active_ticks", i64::try_from(self.active_ticks).unwrap_or(i64::MAX));
        record.put_i64("mechanical_rate", i64::from(self.mechanical_rate));
        record
    }

    fn load(&mut self, record: &Record) {
        self.inputs[0].load(&record.get_record("input_0"));
        self.inputs[1].load(&record.get_record("input_1"));
        self.output.load(&record.get_record("output"));
        self.pulses.load(&record.get_record("pulses"));
        self.active_ticks = u64::try_from(record.get_i64("active_ticks", 0)).unwrap_or(0);
        self.mechanical_rate = u32::try_from(record.get_i64("mechanical_rate", 0)).unwrap_or(0);
        self.changed = false;
    }
}
