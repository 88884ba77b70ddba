//! Engine: a self-fuelled source of energy, pulses and rotation.
//!
//! While running it generates a fixed amount of energy per tick, pushes
//! what it can into the machine it faces, and strikes one pulse into that
//! machine every `stroke_interval` ticks.

use rigworks_core::buffer::ResourceBuffer;
use rigworks_core::capability::{Capability, CapabilityKind, MechanicalSource};
use rigworks_core::fixed::Fixed64;
use rigworks_core::persist::{Persist, Record};
use rigworks_core::pos::Face;
use serde::{Deserialize, Serialize};

use crate::context::TickContext;

/// Ticks per minute at the nominal tick rate.
const TICKS_PER_MINUTE: u32 = 1200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Face the engine drives.
    pub facing: Face,
    pub energy_per_tick: i64,
    pub energy_capacity: i64,
    /// Most energy pushed per tick.
    pub max_output: i64,
    /// Ticks per stroke (one pulse per stroke).
    pub stroke_interval: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            facing: Face::Up,
            energy_per_tick: 10,
            energy_capacity: 1000,
            max_output: 50,
            stroke_interval: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Engine {
    config: EngineConfig,
    energy: ResourceBuffer,
    running: bool,
    stroke_timer: u32,
    strokes: u64,
    #[serde(skip)]
    changed: bool,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            energy: ResourceBuffer::new(config.energy_capacity, config.energy_capacity, config.max_output),
            config,
            running: true,
            stroke_timer: 0,
            strokes: 0,
            changed: false,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn energy(&self) -> &ResourceBuffer {
        &self.energy
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn set_running(&mut self, running: bool) {
        if self.running != running {
            self.running = running;
            self.changed = true;
        }
    }

    /// Completed strokes since placement.
    pub fn strokes(&self) -> u64 {
        self.strokes
    }

    fn interval(&self) -> u32 {
        self.config.stroke_interval.max(1)
    }

    pub fn tick(&mut self, ctx: &mut TickContext<'_>) {
        if !self.running {
            return;
        }
        let facing = self.config.facing;

        self.energy.receive(self.config.energy_per_tick, false);
        let offer = self.energy.extract(self.config.max_output, true);
        if offer > 0 {
            if let Some(sink) = ctx
                .lookup(CapabilityKind::Energy, facing)
                .and_then(Capability::into_energy)
            {
                let accepted = sink.accept_power(facing.opposite(), offer).clamp(0, offer);
                self.energy.extract(accepted, false);
            }
        }

        self.stroke_timer += 1;
        if self.stroke_timer >= self.interval() {
            self.stroke_timer = 0;
            self.strokes += 1;
            self.changed = true;
            let delivered = ctx
                .lookup(CapabilityKind::Pulse, facing)
                .and_then(Capability::into_pulse)
                .is_some_and(|acceptor| acceptor.accept_pulse(facing.opposite()));
            tracing::trace!(machine = ?ctx.machine, strokes = self.strokes, delivered, "engine stroke");
        }
    }

    pub fn take_changed(&mut self) -> bool {
        let own = std::mem::take(&mut self.changed);
        own | self.energy.take_changed()
    }
}

impl MechanicalSource for Engine {
    fn rpm(&self) -> u32 {
        if self.running {
            TICKS_PER_MINUTE / self.interval()
        } else {
            0
        }
    }

    fn phase(&self) -> Fixed64 {
        Fixed64::from_num(self.stroke_timer) / Fixed64::from_num(self.interval())
    }
}

impl Persist for Engine {
    fn save(&self) -> Record {
        let mut record = Record::new();
        record.put_record("energy", self.energy.save());
        record.put_bool("running", self.running);
        record.put_i64("stroke_timer", i64::from(self.stroke_timer));
        record.put_i64("strokes", i64::try_from(self.strokes).unwrap_or(i64::MAX));
        record
    }

    fn load(&mut self, record: &Record) {
        self.energy.load(&record.get_record("energy"));
        self.running = record.get_bool("running", true);
        self.stroke_timer = u32::try_from(record.get_i64("stroke_timer", 0))
            .unwrap_or(0)
            .min(self.interval() - 1);
        self.strokes = u64::try_from(record.get_i64("strokes", 0)).unwrap_or(0);
        self.changed = false;
    }
}
