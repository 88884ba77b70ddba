//! Pulse and power delivery between an engine-like source and an acceptor.
//!
//! Two independent channels are modeled. Pulses are discrete strokes of
//! mechanical timing that drive progress; power is an energy amount pushed
//! into the acceptor's [`ResourceBuffer`]. Both are addressed by the face of
//! the acceptor that points back toward the source.

use serde::{Deserialize, Serialize};

use crate::buffer::ResourceBuffer;
use crate::persist::{Persist, Record};
use crate::pos::Face;

/// Default ceiling for banked pulses.
pub const DEFAULT_MAX_PULSES: u32 = 64;

/// Receives discrete mechanical pulses.
pub trait PulseAcceptor {
    /// Returns whether the pulse was banked. A saturated acceptor answers
    /// `false`.
    fn accept_pulse(&mut self, from: Face) -> bool;
}

/// Receives continuous power.
pub trait EnergySink {
    /// Deliver `amount`; returns how much was stored. The rest is dropped.
    fn accept_power(&mut self, from: Face, amount: i64) -> i64;
}

impl EnergySink for ResourceBuffer {
    fn accept_power(&mut self, _from: Face, amount: i64) -> i64 {
        self.receive(amount, false)
    }
}

/// A clamped counter of banked pulses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PulseQueue {
    queued: u32,
    max: u32,
}

impl Default for PulseQueue {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_PULSES)
    }
}

impl PulseQueue {
    pub fn new(max: u32) -> Self {
        Self { queued: 0, max }
    }

    pub fn len(&self) -> u32 {
        self.queued
    }

    pub fn is_empty(&self) -> bool {
        self.queued == 0
    }

    pub fn max(&self) -> u32 {
        self.max
    }

    /// Bank one pulse. Returns `false` when already saturated.
    pub fn push(&mut self) -> bool {
        if self.queued >= self.max {
            return false;
        }
        self.queued += 1;
        true
    }

    /// Consume one pulse if any is banked.
    pub fn pop(&mut self) -> bool {
        if self.queued == 0 {
            return false;
        }
        self.queued -= 1;
        true
    }

    /// Drop every banked pulse and return how many there were.
    pub fn clear(&mut self) -> u32 {
        std::mem::take(&mut self.queued)
    }
}

impl Persist for PulseQueue {
    fn save(&self) -> Record {
        let mut record = Record::new();
        record.put_i64("queued", i64::from(self.queued));
        record
    }

    fn load(&mut self, record: &Record) {
        let stored = record.get_i64("queued", 0).clamp(0, i64::from(self.max));
        self.queued = u32::try_from(stored).unwrap_or(0);
    }
}
