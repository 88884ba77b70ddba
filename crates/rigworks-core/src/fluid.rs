//! Single-fluid tanks built on [`ResourceBuffer`].

use serde::{Deserialize, Serialize};

use crate::buffer::ResourceBuffer;
use crate::id::FluidId;
use crate::persist::{Persist, Record};

/// One bucket, in millibuckets.
pub const BUCKET: i64 = 1000;

/// A quantity of one fluid, in millibuckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidStack {
    pub fluid: FluidId,
    pub amount: i64,
}

impl FluidStack {
    pub fn new(fluid: FluidId, amount: i64) -> Self {
        Self { fluid, amount }
    }

    pub fn buckets(fluid: FluidId, buckets: i64) -> Self {
        Self::new(fluid, buckets * BUCKET)
    }
}

/// Which fluids a tank will take.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum FluidFilter {
    #[default]
    Any,
    Only(Vec<FluidId>),
}

impl FluidFilter {
    pub fn accepts(&self, fluid: FluidId) -> bool {
        match self {
            FluidFilter::Any => true,
            FluidFilter::Only(allowed) => allowed.contains(&fluid),
        }
    }
}

/// A tank holding at most one fluid type at a time. The type is forgotten
/// when the tank runs empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidTank {
    fluid: Option<FluidId>,
    buffer: ResourceBuffer,
    filter: FluidFilter,
}

impl FluidTank {
    pub fn new(capacity: i64, filter: FluidFilter) -> Self {
        Self {
            fluid: None,
            buffer: ResourceBuffer::unthrottled(capacity),
            filter,
        }
    }

    pub fn with_rates(capacity: i64, max_in: i64, max_out: i64, filter: FluidFilter) -> Self {
        Self {
            fluid: None,
            buffer: ResourceBuffer::new(capacity, max_in, max_out),
            filter,
        }
    }

    pub fn fluid(&self) -> Option<FluidId> {
        self.fluid
    }

    pub fn amount(&self) -> i64 {
        self.buffer.level()
    }

    pub fn capacity(&self) -> i64 {
        self.buffer.capacity()
    }

    pub fn headroom(&self) -> i64 {
        self.buffer.headroom()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    pub fn filter(&self) -> &FluidFilter {
        &self.filter
    }

    /// Current contents, or `None` when empty.
    pub fn contents(&self) -> Option<FluidStack> {
        match self.fluid {
            Some(fluid) if !self.buffer.is_empty() => Some(FluidStack::new(fluid, self.amount())),
            _ => None,
        }
    }

    /// Whether `fluid` passes the filter and does not clash with what is
    /// already stored.
    pub fn can_accept(&self, fluid: FluidId) -> bool {
        self.filter.accepts(fluid) && (self.buffer.is_empty() || self.fluid == Some(fluid))
    }

    /// Returns how much of `stack` was (or would be) taken.
    pub fn fill(&mut self, stack: FluidStack, simulate: bool) -> i64 {
        if stack.amount <= 0 || !self.can_accept(stack.fluid) {
            return 0;
        }
        let accepted = self.buffer.receive(stack.amount, simulate);
        if !simulate && accepted > 0 {
            self.fluid = Some(stack.fluid);
        }
        accepted
    }

    /// Withdraw up to `max` of whatever is stored.
    pub fn drain(&mut self, max: i64, simulate: bool) -> Option<FluidStack> {
        let fluid = self.fluid?;
        let removed = self.buffer.extract(max, simulate);
        if removed == 0 {
            return None;
        }
        if !simulate && self.buffer.is_empty() {
            self.fluid = None;
        }
        Some(FluidStack::new(fluid, removed))
    }

    /// Like [`drain`](Self::drain) but only if the tank holds `fluid`.
    pub fn drain_fluid(&mut self, fluid: FluidId, max: i64, simulate: bool) -> Option<FluidStack> {
        if self.fluid != Some(fluid) {
            return None;
        }
        self.drain(max, simulate)
    }

    /// Return fluid withdrawn earlier this tick, bypassing the fill rate.
    pub fn restore(&mut self, stack: FluidStack) -> i64 {
        if stack.amount <= 0 || !self.can_accept(stack.fluid) {
            return 0;
        }
        let restored = self.buffer.restore(stack.amount);
        if restored > 0 {
            self.fluid = Some(stack.fluid);
        }
        restored
    }

    /// Replace the contents outright (clamped to capacity).
    pub fn set_contents(&mut self, stack: Option<FluidStack>) {
        match stack {
            Some(s) if s.amount > 0 => {
                self.fluid = Some(s.fluid);
                self.buffer.set_level(s.amount);
            }
            _ => {
                self.fluid = None;
                self.buffer.set_level(0);
            }
        }
    }

    pub fn take_changed(&mut self) -> bool {
        self.buffer.take_changed()
    }
}

impl Persist for FluidTank {
    fn save(&self) -> Record {
        let mut record = Record::new();
        if let Some(stack) = self.contents() {
            record.put_i64("fluid", i64::from(stack.fluid.0));
            record.put_i64("amount", stack.amount);
        }
        record
    }

    fn load(&mut self, record: &Record) {
        let fluid = u32::try_from(record.get_i64("fluid", -1)).ok().map(FluidId);
        let amount = record.get_i64("amount", 0);
        let contents = match fluid {
            Some(f) if self.filter.accepts(f) => Some(FluidStack::new(f, amount)),
            Some(f) => {
                tracing::warn!(fluid = f.0, "stored fluid rejected by tank filter, discarding");
                None
            }
            None => None,
        };
        self.set_contents(contents);
        self.buffer.take_changed();
    }
}
