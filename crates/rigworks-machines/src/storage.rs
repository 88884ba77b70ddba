//! Passive storage: a fluid tank and an item crate. Neither ticks.

use rigworks_core::capability::{FluidHandler, ItemSink};
use rigworks_core::fluid::{FluidStack, FluidTank};
use rigworks_core::id::ItemTypeId;
use rigworks_core::item::{InventorySlot, ItemStack};
use rigworks_core::persist::{Persist, Record};
use rigworks_core::pos::Face;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FluidStore {
    tank: FluidTank,
}

impl FluidStore {
    pub fn new(tank: FluidTank) -> Self {
        Self { tank }
    }

    pub fn tank(&self) -> &FluidTank {
        &self.tank
    }

    pub fn tank_mut(&mut self) -> &mut FluidTank {
        &mut self.tank
    }

    pub fn take_changed(&mut self) -> bool {
        self.tank.take_changed()
    }
}

impl FluidHandler for FluidStore {
    fn fill(&mut self, _from: Face, stack: FluidStack, simulate: bool) -> i64 {
        self.tank.fill(stack, simulate)
    }

    fn drain(&mut self, _from: Face, max: i64, simulate: bool) -> Option<FluidStack> {
        self.tank.drain(max, simulate)
    }
}

impl Persist for FluidStore {
    fn save(&self) -> Record {
        let mut record = Record::new();
        record.put_record("tank", self.tank.save());
        record
    }

    fn load(&mut self, record: &Record) {
        self.tank.load(&record.get_record("tank"));
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCrate {
    slot: InventorySlot,
    #[serde(skip)]
    changed: bool,
}

impl ItemCrate {
    pub fn new(capacity: u32) -> Self {
        Self {
            slot: InventorySlot::new(capacity),
            changed: false,
        }
    }

    pub fn slot(&self) -> &InventorySlot {
        &self.slot
    }

    pub fn quantity(&self, item: ItemTypeId) -> u32 {
        self.slot.quantity(item)
    }

    pub fn take_changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }
}

impl ItemSink for ItemCrate {
    fn insert(&mut self, from: Face, stack: ItemStack, simulate: bool) -> u32 {
        let taken = self.slot.insert(from, stack, simulate);
        if !simulate && taken > 0 {
            self.changed = true;
        }
        taken
    }
}

impl Persist for ItemCrate {
    fn save(&self) -> Record {
        let mut record = Record::new();
        for stack in self.slot.stacks() {
            record.put_i64(&format!("item_{}", stack.item_type.0), i64::from(stack.quantity));
        }
        record
    }

    /// Unknown keys are ignored; quantities beyond the crate capacity are
    /// dropped.
    fn load(&mut self, record: &Record) {
        self.slot.clear();
        for (item, quantity) in record.keys_with_prefix("item_") {
            let Ok(item) = item.parse::<u32>() else {
                continue;
            };
            let quantity = u32::try_from(quantity.max(0)).unwrap_or(u32::MAX);
            let overflow = quantity - self.slot.accept(ItemTypeId(item), quantity);
            if overflow > 0 {
                tracing::warn!(item, overflow, "crate contents exceed capacity, dropping overflow");
            }
        }
        self.changed = false;
    }
}
