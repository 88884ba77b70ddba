use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::id::ItemTypeId;

/// Items of one type, as dropped by a broken block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemStack {
    pub item_type: ItemTypeId,
    pub quantity: u32,
}

impl ItemStack {
    pub fn new(item_type: ItemTypeId, quantity: u32) -> Self {
        Self { item_type, quantity }
    }

    pub fn is_empty(&self) -> bool {
        self.quantity == 0
    }
}

/// Mixed item storage bounded by a total count. Contents iterate in item id
/// order so saves are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventorySlot {
    contents: BTreeMap<ItemTypeId, u32>,
    capacity: u32,
}

impl InventorySlot {
    pub fn new(capacity: u32) -> Self {
        Self {
            contents: BTreeMap::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Store as much of `quantity` as fits; returns the amount stored.
    #[must_use = "items that were not stored are still the caller's"]
    pub fn accept(&mut self, item_type: ItemTypeId, quantity: u32) -> u32 {
        let stored = quantity.min(self.space());
        if stored > 0 {
            *self.contents.entry(item_type).or_insert(0) += stored;
        }
        stored
    }

    /// Withdraw up to `quantity`; returns the amount withdrawn.
    #[must_use = "withdrawn items leave the slot"]
    pub fn take(&mut self, item_type: ItemTypeId, quantity: u32) -> u32 {
        let Some(held) = self.contents.get_mut(&item_type) else {
            return 0;
        };
        let taken = quantity.min(*held);
        *held -= taken;
        if *held == 0 {
            self.contents.remove(&item_type);
        }
        taken
    }

    pub fn quantity(&self, item_type: ItemTypeId) -> u32 {
        self.contents.get(&item_type).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.contents.values().sum()
    }

    pub fn space(&self) -> u32 {
        self.capacity.saturating_sub(self.total())
    }

    pub fn is_empty(&self) -> bool {
        self.contents.is_empty()
    }

    pub fn stacks(&self) -> impl Iterator<Item = ItemStack> + '_ {
        self.contents
            .iter()
            .map(|(&item_type, &quantity)| ItemStack::new(item_type, quantity))
    }

    pub fn clear(&mut self) {
        self.contents.clear();
    }
}
