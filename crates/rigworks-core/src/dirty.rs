use crate::id::MachineId;
use std::collections::BTreeSet;

/// Tracks which machines changed observable state since the last clean point.
///
/// The scheduler marks machines as it steps them; a sync layer reads
/// [`dirty_machines`](DirtyTracker::dirty_machines) to decide what to push
/// to observers, then calls [`mark_clean`](DirtyTracker::mark_clean).
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    dirty_machines: BTreeSet<MachineId>,
    layout_dirty: bool,
}

impl DirtyTracker {
    /// Create a new tracker with nothing dirty.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_machine(&mut self, machine: MachineId) {
        self.dirty_machines.insert(machine);
    }

    /// Mark that machines were added or removed.
    pub fn mark_layout(&mut self) {
        self.layout_dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.layout_dirty || !self.dirty_machines.is_empty()
    }

    pub fn is_machine_dirty(&self, machine: MachineId) -> bool {
        self.dirty_machines.contains(&machine)
    }

    pub fn is_layout_dirty(&self) -> bool {
        self.layout_dirty
    }

    pub fn dirty_machines(&self) -> &BTreeSet<MachineId> {
        &self.dirty_machines
    }

    /// Forget a removed machine.
    pub fn forget(&mut self, machine: MachineId) {
        self.dirty_machines.remove(&machine);
    }

    /// Reset all dirty flags.
    pub fn mark_clean(&mut self) {
        self.dirty_machines.clear();
        self.layout_dirty = false;
    }
}
