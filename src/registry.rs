use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::{OutputError, Result};
use crate::instance::InstanceContext;

/// Fixed capacity table of instance contexts, indexed by instance id.
///
/// Entries are written during setup only and never removed; afterwards the
/// table is read concurrently by workers and command dispatch.
pub struct InstanceRegistry {
    slots: RwLock<Vec<Option<Arc<InstanceContext>>>>,
}

impl InstanceRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: RwLock::new(vec![None; capacity]),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.read().len()
    }

    /// Stores `ctx` under its id, replacing any previous entry.
    ///
    /// # Panics
    ///
    /// When the id does not fit the capacity the registry was created with.
    pub fn register(&self, ctx: InstanceContext) -> Arc<InstanceContext> {
        let mut slots = self.slots.write();
        let capacity = slots.len();
        let id = ctx.id;
        assert!(
            id < capacity,
            "instance id {} out of range, registry capacity is {}",
            id,
            capacity
        );

        let ctx = Arc::new(ctx);
        slots[id] = Some(ctx.clone());
        ctx
    }

    pub fn get(&self, id: usize) -> Result<Arc<InstanceContext>> {
        self.slots
            .read()
            .get(id)
            .cloned()
            .flatten()
            .ok_or(OutputError::NotFound(id))
    }

    pub fn contains(&self, id: usize) -> bool {
        self.get(id).is_ok()
    }

    /// Ids of all registered instances in ascending order.
    pub fn ids(&self) -> Vec<usize> {
        self.slots
            .read()
            .iter()
            .enumerate()
            .filter_map(|(id, slot)| slot.as_ref().map(|_| id))
            .collect()
    }

    /// Dispatches a command to the instance registered under `id`.
    pub fn dispatch(&self, id: usize, command: u32, group: u32, value: i32) -> Result<i32> {
        self.get(id)?.dispatch(command, group, value)
    }
}
