//! Per-key single-capacity rendezvous slots
//!
//! Workers finish blocks in any order; the flushing thread asks for them in
//! index order. Each key holds at most one pending value: `put` waits while
//! the slot is full and `get` waits while it is empty.

use crate::error::{PigzrError, PigzrResult};
use std::collections::HashMap;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};

struct Slot<V> {
    value: Mutex<Option<V>>,
    changed: Condvar,
}

impl<V> Slot<V> {
    fn new() -> Self {
        Self {
            value: Mutex::new(None),
            changed: Condvar::new(),
        }
    }

    fn lock(&self) -> PigzrResult<MutexGuard<'_, Option<V>>> {
        self.value
            .lock()
            .map_err(|_| PigzrError::thread("handoff slot poisoned"))
    }

    fn wait<'a>(
        &self,
        guard: MutexGuard<'a, Option<V>>,
    ) -> PigzrResult<MutexGuard<'a, Option<V>>> {
        self.changed
            .wait(guard)
            .map_err(|_| PigzrError::thread("handoff slot poisoned while waiting"))
    }
}

pub struct OrderedSlotMap<V> {
    slots: Mutex<HashMap<usize, Arc<Slot<V>>>>,
}

impl<V> OrderedSlotMap<V> {
    /// Pre-size for the number of distinct keys one batch uses
    pub fn with_capacity(keys: usize) -> Self {
        Self {
            slots: Mutex::new(HashMap::with_capacity(keys + 2)),
        }
    }

    fn slot(&self, key: usize) -> PigzrResult<Arc<Slot<V>>> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| PigzrError::thread("handoff map poisoned"))?;
        Ok(Arc::clone(
            slots.entry(key).or_insert_with(|| Arc::new(Slot::new())),
        ))
    }

    /// Deposit `value` under `key`, waiting while a previous value is unconsumed.
    pub fn put(&self, key: usize, value: V) -> PigzrResult<()> {
        let slot = self.slot(key)?;
        let mut guard = slot.lock()?;
        while guard.is_some() {
            guard = slot.wait(guard)?;
        }
        *guard = Some(value);
        slot.changed.notify_all();
        Ok(())
    }

    /// Take the value under `key`, waiting until one is deposited.
    pub fn get(&self, key: usize) -> PigzrResult<V> {
        let slot = self.slot(key)?;
        let mut guard = slot.lock()?;
        loop {
            if let Some(value) = guard.take() {
                slot.changed.notify_all();
                return Ok(value);
            }
            guard = slot.wait(guard)?;
        }
    }
}
