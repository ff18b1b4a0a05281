use std::fmt;

use dashmap::DashMap;
use serde::Serialize;

/// Identity of one execution unit inside a [`WorkerPool`](crate::WorkerPool).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct UnitId(pub usize);

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "hazard-unit-{}", self.0)
    }
}

/// Scratch storage keyed by execution unit rather than by task.
///
/// A slot starts unset, holds whatever was last written on that unit, and is
/// never reset by the store itself. Any task scheduled onto the unit later
/// sees the value left behind by the previous one.
#[derive(Debug)]
pub struct ScratchStore<V> {
    slots: DashMap<UnitId, V>,
}

impl<V> Default for ScratchStore<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> ScratchStore<V> {
    pub fn new() -> Self {
        ScratchStore {
            slots: DashMap::new(),
        }
    }

    /// Overwrite the unit's slot, returning what it held.
    pub fn set(&self, unit: UnitId, value: V) -> Option<V> {
        self.slots.insert(unit, value)
    }

    /// Put the unit's slot back to unset.
    pub fn remove(&self, unit: UnitId) -> Option<V> {
        self.slots.remove(&unit).map(|(_, v)| v)
    }

    /// Number of units currently holding a value.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

impl<V: Clone> ScratchStore<V> {
    /// Last value written on `unit`, or `None` if it was never written.
    pub fn get(&self, unit: UnitId) -> Option<V> {
        self.slots.get(&unit).map(|v| v.value().clone())
    }
}
