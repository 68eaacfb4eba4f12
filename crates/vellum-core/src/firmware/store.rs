//! High-water mark store seam.

use std::collections::BTreeMap;

use super::header::HardwareVariant;
use crate::error::CoreError;

/// Read side of the persistent anti-rollback store.
///
/// Holds, per hardware variant, the newest firmware timestamp ever
/// accepted. Implementations must answer from the backing store on every
/// call; a cached answer could re-admit a downgrade that a later commit
/// has since ruled out.
pub trait HighWaterStore {
    /// Newest accepted timestamp for `variant`, or `None` if nothing was
    /// ever recorded.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn high_water(&self, variant: HardwareVariant) -> Result<Option<u32>, CoreError>;
}

impl<T: HighWaterStore + ?Sized> HighWaterStore for &T {
    fn high_water(&self, variant: HardwareVariant) -> Result<Option<u32>, CoreError> {
        (**self).high_water(variant)
    }
}

/// In-memory store for simulators and tests.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MemoryHighWater {
    marks: BTreeMap<HardwareVariant, u32>,
}

impl MemoryHighWater {
    /// An empty store: no marks recorded.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            marks: BTreeMap::new(),
        }
    }

    /// Raise the mark for `variant` to `timestamp` if it is newer.
    ///
    /// Returns the mark now in effect; marks never move backwards.
    pub fn advance(&mut self, variant: HardwareVariant, timestamp: u32) -> u32 {
        let mark = self.marks.entry(variant).or_insert(timestamp);
        *mark = (*mark).max(timestamp);
        *mark
    }
}

impl HighWaterStore for MemoryHighWater {
    fn high_water(&self, variant: HardwareVariant) -> Result<Option<u32>, CoreError> {
        Ok(self.marks.get(&variant).copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_has_no_marks() {
        let store = MemoryHighWater::new();
        for variant in HardwareVariant::all() {
            assert_eq!(store.high_water(variant).unwrap(), None);
        }
    }

    #[test]
    fn advance_is_monotonic() {
        let mut store = MemoryHighWater::new();
        assert_eq!(store.advance(HardwareVariant::Rev2, 100), 100);
        assert_eq!(store.advance(HardwareVariant::Rev2, 50), 100);
        assert_eq!(store.advance(HardwareVariant::Rev2, 150), 150);
        assert_eq!(store.high_water(HardwareVariant::Rev2).unwrap(), Some(150));
    }

    #[test]
    fn marks_are_per_variant() {
        let mut store = MemoryHighWater::new();
        store.advance(HardwareVariant::Rev1, 10);
        assert_eq!(store.high_water(HardwareVariant::Rev3).unwrap(), None);
    }

    #[test]
    fn reference_forwards_reads() {
        let mut store = MemoryHighWater::new();
        store.advance(HardwareVariant::Rev3, 7);
        fn read_through<S: HighWaterStore>(store: S) -> Option<u32> {
            store.high_water(HardwareVariant::Rev3).unwrap()
        }
        assert_eq!(read_through(&store), Some(7));
    }
}
