//! Per-table reproducible keyspace-state (§3, §5).
//!
//! The mutex here is the serialization point for the entire scheduling
//! algorithm in `scheduler.rs`: the appended ordinal must equal the bitmap
//! length read at the start of the same critical section, so every read of
//! "current length" and the matching append happen under one lock
//! acquisition.

use std::collections::HashMap;

use parking_lot::Mutex;

/// One bitmap entry per insert attempt ever scheduled for a table.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyFlags {
    pub is_primary: bool,
    pub was_updated: bool,
    pub was_deleted: bool,
}

struct Inner {
    bitmap: Vec<KeyFlags>,
    update_dict: HashMap<u64, u64>,
}

/// Reproducible scheduling state for a single table.
///
/// `bitmap.len()` is the number of insert attempts ever scheduled; it is the
/// authoritative source of "known ordinals" for select/update/delete
/// scheduling (see the REDESIGN FLAG in DESIGN.md) — NOT the separately
/// tracked `stats::InsertedCounters`, which only reflects confirmed DB writes
/// and exists purely for observability.
pub struct TableKeyState {
    inner: Mutex<Inner>,
}

impl Default for TableKeyState {
    fn default() -> Self {
        Self::new()
    }
}

impl TableKeyState {
    pub fn new() -> Self {
        TableKeyState {
            inner: Mutex::new(Inner {
                bitmap: Vec::new(),
                update_dict: HashMap::new(),
            }),
        }
    }

    /// Number of insert attempts scheduled so far (`N` in §4.1).
    pub fn len(&self) -> u64 {
        self.inner.lock().bitmap.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Appends a new bitmap entry and returns its ordinal. Ordinal 0 is
    /// forced to `is_primary = true` regardless of the caller's flags (§3
    /// invariant).
    pub fn append(&self, mut flags: KeyFlags) -> u64 {
        let mut inner = self.inner.lock();
        let ordinal = inner.bitmap.len() as u64;
        if ordinal == 0 {
            flags.is_primary = true;
        }
        inner.bitmap.push(flags);
        ordinal
    }

    pub fn flags(&self, ordinal: u64) -> KeyFlags {
        self.inner.lock().bitmap[ordinal as usize]
    }

    pub fn mark_updated(&self, ordinal: u64, update_seed: u64) {
        let mut inner = self.inner.lock();
        inner.bitmap[ordinal as usize].was_updated = true;
        inner.update_dict.insert(ordinal, update_seed);
    }

    pub fn mark_deleted(&self, ordinal: u64) {
        let mut inner = self.inner.lock();
        inner.bitmap[ordinal as usize].was_deleted = true;
        inner.update_dict.remove(&ordinal);
    }

    pub fn update_seed_of(&self, ordinal: u64) -> Option<u64> {
        self.inner.lock().update_dict.get(&ordinal).copied()
    }

    /// Runs `f` with exclusive access to the bitmap and update-dict,
    /// returning whatever `f` returns. Used by the scheduler for the
    /// read-decide-append transactions in §4.1 that need more than one of
    /// the primitives above inside a single critical section.
    pub fn with_lock<R>(&self, f: impl FnOnce(&mut StateHandle) -> R) -> R {
        let mut inner = self.inner.lock();
        let mut handle = StateHandle { inner: &mut inner };
        f(&mut handle)
    }
}

/// Handle into the locked state, for multi-step scheduling transactions.
pub struct StateHandle<'a> {
    inner: &'a mut Inner,
}

impl<'a> StateHandle<'a> {
    pub fn len(&self) -> u64 {
        self.inner.bitmap.len() as u64
    }

    pub fn is_primary(&self, ordinal: u64) -> bool {
        self.inner.bitmap[ordinal as usize].is_primary
    }

    pub fn was_deleted(&self, ordinal: u64) -> bool {
        self.inner.bitmap[ordinal as usize].was_deleted
    }

    pub fn update_seed_of(&self, ordinal: u64) -> Option<u64> {
        self.inner.update_dict.get(&ordinal).copied()
    }

    pub fn append(&mut self, mut flags: KeyFlags) -> u64 {
        let ordinal = self.inner.bitmap.len() as u64;
        if ordinal == 0 {
            flags.is_primary = true;
        }
        self.inner.bitmap.push(flags);
        ordinal
    }

    pub fn mark_updated(&mut self, ordinal: u64, update_seed: u64) {
        self.inner.bitmap[ordinal as usize].was_updated = true;
        self.inner.update_dict.insert(ordinal, update_seed);
    }

    pub fn mark_deleted(&mut self, ordinal: u64) {
        self.inner.bitmap[ordinal as usize].was_deleted = true;
        self.inner.update_dict.remove(&ordinal);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_ordinal_is_always_primary() {
        let state = TableKeyState::new();
        let ordinal = state.append(KeyFlags {
            is_primary: false,
            was_updated: false,
            was_deleted: false,
        });
        assert_eq!(ordinal, 0);
        assert!(state.flags(0).is_primary);
    }

    #[test]
    fn ordinals_are_monotonic_and_gapless() {
        let state = TableKeyState::new();
        for i in 0..100u64 {
            let ordinal = state.append(KeyFlags::default());
            assert_eq!(ordinal, i);
        }
        assert_eq!(state.len(), 100);
    }

    #[test]
    fn delete_is_monotonic() {
        let state = TableKeyState::new();
        state.append(KeyFlags::default());
        state.mark_deleted(0);
        assert!(state.flags(0).was_deleted);
    }

    #[test]
    fn update_dict_tracks_ordinal() {
        let state = TableKeyState::new();
        state.append(KeyFlags::default());
        state.mark_updated(0, 42);
        assert_eq!(state.update_seed_of(0), Some(42));
        assert!(state.flags(0).was_updated);
        state.mark_deleted(0);
        assert_eq!(state.update_seed_of(0), None);
    }
}
