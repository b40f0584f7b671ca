//! Fixed-capacity PCB pool.
//!
//! A fixed-size collection of `RwLock`-guarded slots allocated once up
//! front (so slot addresses are stable for the life of the pool), plus a
//! free list guarding reuse. The free list lives in its own `Mutex`,
//! separate from the slot storage, so allocation bookkeeping doesn't
//! contend with concurrent access to unrelated slots.

use std::collections::VecDeque;
use std::sync::{Mutex, RwLock};

use crate::pcb::{Pcb, ProcessId};

struct Slot {
    used: bool,
    pcb: Pcb,
}

/// A fixed-capacity slab of PCBs with stable, 512-byte-aligned addresses
/// (conceptually — in Rust the "address" that matters is the stable slot
/// index, which is what `ProcessId` carries) and LIFO reuse.
pub struct PcbPool {
    slots: Box<[RwLock<Slot>]>,
    free_list: Mutex<VecDeque<usize>>,
}

impl PcbPool {
    /// Build a pool of `capacity` slots, all initially free. A minimum
    /// useful capacity of 10 is assumed but not itself enforced — callers
    /// asking for 0 simply get a pool that always reports full.
    pub fn new(capacity: usize) -> Self {
        let slots = (0..capacity)
            .map(|_| {
                RwLock::new(Slot {
                    used: false,
                    pcb: Pcb::zeroed(),
                })
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        // Seed the free list in index order so the first `capacity`
        // allocations hand out the lowest-index slots first.
        let free_list = Mutex::new((0..capacity).collect());
        log::debug!("pcb pool initialized with capacity {capacity}");
        PcbPool { slots, free_list }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// `allocate_pcb() → PCB*`. Returns the lowest-index free
    /// slot, zero-initialized; `None` if the pool is full.
    pub fn allocate_pcb(&self) -> Option<ProcessId> {
        let index = self.free_list.lock().unwrap().pop_front()?;
        let mut slot = self.slots[index].write().unwrap();
        slot.used = true;
        slot.pcb = Pcb::zeroed();
        drop(slot);
        log::debug!("allocated pcb slot {index}");
        Some(ProcessId::from_index(index))
    }

    /// `free_pcb(PCB*) → {0,1}`. Rejects anything that is not a
    /// live slot of this pool (out-of-range index, or an already-free slot —
    /// i.e. a double free), without otherwise changing state.
    pub fn free_pcb(&self, id: ProcessId) -> bool {
        let index = id.index();
        let Some(slot_lock) = self.slots.get(index) else {
            return false;
        };
        let mut slot = slot_lock.write().unwrap();
        if !slot.used {
            return false; // not live: absent, or a double-free
        }
        slot.used = false;
        slot.pcb = Pcb::zeroed();
        drop(slot);
        // Push to the front so the very next allocation reuses this slot
        //.
        self.free_list.lock().unwrap().push_front(index);
        log::debug!("freed pcb slot {index}");
        true
    }

    /// Number of slots currently allocated.
    pub fn used_count(&self) -> usize {
        self.slots
            .iter()
            .filter(|s| s.read().unwrap().used)
            .count()
    }

    /// Runs `f` once per currently-live PCB, for diagnostics snapshots.
    /// Takes one read lock per slot in turn; not a consistent point-in-time
    /// view under concurrent mutation, which is fine for a snapshot.
    pub fn for_each_live(&self, mut f: impl FnMut(&Pcb)) {
        for slot in self.slots.iter() {
            let slot = slot.read().unwrap();
            if slot.used {
                f(&slot.pcb);
            }
        }
    }

    /// Run `f` with shared read access to the PCB at `id`, or `None` if the
    /// slot is not currently live.
    pub fn with_pcb<R>(&self, id: ProcessId, f: impl FnOnce(&Pcb) -> R) -> Option<R> {
        let slot = self.slots.get(id.index())?.read().unwrap();
        if !slot.used {
            return None;
        }
        Some(f(&slot.pcb))
    }

    /// Run `f` with exclusive write access to the PCB at `id`, or `None` if
    /// the slot is not currently live.
    pub fn with_pcb_mut<R>(&self, id: ProcessId, f: impl FnOnce(&mut Pcb) -> R) -> Option<R> {
        let mut slot = self.slots.get(id.index())?.write().unwrap();
        if !slot.used {
            return None;
        }
        Some(f(&mut slot.pcb))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reuse_returns_same_slot() {
        let pool = PcbPool::new(4);
        let p1 = pool.allocate_pcb().unwrap();
        assert!(pool.free_pcb(p1));
        let p2 = pool.allocate_pcb().unwrap();
        assert_eq!(p1, p2, "free-then-alloc must reuse the same slot");
    }

    #[test]
    fn exhaustion_then_recovery() {
        let pool = PcbPool::new(4);
        let ids: Vec<_> = (0..4).map(|_| pool.allocate_pcb().unwrap()).collect();
        assert!(pool.allocate_pcb().is_none(), "5th allocation must fail");
        assert!(pool.free_pcb(ids[0]));
        assert!(pool.allocate_pcb().is_some());
    }

    #[test]
    fn double_free_rejected() {
        let pool = PcbPool::new(2);
        let p = pool.allocate_pcb().unwrap();
        assert!(pool.free_pcb(p));
        assert!(!pool.free_pcb(p), "double free must return false");
    }

    #[test]
    fn allocate_zero_initializes() {
        let pool = PcbPool::new(2);
        let id = pool.allocate_pcb().unwrap();
        pool.with_pcb_mut(id, |pcb| pcb.pid = 99);
        pool.free_pcb(id);
        let id2 = pool.allocate_pcb().unwrap();
        assert_eq!(pool.with_pcb(id2, |pcb| pcb.pid), Some(0));
    }

    #[test]
    fn lowest_index_first_when_all_free() {
        let pool = PcbPool::new(3);
        let ids: Vec<_> = (0..3).map(|_| pool.allocate_pcb().unwrap()).collect();
        let indices: Vec<_> = ids.iter().map(|id| id.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn for_each_live_visits_only_used_slots() {
        let pool = PcbPool::new(4);
        let a = pool.allocate_pcb().unwrap();
        pool.with_pcb_mut(a, |pcb| pcb.pid = 11);
        let b = pool.allocate_pcb().unwrap();
        pool.with_pcb_mut(b, |pcb| pcb.pid = 22);
        pool.free_pcb(b);

        let mut pids = Vec::new();
        pool.for_each_live(|pcb| pids.push(pcb.pid));
        assert_eq!(pids, vec![11]);
    }
}
