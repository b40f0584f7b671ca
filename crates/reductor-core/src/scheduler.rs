//! Per-core scheduler state.
//!
//! `CoreScheduler` owns exactly the state a core owns exclusively for
//! writes: its run queues, its current-process slot, and its reduction
//! counter. All three live behind one `Mutex` so that a cross-core reader
//! (work stealing) takes a single, short-lived lock rather than three.
//! Stealing is a narrow, typed capability: `steal.rs` calls into this
//! module's `try_steal` method, never reaching into the fields directly.

use std::sync::Mutex;

use crate::constants::{DEFAULT_REDUCTIONS, NUM_PRIORITIES};
use crate::pcb::{Priority, ProcessId};
use crate::queue::RunQueue;

struct Inner {
    current_process: Option<ProcessId>,
    reduction_count: u32,
    queues: [RunQueue; NUM_PRIORITIES],
    idle: bool,
    last_tick: u64,
}

/// One core's scheduling state. `core_id` is fixed at construction and
/// matches the index this scheduler is stored at in `SchedulerState`.
pub struct CoreScheduler {
    pub core_id: usize,
    inner: Mutex<Inner>,
}

impl CoreScheduler {
    /// `scheduler_init(core_id)`: zero the slot, set
    /// `reduction_count = DEFAULT_REDUCTIONS`, clear `current_process`.
    pub fn new(core_id: usize) -> Self {
        CoreScheduler {
            core_id,
            inner: Mutex::new(Inner {
                current_process: None,
                reduction_count: DEFAULT_REDUCTIONS,
                queues: Default::default(),
                idle: false,
                last_tick: 0,
            }),
        }
    }

    pub fn reset(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.current_process = None;
        inner.reduction_count = DEFAULT_REDUCTIONS;
        inner.queues = Default::default();
        inner.idle = false;
    }

    pub fn current_process(&self) -> Option<ProcessId> {
        self.inner.lock().unwrap().current_process
    }

    pub fn set_current_process(&self, id: Option<ProcessId>) {
        self.inner.lock().unwrap().current_process = id;
    }

    /// `scheduler_get_reduction_count(c)`.
    pub fn reduction_count(&self) -> u32 {
        self.inner.lock().unwrap().reduction_count
    }

    /// `scheduler_set_reduction_count(c,k)`.
    pub fn set_reduction_count(&self, k: u32) {
        self.inner.lock().unwrap().reduction_count = k;
    }

    /// `scheduler_decrement_reductions()`: saturating at zero.
    pub fn decrement_reductions(&self) -> u32 {
        let mut inner = self.inner.lock().unwrap();
        inner.reduction_count = inner.reduction_count.saturating_sub(1);
        inner.reduction_count
    }

    pub fn reset_reductions(&self) {
        self.inner.lock().unwrap().reduction_count = DEFAULT_REDUCTIONS;
    }

    /// `enqueue(priority, pcb)`.
    pub fn enqueue(&self, priority: Priority, id: ProcessId) {
        self.inner.lock().unwrap().queues[priority as usize].enqueue(id);
    }

    /// `dequeue()`: highest-priority non-empty queue first,
    /// strict priority order, no aging.
    pub fn dequeue_highest(&self) -> Option<(Priority, ProcessId)> {
        let mut inner = self.inner.lock().unwrap();
        for priority in Priority::ALL {
            if let Some(id) = inner.queues[priority as usize].dequeue() {
                return Some((priority, id));
            }
        }
        None
    }

    /// `queue_length(core, priority)`.
    pub fn queue_length(&self, priority: Priority) -> usize {
        self.inner.lock().unwrap().queues[priority as usize].len()
    }

    pub fn total_queued(&self) -> usize {
        let inner = self.inner.lock().unwrap();
        Priority::ALL.iter().map(|p| inner.queues[*p as usize].len()).sum()
    }

    pub fn is_idle(&self) -> bool {
        self.inner.lock().unwrap().idle
    }

    pub fn set_idle(&self, idle: bool) {
        self.inner.lock().unwrap().idle = idle;
    }

    pub fn tick_snapshot(&self) -> u64 {
        self.inner.lock().unwrap().last_tick
    }

    pub fn set_tick_snapshot(&self, tick: u64) {
        self.inner.lock().unwrap().last_tick = tick;
    }

    /// The narrow stealer capability: remove the tail PCB from
    /// this core's lowest-priority non-empty queue, for a peer core to
    /// retarget onto itself. Returns the priority the PCB was stolen from
    /// so the thief can re-enqueue it at the same priority.
    pub(crate) fn try_steal_from_cold_end(&self) -> Option<(Priority, ProcessId)> {
        let mut inner = self.inner.lock().unwrap();
        for priority in Priority::ALL.iter().rev() {
            if let Some(id) = inner.queues[*priority as usize].steal_from_tail() {
                return Some((*priority, id));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_sets_default_reductions() {
        let core = CoreScheduler::new(0);
        assert_eq!(core.reduction_count(), DEFAULT_REDUCTIONS);
        assert_eq!(core.current_process(), None);
    }

    #[test]
    fn decrement_floors_at_zero() {
        let core = CoreScheduler::new(0);
        core.set_reduction_count(2);
        core.decrement_reductions();
        core.decrement_reductions();
        core.decrement_reductions();
        assert_eq!(core.reduction_count(), 0);
    }

    #[test]
    fn set_then_get_round_trips_for_any_k() {
        let core = CoreScheduler::new(0);
        for k in [0, 1, 2000, u32::MAX] {
            core.set_reduction_count(k);
            assert_eq!(core.reduction_count(), k);
        }
    }

    #[test]
    fn dequeue_picks_highest_priority_first() {
        let core = CoreScheduler::new(0);
        core.enqueue(Priority::Low, crate::pcb::ProcessId::from_index(0));
        core.enqueue(Priority::High, crate::pcb::ProcessId::from_index(1));
        let (priority, id) = core.dequeue_highest().unwrap();
        assert_eq!(priority, Priority::High);
        assert_eq!(id.index(), 1);
    }
}
