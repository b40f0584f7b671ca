//! Blocking and wake.
//!
//! Wait sets are grouped by [`BlockingReasonTag`] behind one `Mutex`: a set
//! of process ids guarded independently of the PCB data they gate.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use crate::pcb::{Blocking, BlockingReasonTag, ProcessId, ProcessState};
use crate::pool::PcbPool;
use crate::scheduler::CoreScheduler;
use crate::timer::TimerEngine;

fn tag_of(blocking: Blocking) -> BlockingReasonTag {
    match blocking {
        Blocking::None => BlockingReasonTag::None,
        Blocking::Receive { .. } => BlockingReasonTag::Receive,
        Blocking::Timer { .. } => BlockingReasonTag::Timer,
        Blocking::Io { .. } => BlockingReasonTag::Io,
    }
}

/// The wait sets a PCB lives in while `state == WAITING`.
#[derive(Default)]
pub struct WaitSets {
    sets: Mutex<HashMap<BlockingReasonTag, HashSet<ProcessId>>>,
}

impl WaitSets {
    pub fn new() -> Self {
        WaitSets::default()
    }

    fn insert(&self, tag: BlockingReasonTag, id: ProcessId) {
        self.sets.lock().unwrap().entry(tag).or_default().insert(id);
    }

    fn remove(&self, tag: BlockingReasonTag, id: ProcessId) {
        if let Some(set) = self.sets.lock().unwrap().get_mut(&tag) {
            set.remove(&id);
        }
    }

    pub fn len(&self, tag: BlockingReasonTag) -> usize {
        self.sets
            .lock()
            .unwrap()
            .get(&tag)
            .map(HashSet::len)
            .unwrap_or(0)
    }
}

/// `process_block(core, pcb, reason)`: RUNNING → WAITING,
/// cleared from the current slot, recorded in the wait set for `reason`.
/// Always returns `None`, matching the other state-transition operations'
/// sentinel-return convention.
pub fn process_block(
    pool: &PcbPool,
    core: &CoreScheduler,
    wait_sets: &WaitSets,
    id: ProcessId,
    blocking: Blocking,
) -> Option<()> {
    pool.with_pcb_mut(id, |pcb| {
        pcb.set_state(ProcessState::Waiting);
        pcb.set_blocking(blocking);
    })?;
    if core.current_process() == Some(id) {
        core.set_current_process(None);
    }
    wait_sets.insert(tag_of(blocking), id);
    log::debug!("process {id:?} blocked on {:?}", tag_of(blocking));
    None
}

/// `process_block_on_receive(core, pcb, pattern)`. Matching
/// against `pattern` is external to this crate.
pub fn process_block_on_receive(
    pool: &PcbPool,
    core: &CoreScheduler,
    wait_sets: &WaitSets,
    id: ProcessId,
    pattern: u64,
) -> Option<()> {
    process_block(pool, core, wait_sets, id, Blocking::Receive { pattern })
}

/// `process_block_on_timer(core, pcb, timeout_ticks)`: computes
/// a clamped `wake_time` and inserts a timer that will wake this PCB.
pub fn process_block_on_timer(
    pool: &PcbPool,
    core: &CoreScheduler,
    wait_sets: &WaitSets,
    timers: &TimerEngine,
    id: ProcessId,
    timeout_ticks: u64,
) -> Option<()> {
    let wake_time = timers.clamp_wake_time(timeout_ticks);
    process_block(pool, core, wait_sets, id, Blocking::Timer { wake_time })?;
    timers.insert_timer(timeout_ticks, None, id.to_raw());
    None
}

/// `process_block_on_io(core, pcb, io_descriptor)`. Wake is
/// driven externally (e.g. by an I/O completion callback invoking
/// `process_wake` directly).
pub fn process_block_on_io(
    pool: &PcbPool,
    core: &CoreScheduler,
    wait_sets: &WaitSets,
    id: ProcessId,
    io_descriptor: u64,
) -> Option<()> {
    process_block(
        pool,
        core,
        wait_sets,
        id,
        Blocking::Io {
            descriptor: io_descriptor,
        },
    )
}

/// `process_wake(core, pcb)`: WAITING → READY, cleared
/// `blocking_reason`, enqueued at the tail of its priority queue on
/// `core`. Returns `true` iff the PCB was WAITING.
pub fn process_wake(pool: &PcbPool, core: &CoreScheduler, wait_sets: &WaitSets, id: ProcessId) -> bool {
    let transitioned = pool.with_pcb_mut(id, |pcb| {
        if pcb.state() != ProcessState::Waiting {
            return None;
        }
        let tag = tag_of(pcb.blocking());
        pcb.set_state(ProcessState::Ready);
        pcb.set_blocking(Blocking::None);
        Some((tag, pcb.priority()))
    });
    match transitioned.flatten() {
        Some((tag, priority)) => {
            wait_sets.remove(tag, id);
            core.enqueue(priority, id);
            log::debug!("process {id:?} woken, re-enqueued at {priority:?}");
            true
        }
        None => false,
    }
}

/// `process_check_timer_wakeups(cores)`: drains every expired timer in the
/// system and wakes its associated PCB on the core recorded in that PCB's
/// own `scheduler_id` — not the core it happens to be iterated from —
/// since `TimerEngine::expire` has no per-core affiliation of its own.
/// Returns the count woken.
pub fn process_check_timer_wakeups(
    pool: &PcbPool,
    cores: &[CoreScheduler],
    wait_sets: &WaitSets,
    timers: &TimerEngine,
) -> usize {
    let expired = timers.expire(None);
    let mut woken = 0;
    for raw in expired {
        let Some(id) = ProcessId::from_raw(raw) else {
            continue;
        };
        let Some(scheduler_id) = pool.with_pcb(id, |pcb| pcb.scheduler_id) else {
            continue;
        };
        let Some(core) = cores.get(scheduler_id as usize) else {
            continue;
        };
        if process_wake(pool, core, wait_sets, id) {
            woken += 1;
        }
    }
    woken
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::Priority;

    #[test]
    fn block_then_wake_round_trips() {
        let pool = PcbPool::new(4);
        let core = CoreScheduler::new(0);
        let waits = WaitSets::new();
        let id = pool.allocate_pcb().unwrap();
        pool.with_pcb_mut(id, |pcb| pcb.set_priority(Priority::High));
        core.set_current_process(Some(id));

        assert_eq!(
            process_block(&pool, &core, &waits, id, Blocking::Io { descriptor: 7 }),
            None
        );
        assert_eq!(core.current_process(), None);
        assert_eq!(
            pool.with_pcb(id, |pcb| pcb.state()),
            Some(ProcessState::Waiting)
        );

        assert!(process_wake(&pool, &core, &waits, id));
        assert_eq!(
            pool.with_pcb(id, |pcb| pcb.state()),
            Some(ProcessState::Ready)
        );
        assert_eq!(core.dequeue_highest().map(|(p, _)| p), Some(Priority::High));
    }

    #[test]
    fn wake_of_non_waiting_pcb_fails() {
        let pool = PcbPool::new(4);
        let core = CoreScheduler::new(0);
        let waits = WaitSets::new();
        let id = pool.allocate_pcb().unwrap();
        assert!(!process_wake(&pool, &core, &waits, id));
    }

    #[test]
    fn timer_block_wakes_after_expiry() {
        let pool = PcbPool::new(4);
        let cores = vec![CoreScheduler::new(0)];
        let waits = WaitSets::new();
        let timers = TimerEngine::new(16);
        let id = pool.allocate_pcb().unwrap();
        pool.with_pcb_mut(id, |pcb| pcb.scheduler_id = 0);

        process_block_on_timer(&pool, &cores[0], &waits, &timers, id, 5).unwrap();
        assert_eq!(process_check_timer_wakeups(&pool, &cores, &waits, &timers), 0);

        for _ in 0..5 {
            timers.timer_tick();
        }
        assert_eq!(process_check_timer_wakeups(&pool, &cores, &waits, &timers), 1);
        assert_eq!(
            pool.with_pcb(id, |pcb| pcb.state()),
            Some(ProcessState::Ready)
        );
    }

    #[test]
    fn timer_wakeup_routes_to_the_pcbs_own_core_not_the_iterated_one() {
        let pool = PcbPool::new(4);
        let cores = vec![CoreScheduler::new(0), CoreScheduler::new(1)];
        let waits = WaitSets::new();
        let timers = TimerEngine::new(16);
        let id = pool.allocate_pcb().unwrap();
        pool.with_pcb_mut(id, |pcb| pcb.scheduler_id = 1);

        process_block_on_timer(&pool, &cores[1], &waits, &timers, id, 2).unwrap();
        for _ in 0..2 {
            timers.timer_tick();
        }
        assert_eq!(process_check_timer_wakeups(&pool, &cores, &waits, &timers), 1);
        assert_eq!(cores[0].dequeue_highest(), None, "core 0 must not receive it");
        assert_eq!(cores[1].dequeue_highest().map(|(_, woken_id)| woken_id), Some(id));
    }
}
