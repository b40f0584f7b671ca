//! Top-level aggregate: the owning structure that ties one PCB pool, one
//! timer engine, one topology map, and a set of per-core schedulers into a
//! single runtime, plus the orchestration operations that need more than
//! one of those pieces at once (dispatch, yield, preemption).
//!
//! `SchedulerState` is the owning structure that `block.rs`/`steal.rs`
//! borrow from rather than duplicate state into.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::block::{self, WaitSets};
use crate::constants::MAX_CORES;
use crate::pcb::{Blocking, Pcb, Priority, ProcessId, ProcessState};
use crate::pool::PcbPool;
use crate::scheduler::CoreScheduler;
use crate::steal::{self, StealRng};
use crate::timer::TimerEngine;
use crate::topology::TopologyMap;

/// Constructor parameters for a [`SchedulerState`]. Grouping these in one
/// struct (rather than a growing positional-argument list) is the
/// equivalent of a runtime's configuration layer for a crate with no
/// persisted config file — values come from the embedding process, not a
/// TOML/env source, so there is nothing here for a `config` crate to load.
#[derive(Debug, Clone, Copy)]
pub struct SchedulerConfig {
    pub core_count: usize,
    pub pool_capacity: usize,
    pub timer_capacity: usize,
    /// Seed for each core's work-stealing RNG; core `i` is seeded with
    /// `rng_seed.wrapping_add(i as u64)` so runs are reproducible but each
    /// core's victim sequence differs.
    pub rng_seed: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        SchedulerConfig {
            core_count: 4,
            pool_capacity: 1024,
            timer_capacity: 1024,
            rng_seed: 0,
        }
    }
}

/// The full runtime: process pool, timer engine, topology, wait sets, and
/// one [`CoreScheduler`] + [`StealRng`] per core.
pub struct SchedulerState {
    pub pool: PcbPool,
    pub timers: TimerEngine,
    pub topology: TopologyMap,
    pub wait_sets: WaitSets,
    cores: Vec<CoreScheduler>,
    steal_rngs: Vec<StealRng>,
    tick: Mutex<u64>,
    steals: AtomicU64,
}

impl SchedulerState {
    /// `scheduler_state_init(max_cores)`: builds every owned piece fresh.
    /// `core_count` above `MAX_CORES` is clamped; `0` falls back to `1` so
    /// the runtime always has somewhere to dispatch to.
    pub fn init(config: SchedulerConfig) -> Self {
        let core_count = config.core_count.clamp(1, MAX_CORES);
        let cores = (0..core_count).map(CoreScheduler::new).collect();
        let steal_rngs = (0..core_count)
            .map(|i| StealRng::new(config.rng_seed.wrapping_add(i as u64)))
            .collect();
        let topology = TopologyMap::detect(core_count).unwrap_or_else(|| {
            TopologyMap::detect(1).expect("detect(1) always succeeds")
        });
        log::info!("scheduler state initialized with {core_count} core(s)");
        SchedulerState {
            pool: PcbPool::new(config.pool_capacity),
            timers: TimerEngine::new(config.timer_capacity),
            topology,
            wait_sets: WaitSets::new(),
            cores,
            steal_rngs,
            tick: Mutex::new(0),
            steals: AtomicU64::new(0),
        }
    }

    pub fn core_count(&self) -> usize {
        self.cores.len()
    }

    pub fn core(&self, core_id: usize) -> Option<&CoreScheduler> {
        self.cores.get(core_id)
    }

    /// Tear down: resets every core's queues and reduction counter. The
    /// pool and timer table are left for the caller to drop along with
    /// `self`; there is nothing to flush to disk (no persistence layer
    /// exists for this runtime).
    pub fn destroy(&self) {
        for core in &self.cores {
            core.reset();
        }
        log::info!("scheduler state destroyed");
    }

    /// `scheduler_schedule(core)`: if `core` has no current process, or its
    /// current process has run out of reductions, move that stale current
    /// process back to its priority queue (RUNNING→READY, unless it has
    /// already left RUNNING some other way, e.g. blocked or terminated),
    /// then pop the highest-priority ready PCB, mark it RUNNING, reset its
    /// reduction counter, and install it as current. If the core is
    /// already running something with reductions remaining, or its queues
    /// are all empty, the existing current process (possibly `None`) is
    /// returned unchanged.
    pub fn schedule(&self, core_id: usize) -> Option<ProcessId> {
        let core = self.cores.get(core_id)?;
        if let Some(current) = core.current_process() {
            if core.reduction_count() > 0 {
                return Some(current);
            }
            // Reductions ran out without going through `process_yield`'s
            // preemption path (e.g. a caller drove the counter to zero
            // directly) — requeue the stale current process ourselves so
            // it isn't silently dropped.
            let requeue_priority = self.pool.with_pcb_mut(current, |pcb| {
                if pcb.state() == ProcessState::Running {
                    pcb.set_state(ProcessState::Ready);
                    Some(pcb.priority())
                } else {
                    None
                }
            });
            core.set_current_process(None);
            if let Some(Some(priority)) = requeue_priority {
                core.enqueue(priority, current);
            }
        }
        let (_priority, id) = core.dequeue_highest()?;
        self.pool.with_pcb_mut(id, |pcb| {
            pcb.set_state(ProcessState::Running);
            pcb.scheduler_id = core_id as u64;
        })?;
        core.set_current_process(Some(id));
        core.reset_reductions();
        core.set_idle(false);
        log::debug!("core {core_id} dispatched process {id:?}");
        Some(id)
    }

    /// `process_yield(core)`: the current process voluntarily gives up the
    /// core before its reductions are exhausted. RUNNING → READY, moved to
    /// the tail of its own priority queue, core's current slot cleared, and
    /// the core's reduction counter reset to its default so the next
    /// dispatch starts with a full budget regardless of what triggered the
    /// yield. Returns `false` if the core had no current process.
    pub fn process_yield(&self, core_id: usize) -> bool {
        let Some(core) = self.cores.get(core_id) else {
            return false;
        };
        let Some(id) = core.current_process() else {
            return false;
        };
        let priority = self
            .pool
            .with_pcb_mut(id, |pcb| {
                pcb.set_state(ProcessState::Ready);
                pcb.priority()
            })
            .unwrap_or(Priority::Normal);
        core.set_current_process(None);
        core.enqueue(priority, id);
        core.reset_reductions();
        log::debug!("process {id:?} yielded on core {core_id}");
        true
    }

    /// `process_decrement_reductions_with_check(core)`: decrements the
    /// core's reduction counter and, if it has hit zero, preempts the
    /// current process (identical effect to `process_yield`, but driven by
    /// the reduction budget rather than a voluntary call). Returns `true`
    /// iff a preemption happened this call.
    pub fn process_decrement_reductions_with_check(&self, core_id: usize) -> bool {
        let Some(core) = self.cores.get(core_id) else {
            return false;
        };
        if core.decrement_reductions() > 0 {
            return false;
        }
        self.process_yield(core_id)
    }

    /// `process_preempt(core)`: unconditional forced preemption, regardless
    /// of remaining reductions — used by an external scheduling-quantum
    /// timer rather than the reduction counter itself.
    pub fn process_preempt(&self, core_id: usize) -> bool {
        self.process_yield(core_id)
    }

    /// `process_block_on_receive`/`_timer`/`_io`, routed
    /// through the owned pool/wait-sets/timers so callers don't have to
    /// assemble the pieces themselves.
    pub fn block_on_receive(&self, core_id: usize, id: ProcessId, pattern: u64) -> Option<()> {
        let core = self.cores.get(core_id)?;
        block::process_block_on_receive(&self.pool, core, &self.wait_sets, id, pattern)
    }

    pub fn block_on_timer(&self, core_id: usize, id: ProcessId, timeout_ticks: u64) -> Option<()> {
        let core = self.cores.get(core_id)?;
        block::process_block_on_timer(&self.pool, core, &self.wait_sets, &self.timers, id, timeout_ticks)
    }

    pub fn block_on_io(&self, core_id: usize, id: ProcessId, io_descriptor: u64) -> Option<()> {
        let core = self.cores.get(core_id)?;
        block::process_block_on_io(&self.pool, core, &self.wait_sets, id, io_descriptor)
    }

    pub fn wake(&self, core_id: usize, id: ProcessId) -> bool {
        let Some(core) = self.cores.get(core_id) else {
            return false;
        };
        block::process_wake(&self.pool, core, &self.wait_sets, id)
    }

    /// Advances the shared tick source by one and wakes any PCB whose
    /// timer has expired, re-enqueuing it on the core recorded in its own
    /// `scheduler_id` — the timer table itself has no per-core affiliation,
    /// so routing happens per-PCB rather than per iterated core.
    pub fn tick(&self) -> usize {
        *self.tick.lock().unwrap() += 1;
        self.timers.timer_tick();
        block::process_check_timer_wakeups(&self.pool, &self.cores, &self.wait_sets, &self.timers)
    }

    pub fn ticks(&self) -> u64 {
        *self.tick.lock().unwrap()
    }

    /// Attempt to steal one process onto `core_id` from a peer, using that
    /// core's own deterministic RNG.
    pub fn steal_for(&self, core_id: usize) -> Option<ProcessId> {
        let rng = self.steal_rngs.get(core_id)?;
        let stolen = steal::work_steal_process(&self.pool, &self.cores, rng, core_id);
        if stolen.is_some() {
            self.steals.fetch_add(1, Ordering::Relaxed);
        }
        stolen
    }

    /// Cumulative count of processes moved by [`Self::steal_for`] over the
    /// life of this runtime.
    pub fn steal_count(&self) -> u64 {
        self.steals.load(Ordering::Relaxed)
    }

    /// Best-effort load balancing pass from `core_id`'s perspective.
    pub fn load_balance_from(&self, core_id: usize) -> usize {
        steal::load_balance_processes(&self.pool, &self.cores, core_id)
    }

    /// Allocates a fresh PCB and places it RUNNABLE on the given core at
    /// the given priority — the common "spawn" path a caller uses to
    /// introduce a new process into the runtime.
    pub fn spawn(&self, core_id: usize, priority: Priority) -> Option<ProcessId> {
        let core = self.cores.get(core_id)?;
        let id = self.pool.allocate_pcb()?;
        self.pool.with_pcb_mut(id, |pcb: &mut Pcb| {
            pcb.scheduler_id = core_id as u64;
            pcb.set_priority(priority);
            pcb.set_state(ProcessState::Ready);
            pcb.set_blocking(Blocking::None);
        });
        core.enqueue(priority, id);
        log::debug!("spawned process {id:?} on core {core_id} at {priority:?}");
        Some(id)
    }

    /// Terminates a process: frees its PCB slot regardless of what state it
    /// was in (running, ready, or waiting), clearing it from whichever
    /// queue or wait set it currently occupies.
    pub fn terminate(&self, core_id: usize, id: ProcessId) -> bool {
        if let Some(core) = self.cores.get(core_id) {
            if core.current_process() == Some(id) {
                core.set_current_process(None);
            }
        }
        self.pool.free_pcb(id)
    }
}
