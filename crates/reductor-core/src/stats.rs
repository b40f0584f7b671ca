//! A read-only diagnostics snapshot of the runtime: process counts per
//! state/priority/core, cumulative steal count, and active timer count.
//! Capturing a snapshot has no effect on scheduling behavior — it exists
//! for callers that want to print or export a health check.

use crate::constants::NUM_PRIORITIES;
use crate::pcb::{Priority, ProcessState};
use crate::runtime::SchedulerState;

/// One core's contribution to a [`SchedulerStats`] snapshot.
#[derive(Debug, Clone, Copy)]
pub struct CoreStats {
    pub core_id: usize,
    pub queued: usize,
    pub idle: bool,
    pub reduction_count: u32,
}

/// A point-in-time snapshot of the whole runtime.
#[derive(Debug, Clone)]
pub struct SchedulerStats {
    pub process_count: usize,
    pub ready: usize,
    pub running: usize,
    pub waiting: usize,
    pub per_priority: [usize; NUM_PRIORITIES],
    pub per_core: Vec<CoreStats>,
    pub steals: u64,
    pub active_timers: usize,
}

impl SchedulerStats {
    /// Walks every live PCB once, plus each core's queue depth/idle flag
    /// and the timer table's current size.
    pub fn capture(state: &SchedulerState) -> Self {
        let mut process_count = 0;
        let mut ready = 0;
        let mut running = 0;
        let mut waiting = 0;
        let mut per_priority = [0usize; NUM_PRIORITIES];

        state.pool.for_each_live(|pcb| {
            process_count += 1;
            match pcb.state() {
                ProcessState::Ready => ready += 1,
                ProcessState::Running => running += 1,
                ProcessState::Waiting => waiting += 1,
            }
            per_priority[pcb.priority() as usize] += 1;
        });

        let per_core = (0..state.core_count())
            .filter_map(|core_id| {
                let core = state.core(core_id)?;
                Some(CoreStats {
                    core_id,
                    queued: core.total_queued(),
                    idle: core.is_idle(),
                    reduction_count: core.reduction_count(),
                })
            })
            .collect();

        SchedulerStats {
            process_count,
            ready,
            running,
            waiting,
            per_priority,
            per_core,
            steals: state.steal_count(),
            active_timers: state.timers.len(),
        }
    }

    pub fn priority_count(&self, priority: Priority) -> usize {
        self.per_priority[priority as usize]
    }
}
