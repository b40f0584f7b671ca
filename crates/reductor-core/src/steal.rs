//! Work stealing and load balancing.
//!
//! Victim selection uses a seeded `rand::rngs::StdRng` — deterministic
//! given a seed, so runs can be reproduced. Each core's RNG is private to
//! that core (no shared lock on the PRNG itself); only the narrow
//! `try_steal_from_cold_end` capability on the victim's `CoreScheduler` is
//! shared.

use rand::Rng;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::sync::Mutex;

use crate::constants::MAX_STEAL_ATTEMPTS;
use crate::pcb::ProcessId;
use crate::scheduler::CoreScheduler;

/// `select_victim_core(self, max_cores)`: a core id `!= self`,
/// pseudo-random but deterministic given `rng`. `-1` (`None`) if
/// `max_cores <= 1`.
pub fn select_victim_core(rng: &mut StdRng, self_core: usize, max_cores: usize) -> Option<usize> {
    if max_cores <= 1 {
        return None;
    }
    loop {
        let candidate = rng.random_range(0..max_cores);
        if candidate != self_core {
            return Some(candidate);
        }
    }
}

/// Per-core deterministic RNG state for victim selection, seeded once at
/// `CoreScheduler` construction time by `SchedulerState`.
pub struct StealRng {
    rng: Mutex<StdRng>,
}

impl StealRng {
    pub fn new(seed: u64) -> Self {
        StealRng {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    fn select_victim(&self, self_core: usize, max_cores: usize) -> Option<usize> {
        select_victim_core(&mut self.rng.lock().unwrap(), self_core, max_cores)
    }
}

/// `work_steal_process(core)`: pick a victim, atomically remove
/// a PCB from its cold end, retarget `scheduler_id` to the stealer. Tries a
/// bounded number of victims before giving up.
pub fn work_steal_process(
    pool: &crate::pool::PcbPool,
    cores: &[CoreScheduler],
    rng: &StealRng,
    self_core: usize,
) -> Option<ProcessId> {
    let max_cores = cores.len();
    for _ in 0..MAX_STEAL_ATTEMPTS.min(max_cores.saturating_sub(1).max(1)) {
        let victim_idx = rng.select_victim(self_core, max_cores)?;
        let victim = &cores[victim_idx];
        if let Some((priority, id)) = victim.try_steal_from_cold_end() {
            pool.with_pcb_mut(id, |pcb| {
                pcb.scheduler_id = self_core as u64;
                pcb.migration_count += 1;
            });
            cores[self_core].enqueue(priority, id);
            log::debug!("core {self_core} stole process {id:?} from core {victim_idx}");
            return Some(id);
        }
    }
    None
}

/// `load_balance_processes(core)`: if `core`'s queue depth
/// exceeds twice the average across all cores, shed half the surplus to
/// the most-idle peer. Best-effort; returns the number of PCBs moved.
pub fn load_balance_processes(
    pool: &crate::pool::PcbPool,
    cores: &[CoreScheduler],
    self_core: usize,
) -> usize {
    let total: usize = cores.iter().map(CoreScheduler::total_queued).sum();
    if cores.is_empty() {
        return 0;
    }
    let average = total as f64 / cores.len() as f64;
    let local = cores[self_core].total_queued();
    if (local as f64) <= average * 2.0 {
        return 0;
    }

    let Some((peer_idx, _)) = cores
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != self_core)
        .min_by_key(|(_, c)| c.total_queued())
    else {
        return 0;
    };

    let surplus = local - (average as usize);
    let to_move = surplus / 2;
    let mut moved = 0;
    for _ in 0..to_move {
        let Some((priority, id)) = cores[self_core].try_steal_from_cold_end() else {
            break;
        };
        pool.with_pcb_mut(id, |pcb| {
            pcb.scheduler_id = peer_idx as u64;
            pcb.migration_count += 1;
        });
        cores[peer_idx].enqueue(priority, id);
        moved += 1;
    }
    if moved > 0 {
        log::debug!("core {self_core} shed {moved} process(es) to core {peer_idx}");
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::Priority;
    use crate::pool::PcbPool;

    #[test]
    fn victim_is_never_self() {
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..100 {
            assert_ne!(select_victim_core(&mut rng, 3, 8), Some(3));
        }
    }

    #[test]
    fn single_core_has_no_victim() {
        let mut rng = StdRng::seed_from_u64(1);
        assert_eq!(select_victim_core(&mut rng, 0, 1), None);
    }

    #[test]
    fn steal_moves_a_process_and_retargets_it() {
        let pool = PcbPool::new(4);
        let cores = vec![CoreScheduler::new(0), CoreScheduler::new(1)];
        let rng = StealRng::new(42);

        let id = pool.allocate_pcb().unwrap();
        cores[1].enqueue(Priority::Normal, id);

        let stolen = work_steal_process(&pool, &cores, &rng, 0).unwrap();
        assert_eq!(stolen, id);
        assert_eq!(pool.with_pcb(id, |pcb| pcb.scheduler_id), Some(0));
        assert_eq!(cores[0].dequeue_highest().map(|(_, i)| i), Some(id));
    }

    #[test]
    fn steal_returns_none_when_nothing_stealable() {
        let pool = PcbPool::new(4);
        let cores = vec![CoreScheduler::new(0), CoreScheduler::new(1)];
        let rng = StealRng::new(7);
        assert_eq!(work_steal_process(&pool, &cores, &rng, 0), None);
    }
}
