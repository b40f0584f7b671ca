//! A battery of named checks covering the scheduler's invariants, laws,
//! and end-to-end scenarios.
//!
//! Each check is a self-contained function that builds whatever runtime
//! state it needs, exercises one property, and returns a [`CheckResult`].
//! `run_all_checks` runs the whole battery; `reductor check` drives it from
//! the CLI and maps an all-pass result onto process exit code 0.

use reductor_core::page::{PageSource, expand_memory_pool};
use reductor_core::{
    Blocking, Pcb, Priority, ProcessState, SchedulerConfig, SchedulerState, TimerEngine,
};

/// Outcome of one named check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: String,
    pub passed: bool,
    pub details: String,
}

fn pass(name: &str, details: impl Into<String>) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        passed: true,
        details: details.into(),
    }
}

fn fail(name: &str, details: impl Into<String>) -> CheckResult {
    CheckResult {
        name: name.to_string(),
        passed: false,
        details: details.into(),
    }
}

fn check(name: &str, condition: bool, details: impl Into<String>) -> CheckResult {
    if condition {
        pass(name, details)
    } else {
        fail(name, details)
    }
}

fn small_state(core_count: usize) -> SchedulerState {
    SchedulerState::init(SchedulerConfig {
        core_count,
        pool_capacity: 8,
        timer_capacity: 8,
        rng_seed: 7,
    })
}

// ---------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------

/// Scenario 1: free-then-allocate reuses the same slot.
pub fn scenario_pcb_reuse() -> CheckResult {
    let state = small_state(1);
    let p1 = state.spawn(0, Priority::Normal).unwrap();
    assert!(state.terminate(0, p1));
    let p2 = state.spawn(0, Priority::Normal).unwrap();
    check(
        "scenario: PCB reuse",
        p1 == p2,
        format!("p1={p1:?}, p2={p2:?}"),
    )
}

/// Scenario 2: the pool reports full at capacity, and recovers after a free.
pub fn scenario_pool_exhaustion() -> CheckResult {
    let state = small_state(1);
    let capacity = state.pool.capacity();
    let ids: Vec<_> = (0..capacity)
        .filter_map(|_| state.pool.allocate_pcb())
        .collect();
    if ids.len() != capacity {
        return fail(
            "scenario: pool exhaustion",
            format!("expected {capacity} allocations, got {}", ids.len()),
        );
    }
    let overflow = state.pool.allocate_pcb();
    let recovered = state.pool.free_pcb(ids[0]) && state.pool.allocate_pcb().is_some();
    check(
        "scenario: pool exhaustion",
        overflow.is_none() && recovered,
        format!("capacity={capacity}, overflow={overflow:?}, recovered={recovered}"),
    )
}

/// Scenario 3: decrementing past zero floors at zero, never underflows.
pub fn scenario_reduction_decrement_floor() -> CheckResult {
    let state = small_state(1);
    let core = state.core(0).unwrap();
    core.set_reduction_count(2);
    core.decrement_reductions();
    core.decrement_reductions();
    core.decrement_reductions();
    check(
        "scenario: reduction decrement floor",
        core.reduction_count() == 0,
        format!("final={}", core.reduction_count()),
    )
}

/// Scenario 4: setting one core's reduction count never perturbs its peers.
pub fn scenario_cross_core_isolation() -> CheckResult {
    let state = small_state(4);
    let values = [100, 200, 300, 400];
    for (i, v) in values.iter().enumerate() {
        state.core(i).unwrap().set_reduction_count(*v);
    }
    state.core(1).unwrap().set_reduction_count(250);
    let after: Vec<u32> = (0..4).map(|i| state.core(i).unwrap().reduction_count()).collect();
    let unaffected = after[0] == 100 && after[2] == 300 && after[3] == 400 && after[1] == 250;
    check(
        "scenario: cross-core isolation",
        unaffected,
        format!("{after:?}"),
    )
}

/// Scenario 5: a voluntary yield clears the current slot, moves the
/// process to READY, and resets the core's reduction budget.
pub fn scenario_voluntary_yield() -> CheckResult {
    let state = small_state(1);
    let id = state.spawn(0, Priority::Normal).unwrap();
    state.schedule(0);
    state.core(0).unwrap().set_reduction_count(5);
    let yielded = state.process_yield(0);
    let current_cleared = state.core(0).unwrap().current_process().is_none();
    let ready = state.pool.with_pcb(id, |p| p.state()) == Some(ProcessState::Ready);
    let reset = state.core(0).unwrap().reduction_count() == reductor_core::constants::DEFAULT_REDUCTIONS;
    check(
        "scenario: voluntary yield",
        yielded && current_cleared && ready && reset,
        format!("yielded={yielded}, current_cleared={current_cleared}, ready={ready}, reset={reset}"),
    )
}

/// Scenario 6: the canonical Apple-silicon topology classification.
pub fn scenario_apple_silicon_topology() -> CheckResult {
    use reductor_core::topology::{get_cache_line_size_apple_silicon, get_core_type_apple_silicon};
    use reductor_core::CoreType;

    let performance = get_core_type_apple_silicon(0) == CoreType::Performance;
    let efficiency = get_core_type_apple_silicon(8) == CoreType::Efficiency;
    let unknown = get_core_type_apple_silicon(128) == CoreType::Unknown;
    let cache_line = get_cache_line_size_apple_silicon() == 128;

    let empty_map = reductor_core::TopologyMap::detect(0).is_none();
    let map = reductor_core::TopologyMap::detect(16).unwrap();
    let populated = map.cluster(0) == 0 && map.cluster(8) == 1;

    let ok = performance && efficiency && unknown && cache_line && empty_map && populated;
    check(
        "scenario: Apple-silicon topology",
        ok,
        format!(
            "performance={performance}, efficiency={efficiency}, unknown={unknown}, \
             cache_line={cache_line}, empty_map_rejected={empty_map}, populated={populated}"
        ),
    )
}

/// Scenario 7: a timer cancel is effective once and idempotent thereafter;
/// cancelling id 0 is always a no-op.
pub fn scenario_timer_cancel() -> CheckResult {
    let engine = TimerEngine::new(8);
    let id = engine.insert_timer(1000, None, 1);
    let first = engine.cancel_timer(id);
    let second = engine.cancel_timer(id);
    let zero = engine.cancel_timer(0);
    check(
        "scenario: timer cancel",
        first && !second && !zero,
        format!("first={first}, second={second}, zero={zero}"),
    )
}

/// Scenario 8: pool expansion succeeds when the new mapping abuts the
/// pool's current end, and fails (unmapping cleanly) otherwise.
pub fn scenario_contiguous_pool_expansion() -> CheckResult {
    struct Scripted(usize);
    impl PageSource for Scripted {
        fn map_pages(&self, bytes: usize) -> Option<usize> {
            if bytes == 0 { None } else { Some(self.0) }
        }
        fn unmap_pages(&self, _addr: usize, _bytes: usize) {}
    }

    let contiguous = Scripted(0x4000);
    let succeeded = expand_memory_pool(&contiguous, 0x4000, 4096, 1);

    let non_contiguous = Scripted(0x9000);
    let rejected = !expand_memory_pool(&non_contiguous, 0x4000, 4096, 1);

    check(
        "scenario: contiguous pool expansion",
        succeeded && rejected,
        format!("succeeded={succeeded}, rejected_non_contiguous={rejected}"),
    )
}

// ---------------------------------------------------------------------
// Quantified invariants
// ---------------------------------------------------------------------

/// A live PCB is in exactly one of: free, on a run queue, current on a
/// core, or in a wait set. This check drives one PCB through all three
/// live locations and confirms no two ever hold it simultaneously.
pub fn invariant_pcb_exclusive_location() -> CheckResult {
    let state = small_state(1);
    let id = state.spawn(0, Priority::Normal).unwrap();
    let on_queue = state.core(0).unwrap().total_queued() == 1
        && state.core(0).unwrap().current_process().is_none();

    state.schedule(0);
    let is_current = state.core(0).unwrap().current_process() == Some(id)
        && state.core(0).unwrap().total_queued() == 0;

    state.block_on_io(0, id, 1).unwrap();
    let is_waiting = state.pool.with_pcb(id, |p| p.state()) == Some(ProcessState::Waiting)
        && state.core(0).unwrap().current_process().is_none();

    state.wake(0, id);
    let back_on_queue = state.core(0).unwrap().total_queued() == 1;

    let ok = on_queue && is_current && is_waiting && back_on_queue;
    check(
        "invariant: PCB occupies exactly one location",
        ok,
        format!(
            "on_queue={on_queue}, is_current={is_current}, is_waiting={is_waiting}, \
             back_on_queue={back_on_queue}"
        ),
    )
}

/// A core's reduction count never leaves `[0, DEFAULT_REDUCTIONS]` across
/// a sequence of decrements and a yield-driven reset.
pub fn invariant_reduction_count_bounded() -> CheckResult {
    let state = small_state(1);
    state.spawn(0, Priority::Normal).unwrap();
    state.schedule(0);
    let mut in_bounds = true;
    for _ in 0..(reductor_core::constants::DEFAULT_REDUCTIONS + 10) {
        state.process_decrement_reductions_with_check(0);
        let k = state.core(0).unwrap().reduction_count();
        in_bounds &= k <= reductor_core::constants::DEFAULT_REDUCTIONS;
    }
    check(
        "invariant: reduction_count stays in [0, DEFAULT_REDUCTIONS]",
        in_bounds,
        "decremented past exhaustion repeatedly",
    )
}

/// A bump allocator's cursor never exceeds its limit, and the sum of
/// successful allocation sizes equals `cursor - base`.
pub fn invariant_bump_cursor_bounded() -> CheckResult {
    use reductor_core::alloc::process_allocate_heap;

    let mut pcb = Pcb::zeroed();
    pcb.heap_base = 0x1000;
    pcb.heap_pointer = 0x1000;
    pcb.heap_limit = 0x1000 + 64;

    let mut allocated = 0u64;
    while process_allocate_heap(Some(&mut pcb), 7).is_some() {
        allocated += 8; // 7 rounds up to 8
    }
    let never_exceeded = pcb.heap_pointer <= pcb.heap_limit;
    let sums_match = pcb.heap_pointer - pcb.heap_base == allocated;
    check(
        "invariant: bump cursor never exceeds limit",
        never_exceeded && sums_match,
        format!("allocated={allocated}, cursor-base={}", pcb.heap_pointer - pcb.heap_base),
    )
}

/// If the highest non-empty priority queue is `Max`, the next dispatch
/// picks a `Max`-priority process, regardless of what else is queued.
pub fn invariant_priority_dispatch_order() -> CheckResult {
    let state = small_state(1);
    state.spawn(0, Priority::Low).unwrap();
    state.spawn(0, Priority::Normal).unwrap();
    let high = state.spawn(0, Priority::Max).unwrap();
    let dispatched = state.schedule(0);
    check(
        "invariant: priority-ordered dispatch",
        dispatched == Some(high),
        format!("dispatched={dispatched:?}, expected={high:?}"),
    )
}

// ---------------------------------------------------------------------
// Laws
// ---------------------------------------------------------------------

/// `scheduler_set_reduction_count(c, k)` then
/// `scheduler_get_reduction_count(c) == k`, for several `k`.
pub fn law_reduction_count_round_trips() -> CheckResult {
    let state = small_state(1);
    let core = state.core(0).unwrap();
    let mut ok = true;
    for k in [0u32, 1, 2000, u32::MAX] {
        core.set_reduction_count(k);
        ok &= core.reduction_count() == k;
    }
    check("law: set/get reduction count round-trips", ok, "k in {0, 1, 2000, u32::MAX}")
}

/// Decrementing N times from value `v` lands at `max(0, v - N)`.
pub fn law_decrement_saturates_at_floor() -> CheckResult {
    let state = small_state(1);
    let core = state.core(0).unwrap();
    let v = 7u32;
    let n = 10u32;
    core.set_reduction_count(v);
    for _ in 0..n {
        core.decrement_reductions();
    }
    let expected = v.saturating_sub(n);
    check(
        "law: decrement N times lands at max(0, v-N)",
        core.reduction_count() == expected,
        format!("v={v}, n={n}, got={}, expected={expected}", core.reduction_count()),
    )
}

/// `insert_timer` then `cancel_timer(id)` means the id never fires.
pub fn law_cancelled_timer_never_fires() -> CheckResult {
    let engine = TimerEngine::new(8);
    let id = engine.insert_timer(5, None, 1);
    engine.cancel_timer(id);
    for _ in 0..20 {
        engine.timer_tick();
    }
    check(
        "law: cancelled timer never fires",
        engine.process_timers() == 0,
        "ticked 20 times past expiry after cancel",
    )
}

/// `allocate_pcb` then `free_pcb` is idempotent on pool state; the
/// immediately following `allocate_pcb` returns the same id.
pub fn law_alloc_free_alloc_idempotent() -> CheckResult {
    let state = small_state(1);
    let used_before = state.pool.used_count();
    let p1 = state.pool.allocate_pcb().unwrap();
    state.pool.free_pcb(p1);
    let used_after_round_trip = state.pool.used_count();
    let p2 = state.pool.allocate_pcb().unwrap();
    check(
        "law: alloc/free/alloc is idempotent on pool state",
        used_before == used_after_round_trip && p1 == p2,
        format!("used_before={used_before}, used_after={used_after_round_trip}, p1={p1:?}, p2={p2:?}"),
    )
}

/// Blocking then waking round-trips a process back onto its priority
/// queue with its original priority intact.
pub fn law_block_wake_preserves_priority() -> CheckResult {
    let state = small_state(1);
    let id = state.spawn(0, Priority::High).unwrap();
    state.schedule(0);
    state.block_on_receive(0, id, 0xBEEF).unwrap();
    let waiting = state.pool.with_pcb(id, |p| p.blocking()) == Some(Blocking::Receive { pattern: 0xBEEF });
    state.wake(0, id);
    let dispatched_priority = state
        .pool
        .with_pcb(id, |p| p.priority())
        .filter(|_| state.schedule(0) == Some(id));
    check(
        "law: block/wake round-trips priority",
        waiting && dispatched_priority == Some(Priority::High),
        format!("waiting={waiting}, dispatched_priority={dispatched_priority:?}"),
    )
}

/// Runs every check in the battery.
pub fn run_all_checks() -> Vec<CheckResult> {
    vec![
        scenario_pcb_reuse(),
        scenario_pool_exhaustion(),
        scenario_reduction_decrement_floor(),
        scenario_cross_core_isolation(),
        scenario_voluntary_yield(),
        scenario_apple_silicon_topology(),
        scenario_timer_cancel(),
        scenario_contiguous_pool_expansion(),
        invariant_pcb_exclusive_location(),
        invariant_reduction_count_bounded(),
        invariant_bump_cursor_bounded(),
        invariant_priority_dispatch_order(),
        law_reduction_count_round_trips(),
        law_decrement_saturates_at_floor(),
        law_cancelled_timer_never_fires(),
        law_alloc_free_alloc_idempotent(),
        law_block_wake_preserves_priority(),
    ]
}

/// Fraction of checks that passed, in `[0.0, 1.0]`.
pub fn pass_rate(results: &[CheckResult]) -> f64 {
    if results.is_empty() {
        return 0.0;
    }
    let passed = results.iter().filter(|r| r.passed).count();
    passed as f64 / results.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_check_passes() {
        let results = run_all_checks();
        for r in &results {
            assert!(r.passed, "{}: {}", r.name, r.details);
        }
    }

    #[test]
    fn pass_rate_of_all_passing_is_one() {
        let results = run_all_checks();
        assert_eq!(pass_rate(&results), 1.0);
    }

    #[test]
    fn pass_rate_handles_empty() {
        assert_eq!(pass_rate(&[]), 0.0);
    }

    #[test]
    fn battery_has_full_coverage() {
        assert_eq!(run_all_checks().len(), 17);
    }
}
