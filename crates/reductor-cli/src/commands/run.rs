use reductor_core::{Priority, SchedulerConfig, SchedulerState, SchedulerStats};

pub struct RunCommandConfig {
    pub cores: usize,
    pub processes: usize,
    pub ticks: u64,
    pub seed: u64,
}

/// Drives a small synthetic workload through the runtime: spawns
/// `processes` ready-to-run PCBs spread round-robin across `cores`, then
/// alternates dispatch/steal/tick for `ticks` rounds, printing a summary
/// of how many processes were dispatched and how many migrated cores via
/// work stealing.
pub fn run(config: RunCommandConfig) {
    let state = SchedulerState::init(SchedulerConfig {
        core_count: config.cores.max(1),
        pool_capacity: (config.processes * 2).max(16),
        timer_capacity: 64,
        rng_seed: config.seed,
    });

    for i in 0..config.processes {
        let core_id = i % state.core_count();
        let priority = match i % 4 {
            0 => Priority::Max,
            1 => Priority::High,
            2 => Priority::Normal,
            _ => Priority::Low,
        };
        if state.spawn(core_id, priority).is_none() {
            log::warn!("pool exhausted after spawning {i} process(es)");
            break;
        }
    }

    let mut dispatched = 0u64;
    for round in 0..config.ticks {
        for core_id in 0..state.core_count() {
            if state.schedule(core_id).is_some() {
                dispatched += 1;
                state.process_yield(core_id);
            } else {
                state.steal_for(core_id);
            }
        }
        state.tick();
        log::debug!("round {round} complete: dispatched={dispatched}");
    }

    let stats = SchedulerStats::capture(&state);
    println!("cores: {}", state.core_count());
    println!("processes spawned: {}", config.processes);
    println!("dispatch events: {dispatched}");
    println!("steal events: {}", stats.steals);
    println!(
        "processes: {} (ready={}, running={}, waiting={})",
        stats.process_count, stats.ready, stats.running, stats.waiting
    );
    println!("active timers: {}", stats.active_timers);
    for core in &stats.per_core {
        println!(
            "  core {}: queued={}, idle={}, reductions={}",
            core.core_id, core.queued, core.idle, core.reduction_count
        );
    }
}
