//! # reductor-core
//!
//! A preemptive, user-space process scheduler in the style of the BEAM:
//! processes are plain data records (PCBs) dispatched by reduction count
//! rather than OS-level time slicing, with per-core run queues, a shared
//! timer engine for timeout-based blocking, and work stealing for load
//! balancing across cores.
//!
//! ## Quick start
//!
//! ```no_run
//! use reductor_core::{SchedulerConfig, SchedulerState, Priority};
//!
//! let state = SchedulerState::init(SchedulerConfig::default());
//! let pid = state.spawn(0, Priority::Normal).unwrap();
//! assert_eq!(state.schedule(0), Some(pid));
//! ```
//!
//! ## Architecture
//!
//! `SchedulerState` owns one [`PcbPool`](pool::PcbPool) (a fixed-capacity
//! slab of 512-byte process control blocks), one
//! [`TimerEngine`](timer::TimerEngine), a [`TopologyMap`](topology::TopologyMap),
//! and one [`CoreScheduler`](scheduler::CoreScheduler) per core. Processes
//! move between three states — READY, RUNNING, WAITING — driven by
//! `schedule`/`process_yield`/`process_decrement_reductions_with_check`
//! (voluntary and reduction-count-driven preemption) and
//! `block_on_*`/`wake` (blocking and wakeup). Idle cores pull work from
//! busier peers via `steal_for`/`load_balance_from`.

pub mod alloc;
pub mod block;
pub mod constants;
pub mod page;
pub mod pcb;
pub mod pool;
pub mod queue;
pub mod runtime;
pub mod scheduler;
pub mod stats;
pub mod steal;
pub mod timer;
pub mod topology;

pub use block::WaitSets;
pub use pcb::{Blocking, BlockingReasonTag, Pcb, Priority, ProcessId, ProcessState};
pub use pool::PcbPool;
pub use queue::RunQueue;
pub use runtime::{SchedulerConfig, SchedulerState};
pub use scheduler::CoreScheduler;
pub use stats::{CoreStats, SchedulerStats};
pub use timer::{TimerEngine, TimerId};
pub use topology::{CoreType, ProcessType, TopologyMap};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
