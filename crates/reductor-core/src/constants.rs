//! Stable, contractual constants. Values here are part of the external
//! interface — changing them changes the wire/offset contract,
//! not just an internal tuning knob.

/// Ceiling on the number of cores the runtime can ever address. Individual
/// `SchedulerState`s may run with fewer (see `SchedulerState::init`).
pub const MAX_CORES: usize = 128;

/// Number of distinct priority levels (`Priority::LOW..=Priority::MAX`).
pub const NUM_PRIORITIES: usize = 4;

/// Reduction budget assigned to a process each time it is dispatched.
pub const DEFAULT_REDUCTIONS: u32 = 2000;

/// Fixed stride, in bytes, of a PCB's documented binary layout.
pub const PCB_STRIDE: usize = 512;

/// Required alignment of PCB pool slot addresses.
pub const PCB_ALIGN: usize = 512;

/// Number of general-purpose register slots captured in a PCB's saved
/// execution context.
pub const NUM_REGISTERS: usize = 31;

/// Soft cap on entries a single per-priority run queue is expected to carry
/// under normal load; used only for diagnostics (queue depth reporting), not
/// enforced as a hard limit.
pub const PRIORITY_QUEUE_SIZE: usize = 4096;

/// Approximate in-memory footprint of one core's scheduler state, used only
/// for diagnostics/telemetry sizing, not for any allocation decision.
pub const SCHEDULER_SIZE: usize = 4096;

/// Ceiling, in ticks, on how far in the future a timer-based block may be
/// scheduled. Requests beyond this are clamped, not rejected.
pub const MAX_BLOCKING_TIME: u64 = 1_000_000;

/// Cache line size reported by `topology::get_cache_line_size_apple_silicon`.
pub const APPLE_SILICON_CACHE_LINE: usize = 128;

/// Bound on victim attempts a single `work_steal_process` call will make
/// before giving up: at most one probe per core.
pub const MAX_STEAL_ATTEMPTS: usize = 8;

/// Per-call cap on pool expansion size, in pages ("blocks").
pub const MAX_EXPANSION_BLOCKS: usize = 1024;

/// Lifetime cap on total bytes a pool may expand by.
pub const MAX_EXPANSION_BYTES: usize = 1024 * 1024;
