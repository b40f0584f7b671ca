//! The Process Control Block: a fixed 512-byte record describing one
//! lightweight process.
//!
//! The struct below is laid out with `#[repr(C)]` in the exact field order
//! of the documented offset table so that its size and per-field offsets
//! are pinned by the `layout` tests at the bottom of this file. The blocking
//! reason is a tagged sum (`blocking_reason` + its payload) that stays
//! as plain fixed-width words here — a Rust enum-with-payload would not
//! preserve the contractual per-offset layout — and get an ergonomic,
//! typed view via [`Pcb::blocking`] / [`Pcb::set_blocking`] instead.

use std::num::NonZeroU64;

use crate::constants::NUM_REGISTERS;

/// Identifies a live PCB by its pool slot. Backed by a `NonZeroU64` (the
/// slot index plus one) so that `Option<ProcessId>` costs no extra space —
/// required for `next`/`prev` to fit their 8-byte field width.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProcessId(NonZeroU64);

impl ProcessId {
    pub(crate) fn from_index(index: usize) -> Self {
        ProcessId(NonZeroU64::new(index as u64 + 1).expect("index + 1 is never zero"))
    }

    pub fn index(self) -> usize {
        (self.0.get() - 1) as usize
    }

    /// Raw `NonZeroU64` form, used where a process must be correlated
    /// through a plain integer (e.g. a timer record's `process_id`).
    pub(crate) fn to_raw(self) -> u64 {
        self.0.get()
    }

    pub(crate) fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(ProcessId)
    }
}

impl std::fmt::Debug for ProcessId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ProcessId({})", self.index())
    }
}

/// `state ∈ {READY, RUNNING, WAITING}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum ProcessState {
    Ready = 0,
    Running = 1,
    Waiting = 2,
}

/// `priority ∈ {LOW, NORMAL, HIGH, MAX}`, strictly ordered, no aging.
/// Declaration order is dispatch order: `Max` always wins over `High`, etc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u64)]
pub enum Priority {
    Low = 0,
    Normal = 1,
    High = 2,
    Max = 3,
}

impl Priority {
    /// All priorities, highest first — the order `scheduler_schedule` checks.
    pub const ALL: [Priority; crate::constants::NUM_PRIORITIES] =
        [Priority::Max, Priority::High, Priority::Normal, Priority::Low];
}

/// `blocking_reason ∈ {NONE, RECEIVE, TIMER, IO}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u64)]
pub enum BlockingReasonTag {
    None = 0,
    Receive = 1,
    Timer = 2,
    Io = 3,
}

/// Ergonomic, typed view of the four raw blocking fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocking {
    None,
    Receive { pattern: u64 },
    Timer { wake_time: u64 },
    Io { descriptor: u64 },
}

/// A fixed 512-byte process control block. See the module docs for the
/// offset contract; see `tests::layout` below for the pinned assertions.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct Pcb {
    // Queue linkage — positions within a `RunQueue`, not ownership.
    pub next: Option<ProcessId>,
    pub prev: Option<ProcessId>,

    // Identity
    pub pid: u64,
    pub scheduler_id: u64,

    // Scheduling
    state: ProcessState,
    priority: Priority,
    pub reduction_count: u64,

    // Execution context (opaque outside of an architecture-specific switch
    // primitive, which this crate does not implement).
    pub registers: [u64; NUM_REGISTERS],
    pub sp: u64,
    pub lr: u64,
    pub pc: u64,
    pub pstate: u64,

    // Memory regions
    pub stack_base: u64,
    pub stack_size: u64,
    pub heap_base: u64,
    pub heap_size: u64,

    pub message_queue: u64,
    pub last_scheduled: u64,
    pub affinity_mask: u64,
    pub migration_count: u64,

    // Bump cursors
    pub stack_pointer: u64,
    pub stack_limit: u64,
    pub heap_pointer: u64,
    pub heap_limit: u64,

    // Blocking — raw fields; see `Pcb::blocking`/`Pcb::set_blocking`.
    blocking_reason: BlockingReasonTag,
    blocking_data: u64,
    wake_time: u64,
    message_pattern: u64,

    _reserved: [u8; 48],
}

impl Pcb {
    /// A zeroed PCB, as returned by `allocate_pcb` before the caller fills
    /// in identity/context.
    pub fn zeroed() -> Self {
        Pcb {
            next: None,
            prev: None,
            pid: 0,
            scheduler_id: 0,
            state: ProcessState::Ready,
            priority: Priority::Normal,
            reduction_count: 0,
            registers: [0; NUM_REGISTERS],
            sp: 0,
            lr: 0,
            pc: 0,
            pstate: 0,
            stack_base: 0,
            stack_size: 0,
            heap_base: 0,
            heap_size: 0,
            message_queue: 0,
            last_scheduled: 0,
            affinity_mask: 0,
            migration_count: 0,
            stack_pointer: 0,
            stack_limit: 0,
            heap_pointer: 0,
            heap_limit: 0,
            blocking_reason: BlockingReasonTag::None,
            blocking_data: 0,
            wake_time: 0,
            message_pattern: 0,
            _reserved: [0; 48],
        }
    }

    pub fn state(&self) -> ProcessState {
        self.state
    }

    pub fn set_state(&mut self, state: ProcessState) {
        self.state = state;
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
    }

    /// Decode the four raw blocking fields into a typed [`Blocking`] value.
    pub fn blocking(&self) -> Blocking {
        match self.blocking_reason {
            BlockingReasonTag::None => Blocking::None,
            BlockingReasonTag::Receive => Blocking::Receive {
                pattern: self.message_pattern,
            },
            BlockingReasonTag::Timer => Blocking::Timer {
                wake_time: self.wake_time,
            },
            BlockingReasonTag::Io => Blocking::Io {
                descriptor: self.blocking_data,
            },
        }
    }

    /// Encode a typed [`Blocking`] value into the four raw fields.
    pub fn set_blocking(&mut self, blocking: Blocking) {
        // Clear all four fields first so a reason switch never leaks a stale
        // payload from a previous block (e.g. a Timer's wake_time surviving
        // into a Receive block).
        self.blocking_reason = BlockingReasonTag::None;
        self.blocking_data = 0;
        self.wake_time = 0;
        self.message_pattern = 0;
        match blocking {
            Blocking::None => {}
            Blocking::Receive { pattern } => {
                self.blocking_reason = BlockingReasonTag::Receive;
                self.message_pattern = pattern;
            }
            Blocking::Timer { wake_time } => {
                self.blocking_reason = BlockingReasonTag::Timer;
                self.wake_time = wake_time;
            }
            Blocking::Io { descriptor } => {
                self.blocking_reason = BlockingReasonTag::Io;
                self.blocking_data = descriptor;
            }
        }
    }

    pub fn is_blocked_on(&self, tag: BlockingReasonTag) -> bool {
        self.blocking_reason == tag
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PCB_STRIDE;

    /// Pins the documented offset table. `offset_of!` fails to compile if a
    /// field is reordered or resized, which is the point: these offsets are
    /// a contract, not an implementation detail.
    #[test]
    fn layout() {
        assert_eq!(std::mem::size_of::<Pcb>(), PCB_STRIDE);
        assert_eq!(std::mem::offset_of!(Pcb, next), 0);
        assert_eq!(std::mem::offset_of!(Pcb, prev), 8);
        assert_eq!(std::mem::offset_of!(Pcb, pid), 16);
        assert_eq!(std::mem::offset_of!(Pcb, scheduler_id), 24);
        assert_eq!(std::mem::offset_of!(Pcb, state), 32);
        assert_eq!(std::mem::offset_of!(Pcb, priority), 40);
        assert_eq!(std::mem::offset_of!(Pcb, reduction_count), 48);
        assert_eq!(std::mem::offset_of!(Pcb, registers), 56);
        assert_eq!(std::mem::offset_of!(Pcb, sp), 304);
        assert_eq!(std::mem::offset_of!(Pcb, lr), 312);
        assert_eq!(std::mem::offset_of!(Pcb, pc), 320);
        assert_eq!(std::mem::offset_of!(Pcb, pstate), 328);
        assert_eq!(std::mem::offset_of!(Pcb, stack_base), 336);
        assert_eq!(std::mem::offset_of!(Pcb, stack_size), 344);
        assert_eq!(std::mem::offset_of!(Pcb, heap_base), 352);
        assert_eq!(std::mem::offset_of!(Pcb, heap_size), 360);
        assert_eq!(std::mem::offset_of!(Pcb, message_queue), 368);
        assert_eq!(std::mem::offset_of!(Pcb, last_scheduled), 376);
        assert_eq!(std::mem::offset_of!(Pcb, affinity_mask), 384);
        assert_eq!(std::mem::offset_of!(Pcb, migration_count), 392);
        assert_eq!(std::mem::offset_of!(Pcb, stack_pointer), 400);
        assert_eq!(std::mem::offset_of!(Pcb, stack_limit), 408);
        assert_eq!(std::mem::offset_of!(Pcb, heap_pointer), 416);
        assert_eq!(std::mem::offset_of!(Pcb, heap_limit), 424);
        assert_eq!(std::mem::offset_of!(Pcb, blocking_reason), 432);
        assert_eq!(std::mem::offset_of!(Pcb, blocking_data), 440);
        assert_eq!(std::mem::offset_of!(Pcb, wake_time), 448);
        assert_eq!(std::mem::offset_of!(Pcb, message_pattern), 456);
    }

    #[test]
    fn process_id_is_niche_optimized() {
        assert_eq!(
            std::mem::size_of::<Option<ProcessId>>(),
            std::mem::size_of::<u64>()
        );
    }

    #[test]
    fn priority_order_matches_dispatch_order() {
        assert!(Priority::Max > Priority::High);
        assert!(Priority::High > Priority::Normal);
        assert!(Priority::Normal > Priority::Low);
    }

    #[test]
    fn blocking_round_trips() {
        let mut pcb = Pcb::zeroed();
        pcb.set_blocking(Blocking::Timer { wake_time: 42 });
        assert_eq!(pcb.blocking(), Blocking::Timer { wake_time: 42 });
        assert!(pcb.is_blocked_on(BlockingReasonTag::Timer));

        pcb.set_blocking(Blocking::Receive { pattern: 7 });
        assert_eq!(pcb.blocking(), Blocking::Receive { pattern: 7 });

        pcb.set_blocking(Blocking::None);
        assert_eq!(pcb.blocking(), Blocking::None);
    }
}
