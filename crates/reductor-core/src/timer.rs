//! Monotonic tick source and timer table.
//!
//! A `Mutex`-guarded table keyed by an opaque timer id, scanned and pruned
//! on each call, with callers choosing when to scan rather than a
//! background thread doing it implicitly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use crate::constants::MAX_BLOCKING_TIME;

/// A non-zero timer identifier, unique for the lifetime of the table
///.
pub type TimerId = u64;

struct TimerRecord {
    expiry_tick: u64,
    /// Insertion-order tiebreaker for timers that share an `expiry_tick`
    ///.
    seq: u64,
    process_id: u64,
    callback: Option<Callback>,
    cancelled: bool,
}

type Callback = std::sync::Arc<dyn Fn() + Send + Sync>;

/// The global timer table.
pub struct TimerEngine {
    ticks: AtomicU64,
    next_id: AtomicU64,
    next_seq: AtomicU64,
    table: Mutex<HashMap<TimerId, TimerRecord>>,
    capacity: usize,
}

impl TimerEngine {
    /// `timer_init()`: clears the table.
    pub fn new(capacity: usize) -> Self {
        TimerEngine {
            ticks: AtomicU64::new(0),
            next_id: AtomicU64::new(1),
            next_seq: AtomicU64::new(0),
            table: Mutex::new(HashMap::new()),
            capacity,
        }
    }

    /// `get_system_ticks()`: non-decreasing.
    pub fn get_system_ticks(&self) -> u64 {
        self.ticks.load(Ordering::Acquire)
    }

    /// `timer_tick()`: advances the tick source.
    pub fn timer_tick(&self) -> u64 {
        self.ticks.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Clamp a requested offset to `MAX_BLOCKING_TIME` from now.
    pub fn clamp_wake_time(&self, timeout_ticks: u64) -> u64 {
        self.get_system_ticks() + timeout_ticks.min(MAX_BLOCKING_TIME)
    }

    /// `insert_timer(expiry_ticks, callback, process_id)`.
    /// Rejects a zero expiry, a full table; a `None` callback is permitted —
    /// a timer with no callback still wakes its associated process via
    /// `process_check_timer_wakeups`, so `None` is a valid "just wake me"
    /// request, not a validation failure.
    pub fn insert_timer(
        &self,
        expiry_ticks: u64,
        callback: Option<Callback>,
        process_id: u64,
    ) -> TimerId {
        if expiry_ticks == 0 {
            return 0;
        }
        let mut table = self.table.lock().unwrap();
        if table.len() >= self.capacity {
            return 0;
        }
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);
        let seq = self.next_seq.fetch_add(1, Ordering::AcqRel);
        let expiry_tick = self.get_system_ticks() + expiry_ticks.min(MAX_BLOCKING_TIME);
        table.insert(
            id,
            TimerRecord {
                expiry_tick,
                seq,
                process_id,
                callback,
                cancelled: false,
            },
        );
        log::debug!("timer {id} inserted, expiry_tick={expiry_tick}");
        id
    }

    /// `cancel_timer(id)`: idempotent — a second cancel
    /// returns 0 without error.
    pub fn cancel_timer(&self, id: TimerId) -> bool {
        if id == 0 {
            return false;
        }
        let mut table = self.table.lock().unwrap();
        match table.get_mut(&id) {
            Some(record) if !record.cancelled => {
                record.cancelled = true;
                true
            }
            _ => false,
        }
    }

    /// `process_timers()`: scans for expired, non-cancelled
    /// records, invokes each callback (if any), removes the record, and
    /// returns how many fired, in insertion order for ties.
    pub fn process_timers(&self) -> usize {
        self.expire(None).len()
    }

    /// Lower-level primitive used by `process_check_timer_wakeups`: expire
    /// due timers and return the `process_id`s that should be woken, in
    /// firing order. If `limit` is `Some(n)`, stops after collecting `n`.
    pub(crate) fn expire(&self, limit: Option<usize>) -> Vec<u64> {
        let now = self.get_system_ticks();
        let mut table = self.table.lock().unwrap();
        let mut due: Vec<TimerId> = table
            .iter()
            .filter(|(_, r)| !r.cancelled && r.expiry_tick <= now)
            .map(|(id, _)| *id)
            .collect();
        due.sort_by_key(|id| {
            let r = &table[id];
            (r.expiry_tick, r.seq)
        });
        if let Some(limit) = limit {
            due.truncate(limit);
        }
        let mut woken = Vec::with_capacity(due.len());
        for id in due {
            if let Some(record) = table.remove(&id) {
                if let Some(cb) = &record.callback {
                    cb();
                }
                woken.push(record.process_id);
            }
        }
        woken
    }

    pub fn len(&self) -> usize {
        self.table.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `schedule_timeout(ticks, pid)`: a thin wrapper tying a timer
/// to a PCB's timer-wait slot. Zero ticks or zero pid reject with 0.
pub fn schedule_timeout(engine: &TimerEngine, ticks: u64, pid: u64) -> TimerId {
    if ticks == 0 || pid == 0 {
        return 0;
    }
    engine.insert_timer(ticks, None, pid)
}

/// `cancel_timeout(id)`: same guards/idempotence as `cancel_timer`.
pub fn cancel_timeout(engine: &TimerEngine, id: TimerId) -> bool {
    engine.cancel_timer(id)
}
