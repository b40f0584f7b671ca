//! Per-PCB bump allocators for the stack and heap regions.
//!
//! Each `Pcb` embeds two of these cursors (via `stack_pointer`/`stack_limit`
//! and `heap_pointer`/`heap_limit`); this module is the shared logic both
//! apply.

use crate::pcb::Pcb;

/// Round `size` up to the next multiple of 8.
fn align8(size: u64) -> u64 {
    (size + 7) & !7
}

/// A single bump region: a monotonic cursor between `base` (implicit, via
/// the caller) and `limit`. Returns the allocation's start address, or
/// `None` on overflow/exhaustion — never a partial allocation.
fn bump_allocate(cursor: &mut u64, limit: u64, size: u64) -> Option<u64> {
    if size == 0 {
        return None;
    }
    let size = align8(size);
    let result = *cursor;
    let new_cursor = result.checked_add(size)?;
    if new_cursor > limit {
        return None;
    }
    *cursor = new_cursor;
    Some(result)
}

/// `process_allocate_stack(pcb, size)`.
pub fn process_allocate_stack(pcb: Option<&mut Pcb>, size: u64) -> Option<u64> {
    let pcb = pcb?;
    bump_allocate(&mut pcb.stack_pointer, pcb.stack_limit, size)
}

/// `process_allocate_heap(pcb, size)`.
pub fn process_allocate_heap(pcb: Option<&mut Pcb>, size: u64) -> Option<u64> {
    let pcb = pcb?;
    bump_allocate(&mut pcb.heap_pointer, pcb.heap_limit, size)
}

/// `trigger_garbage_collection(pcb)`: a stub that accepts a
/// possibly-absent PCB and returns a success/failure indicator without
/// touching either bump region. No compaction semantics are implemented.
pub fn trigger_garbage_collection(pcb: Option<&Pcb>) -> Option<()> {
    pcb.map(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcb::Pcb;

    fn pcb_with_heap(base: u64, size: u64) -> Pcb {
        let mut pcb = Pcb::zeroed();
        pcb.heap_base = base;
        pcb.heap_size = size;
        pcb.heap_pointer = base;
        pcb.heap_limit = base + size;
        pcb
    }

    #[test]
    fn null_pcb_or_zero_size_is_null() {
        assert_eq!(process_allocate_heap(None, 16), None);
        let mut pcb = pcb_with_heap(0x1000, 256);
        assert_eq!(process_allocate_heap(Some(&mut pcb), 0), None);
    }

    #[test]
    fn allocation_advances_cursor_and_aligns() {
        let mut pcb = pcb_with_heap(0x1000, 256);
        let a = process_allocate_heap(Some(&mut pcb), 3).unwrap();
        assert_eq!(a, 0x1000);
        assert_eq!(pcb.heap_pointer, 0x1000 + 8); // rounded up to 8
        let b = process_allocate_heap(Some(&mut pcb), 8).unwrap();
        assert_eq!(b, 0x1000 + 8);
        assert_eq!(pcb.heap_pointer, 0x1000 + 16);
    }

    #[test]
    fn exhaustion_is_null_with_no_partial_allocation() {
        let mut pcb = pcb_with_heap(0x1000, 8);
        let cursor_before = pcb.heap_pointer;
        assert_eq!(process_allocate_heap(Some(&mut pcb), 16), None);
        assert_eq!(pcb.heap_pointer, cursor_before, "failed allocation must not advance cursor");
    }

    #[test]
    fn cursor_never_exceeds_limit() {
        let mut pcb = pcb_with_heap(0x1000, 64);
        while process_allocate_heap(Some(&mut pcb), 8).is_some() {}
        assert!(pcb.heap_pointer <= pcb.heap_limit);
        assert_eq!(pcb.heap_pointer - pcb.heap_base, 64);
    }

    #[test]
    fn gc_stub_accepts_null_and_returns_result() {
        assert_eq!(trigger_garbage_collection(None), None);
        let pcb = Pcb::zeroed();
        assert_eq!(trigger_garbage_collection(Some(&pcb)), Some(()));
    }
}
