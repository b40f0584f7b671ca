//! Page allocator wrapper and pool-expansion contiguity contract.
//!
//! The raw OS page mapping primitive is an external collaborator,
//! but the *wrapper* — acquiring/releasing contiguous regions and checking
//! contiguity before committing an expansion — is in scope. `SystemPageSource`
//! is a thin, real `mmap`/`munmap` implementation over `libc` (already part
//! of the workspace's dependency stack already) so the wrapper has
//! something genuine to call; production callers can substitute any other
//! `PageSource`.

use crate::constants::{MAX_EXPANSION_BLOCKS, MAX_EXPANSION_BYTES};

/// `map_pages(bytes) → addr | FAIL`; `unmap_pages(addr, bytes)`.
pub trait PageSource {
    fn map_pages(&self, bytes: usize) -> Option<usize>;
    fn unmap_pages(&self, addr: usize, bytes: usize);
}

/// A real page source backed by `mmap`/`munmap`. Unix-only; there is no
/// portable fallback in scope for this crate.
#[cfg(unix)]
pub struct SystemPageSource;

#[cfg(unix)]
impl PageSource for SystemPageSource {
    fn map_pages(&self, bytes: usize) -> Option<usize> {
        if bytes == 0 {
            return None;
        }
        // SAFETY: a fresh, anonymous, private mapping; no pointer into our
        // address space is read or written by this call.
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                bytes,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            None
        } else {
            Some(ptr as usize)
        }
    }

    fn unmap_pages(&self, addr: usize, bytes: usize) {
        if addr == 0 || bytes == 0 {
            return;
        }
        // SAFETY: `addr`/`bytes` are expected to be a region this same
        // source previously returned from `map_pages`.
        unsafe {
            libc::munmap(addr as *mut libc::c_void, bytes);
        }
    }
}

/// `expand_memory_pool(base, cur, bs, ext)`: grows a pool by
/// mapping `extension_blocks * block_size` bytes and requiring the new
/// region to abut the pool's current end. Non-contiguous growth is
/// unmapped immediately and rejected; both size caps are enforced before
/// any mapping is attempted.
///
/// The contiguity requirement is fragile under address-space layout
/// randomization — a production implementation
/// should reserve an address range up front or move to a chained-pool
/// representation instead of depending on `mmap` happening to extend the
/// prior region.
pub fn expand_memory_pool(
    source: &dyn PageSource,
    current_end: usize,
    block_size: usize,
    extension_blocks: usize,
) -> bool {
    if extension_blocks == 0 || extension_blocks > MAX_EXPANSION_BLOCKS {
        return false;
    }
    let Some(extension_bytes) = block_size.checked_mul(extension_blocks) else {
        return false;
    };
    if extension_bytes == 0 || extension_bytes > MAX_EXPANSION_BYTES {
        return false;
    }

    let Some(addr) = source.map_pages(extension_bytes) else {
        return false;
    };

    if addr != current_end {
        source.unmap_pages(addr, extension_bytes);
        log::warn!("pool expansion rejected: region at {addr:#x} does not abut {current_end:#x}");
        return false;
    }

    log::debug!("pool expanded by {extension_bytes} bytes at {addr:#x}");
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    /// A fake page source whose mapping addresses are scripted, so tests
    /// can exercise both the contiguous and non-contiguous paths
    /// deterministically.
    struct FakeSource {
        next_addr: AtomicUsize,
        unmapped: Mutex<Vec<(usize, usize)>>,
    }

    impl FakeSource {
        fn new(first_addr: usize) -> Self {
            FakeSource {
                next_addr: AtomicUsize::new(first_addr),
                unmapped: Mutex::new(Vec::new()),
            }
        }
    }

    impl PageSource for FakeSource {
        fn map_pages(&self, bytes: usize) -> Option<usize> {
            if bytes == 0 {
                return None;
            }
            Some(self.next_addr.load(Ordering::SeqCst))
        }

        fn unmap_pages(&self, addr: usize, bytes: usize) {
            self.unmapped.lock().unwrap().push((addr, bytes));
        }
    }

    #[test]
    fn contiguous_expansion_succeeds() {
        let source = FakeSource::new(0x4000);
        assert!(expand_memory_pool(&source, 0x4000, 4096, 1));
        assert!(source.unmapped.lock().unwrap().is_empty());
    }

    #[test]
    fn non_contiguous_expansion_fails_and_unmaps() {
        let source = FakeSource::new(0x9000);
        assert!(!expand_memory_pool(&source, 0x4000, 4096, 1));
        assert_eq!(source.unmapped.lock().unwrap().as_slice(), &[(0x9000, 4096)]);
    }

    #[test]
    fn caps_are_enforced_before_mapping() {
        let source = FakeSource::new(0x4000);
        assert!(!expand_memory_pool(&source, 0x4000, 4096, 0));
        assert!(!expand_memory_pool(
            &source,
            0x4000,
            4096,
            MAX_EXPANSION_BLOCKS + 1
        ));
        assert!(!expand_memory_pool(&source, 0x4000, MAX_EXPANSION_BYTES, 2));
    }
}
