//! Host-memory emulation of the unified-memory primitive.
//!
//! Blocks come from the system allocator with [`MANAGED_ALIGNMENT`], so they
//! are addressable from the host like real managed memory. The backend keeps
//! the primitive's quirks: a zero-byte request is an invalid value, releasing
//! null is fine, releasing an unknown address is an invalid value.

use std::alloc::{alloc, dealloc, Layout};
use std::borrow::Cow;
use std::collections::HashMap;
use std::ptr::NonNull;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{StatusCode, UnifiedMemoryBackend, MANAGED_ALIGNMENT};
use crate::sync::mutex::Mutex;
use crate::util::layout::is_aligned;
use crate::util::size::format_bytes;

/// Live blocks keyed by address.
#[derive(Default)]
struct LiveTable {
    blocks: HashMap<usize, Layout>,
    bytes_in_use: usize,
}

struct HostHeap {
    live: Mutex<LiveTable>,
    capacity: Option<usize>,
    allocate_calls: AtomicUsize,
    release_calls: AtomicUsize,
}

impl Drop for HostHeap {
    fn drop(&mut self) {
        let table = self.live.get_mut();
        for (addr, layout) in table.blocks.drain() {
            // SAFETY: every entry was produced by `alloc` with this layout.
            unsafe { dealloc(addr as *mut u8, layout) };
        }
        table.bytes_in_use = 0;
    }
}

/// Unified-memory backend served from host memory.
///
/// Clones share one heap, so memory allocated through one clone can be
/// released through another. Blocks still live when the last clone drops are
/// returned to the system.
#[derive(Clone)]
pub struct HostBackend {
    heap: Arc<HostHeap>,
}

impl HostBackend {
    /// Create a backend limited only by the system allocator.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Create a backend that refuses requests once `capacity` bytes are live.
    pub fn with_capacity(capacity: usize) -> Self {
        Self::build(Some(capacity))
    }

    fn build(capacity: Option<usize>) -> Self {
        Self {
            heap: Arc::new(HostHeap {
                live: Mutex::new(LiveTable::default()),
                capacity,
                allocate_calls: AtomicUsize::new(0),
                release_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Configured capacity, if any.
    pub fn capacity(&self) -> Option<usize> {
        self.heap.capacity
    }

    /// Number of times the allocation primitive was invoked.
    pub fn allocate_calls(&self) -> usize {
        self.heap.allocate_calls.load(Ordering::Relaxed)
    }

    /// Number of times the release primitive was invoked.
    pub fn release_calls(&self) -> usize {
        self.heap.release_calls.load(Ordering::Relaxed)
    }

    /// Number of blocks currently live.
    pub fn live_allocations(&self) -> usize {
        self.heap.live.lock().blocks.len()
    }

    /// Bytes currently live.
    pub fn bytes_in_use(&self) -> usize {
        self.heap.live.lock().bytes_in_use
    }
}

impl Default for HostBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HostBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HostBackend")
            .field("capacity", &self.heap.capacity.map(format_bytes))
            .field("live_allocations", &self.live_allocations())
            .field("bytes_in_use", &format_bytes(self.bytes_in_use()))
            .finish()
    }
}

impl UnifiedMemoryBackend for HostBackend {
    const ALLOCATE_PRIMITIVE: &'static str = "hostMallocManaged";
    const RELEASE_PRIMITIVE: &'static str = "hostFree";

    fn allocate_managed(&self, bytes: usize) -> Result<NonNull<u8>, StatusCode> {
        self.heap.allocate_calls.fetch_add(1, Ordering::Relaxed);

        if bytes == 0 {
            return Err(StatusCode::INVALID_VALUE);
        }

        let layout = Layout::from_size_align(bytes, MANAGED_ALIGNMENT)
            .map_err(|_| StatusCode::MEMORY_ALLOCATION)?;

        let mut table = self.heap.live.lock();
        if let Some(capacity) = self.heap.capacity {
            if table.bytes_in_use.saturating_add(bytes) > capacity {
                return Err(StatusCode::MEMORY_ALLOCATION);
            }
        }

        // SAFETY: layout has a non-zero size.
        let ptr = NonNull::new(unsafe { alloc(layout) }).ok_or(StatusCode::MEMORY_ALLOCATION)?;
        debug_assert!(is_aligned(ptr.as_ptr() as usize, MANAGED_ALIGNMENT));

        table.blocks.insert(ptr.as_ptr() as usize, layout);
        table.bytes_in_use += bytes;

        Ok(ptr)
    }

    unsafe fn release(&self, ptr: *mut u8) -> Result<(), StatusCode> {
        self.heap.release_calls.fetch_add(1, Ordering::Relaxed);

        if ptr.is_null() {
            return Ok(());
        }

        let mut table = self.heap.live.lock();
        let layout = table
            .blocks
            .remove(&(ptr as usize))
            .ok_or(StatusCode::INVALID_VALUE)?;
        table.bytes_in_use -= layout.size();
        drop(table);

        dealloc(ptr, layout);
        Ok(())
    }

    fn error_name(&self, status: StatusCode) -> Cow<'static, str> {
        match status {
            StatusCode::SUCCESS => Cow::Borrowed("hostSuccess"),
            StatusCode::INVALID_VALUE => Cow::Borrowed("hostErrorInvalidValue"),
            StatusCode::MEMORY_ALLOCATION => Cow::Borrowed("hostErrorMemoryAllocation"),
            StatusCode(code) => Cow::Owned(format!("hostErrorUnknown({})", code)),
        }
    }

    fn error_string(&self, status: StatusCode) -> Cow<'static, str> {
        match status {
            StatusCode::SUCCESS => Cow::Borrowed("no error"),
            StatusCode::INVALID_VALUE => Cow::Borrowed("invalid argument"),
            StatusCode::MEMORY_ALLOCATION => Cow::Borrowed("out of memory"),
            _ => Cow::Borrowed("unrecognized error code"),
        }
    }

    fn same_address_space(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.heap, &other.heap)
    }
}
