//! Owning buffer over a memory resource.
//!
//! Provides RAII semantics for a single untyped allocation.

use std::fmt;
use std::sync::Arc;

use super::default::default_resource;
use super::traits::{AllocError, DeviceMemoryResource, Stream};

/// An untyped allocation that returns itself to its resource on drop.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use managedalloc::{DeviceBuffer, ManagedMemoryResource, Stream};
///
/// let mr = Arc::new(ManagedMemoryResource::new());
/// let mut buf = DeviceBuffer::new_in(256, Stream::DEFAULT, mr).unwrap();
///
/// // Managed memory is host-accessible.
/// unsafe { buf.as_host_slice_mut().fill(7) };
/// assert_eq!(unsafe { buf.as_host_slice() }[255], 7);
/// ```
pub struct DeviceBuffer {
    ptr: *mut u8,
    size: usize,
    stream: Stream,
    resource: Arc<dyn DeviceMemoryResource>,
}

// SAFETY: the buffer uniquely owns its allocation, and resources are
// `Send + Sync`.
unsafe impl Send for DeviceBuffer {}
unsafe impl Sync for DeviceBuffer {}

impl DeviceBuffer {
    /// Allocate `size` bytes from the default resource.
    pub fn new(size: usize, stream: Stream) -> Result<Self, AllocError> {
        Self::new_in(size, stream, default_resource())
    }

    /// Allocate `size` bytes from `resource`.
    pub fn new_in(
        size: usize,
        stream: Stream,
        resource: Arc<dyn DeviceMemoryResource>,
    ) -> Result<Self, AllocError> {
        let ptr = resource.allocate(size, stream)?;
        Ok(Self {
            ptr,
            size,
            stream,
            resource,
        })
    }

    /// Size in bytes.
    pub fn len(&self) -> usize {
        self.size
    }

    /// Whether the buffer holds no memory.
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Start of the allocation; null when empty.
    pub fn as_ptr(&self) -> *const u8 {
        self.ptr
    }

    /// Mutable start of the allocation; null when empty.
    pub fn as_mut_ptr(&mut self) -> *mut u8 {
        self.ptr
    }

    /// Stream passed to the resource on deallocation.
    pub fn stream(&self) -> Stream {
        self.stream
    }

    /// Change the stream used on deallocation.
    pub fn set_stream(&mut self, stream: Stream) {
        self.stream = stream;
    }

    /// The resource this buffer returns to.
    pub fn resource(&self) -> &Arc<dyn DeviceMemoryResource> {
        &self.resource
    }

    /// View the allocation from the host.
    ///
    /// # Safety
    ///
    /// The resource must hand out host-accessible memory (managed memory
    /// is), and no device work may be writing the buffer concurrently.
    pub unsafe fn as_host_slice(&self) -> &[u8] {
        if self.ptr.is_null() {
            return &[];
        }
        std::slice::from_raw_parts(self.ptr, self.size)
    }

    /// Mutable host view of the allocation.
    ///
    /// # Safety
    ///
    /// Same as [`as_host_slice`](Self::as_host_slice), and no device work
    /// may be reading the buffer concurrently.
    pub unsafe fn as_host_slice_mut(&mut self) -> &mut [u8] {
        if self.ptr.is_null() {
            return &mut [];
        }
        std::slice::from_raw_parts_mut(self.ptr, self.size)
    }
}

impl Drop for DeviceBuffer {
    fn drop(&mut self) {
        // SAFETY: `ptr` came from `resource.allocate(size, _)` and is
        // released exactly once, here.
        unsafe { self.resource.deallocate(self.ptr, self.size, self.stream) };
    }
}

impl fmt::Debug for DeviceBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeviceBuffer")
            .field("ptr", &self.ptr)
            .field("size", &self.size)
            .field("stream", &self.stream)
            .finish()
    }
}
